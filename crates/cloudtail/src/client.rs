use std::sync::Arc;

use crate::app_logs::spawn_app_log_stream;
use crate::build_logs::spawn_build_log_stream;
use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::event::{AppLogEntry, BuildLogEvent};
use crate::identity::Identity;
use crate::model::{AppId, AppLogOptions, DeploymentId};
use crate::retry::StreamRetryPolicy;
use crate::stream::LogStream;
use crate::transport::{HttpTransport, LogTransport};

/// Authenticated client for the platform's log streaming endpoints.
///
/// Cheap to clone; each streaming call owns its cursor and retry state, so
/// one client may serve concurrent streams for different deployments and
/// apps.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn LogTransport>,
    retry_policy: StreamRetryPolicy,
}

impl ApiClient {
    /// Creates a client from configuration and resolved credentials.
    ///
    /// Fails when no token is available; callers wanting a friendlier
    /// message should check [`Identity::is_logged_in`] first.
    pub fn new(config: ClientConfig, identity: &Identity) -> Result<Self, ClientError> {
        let token = identity
            .token()
            .ok_or_else(|| ClientError::Config("no credentials available; log in first".into()))?;
        let transport = HttpTransport::new(&config, token)?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    /// Creates a client over a custom transport (tests, alternative stacks).
    pub fn with_transport(transport: Arc<dyn LogTransport>) -> Self {
        Self {
            transport,
            retry_policy: StreamRetryPolicy::default(),
        }
    }

    /// Overrides the retry budget applied to each streaming call.
    pub fn retry_policy(mut self, policy: StreamRetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Streams build logs for a deployment until a terminal event.
    ///
    /// The stream is finite: it ends after the first `complete`/`failed`
    /// event, or with one final `Err` item on fatal failure or an exhausted
    /// retry budget. Must be called within a Tokio runtime.
    pub fn stream_build_logs(
        &self,
        deployment_id: impl Into<DeploymentId>,
    ) -> LogStream<BuildLogEvent> {
        spawn_build_log_stream(
            self.transport.clone(),
            deployment_id.into(),
            self.retry_policy.clone(),
        )
    }

    /// Streams app logs; endless while `options.follow` is set, otherwise
    /// a bounded fetch. Must be called within a Tokio runtime.
    pub fn stream_app_logs(
        &self,
        app_id: impl Into<AppId>,
        options: AppLogOptions,
    ) -> Result<LogStream<AppLogEntry>, ClientError> {
        options.validate()?;
        Ok(spawn_app_log_stream(
            self.transport.clone(),
            app_id.into(),
            options,
            self.retry_policy.clone(),
        ))
    }
}
