use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt as _;
use futures::stream;
use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::{ClientError, StreamError};
use crate::model::{AppId, AppLogOptions, DeploymentId};

const BUILD_LOG_READ_TIMEOUT: Duration = Duration::from_secs(60);
const APP_LOG_FOLLOW_READ_TIMEOUT: Duration = Duration::from_secs(120);
const APP_LOG_FETCH_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw newline-delimited payload lines from one open connection.
pub type LineStream = Pin<Box<dyn futures::Stream<Item = Result<String, StreamError>> + Send>>;

/// Capability for opening authenticated streaming log connections.
///
/// Each call opens exactly one connection; reconnecting is the caller's
/// concern. The production implementation is [`HttpTransport`]; tests
/// substitute scripted transports.
#[async_trait]
pub trait LogTransport: Send + Sync {
    /// Opens one build-log connection, resuming after `resume_after` when set.
    async fn open_build_logs(
        &self,
        deployment_id: &DeploymentId,
        resume_after: Option<&str>,
    ) -> Result<LineStream, StreamError>;

    /// Opens one app-log connection.
    async fn open_app_logs(
        &self,
        app_id: &AppId,
        options: &AppLogOptions,
    ) -> Result<LineStream, StreamError>;
}

/// Incremental splitter turning body chunks into complete lines.
///
/// Handles lines spanning chunk boundaries and `\r\n` endings; a trailing
/// unterminated line is recovered with [`LineDecoder::finish`].
#[derive(Default)]
pub(crate) struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(idx) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=idx).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Returns any trailing unterminated line at end of stream.
    pub fn finish(self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.buf).into_owned())
        }
    }
}

/// Authenticated reqwest-backed transport for the platform API.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Builds a transport carrying the bearer token on every request.
    pub fn new(config: &ClientConfig, token: &str) -> Result<Self, ClientError> {
        let mut auth = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ClientError::Config(format!("invalid bearer token: {e}")))?;
        auth.set_sensitive(true);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn open_stream(
        &self,
        url: String,
        query: &[(String, String)],
        read_timeout: Duration,
    ) -> Result<LineStream, StreamError> {
        let request = self.client.get(&url).query(query);
        let response = match tokio::time::timeout(read_timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                return Err(StreamError::network(format!("request failed: {err}")));
            }
            Err(_) => {
                return Err(StreamError::network(format!(
                    "no response within {}s",
                    read_timeout.as_secs()
                )));
            }
        };
        let response = check_status(response).await?;
        Ok(line_stream(response, read_timeout))
    }
}

#[async_trait]
impl LogTransport for HttpTransport {
    async fn open_build_logs(
        &self,
        deployment_id: &DeploymentId,
        resume_after: Option<&str>,
    ) -> Result<LineStream, StreamError> {
        let url = format!("{}/deployments/{}/build-logs", self.base_url, deployment_id);
        let mut query = Vec::new();
        if let Some(last_id) = resume_after {
            query.push(("last_id".to_string(), last_id.to_string()));
        }
        debug!(
            deployment_id = %deployment_id,
            resume_after = resume_after.unwrap_or("-"),
            "opening build log stream"
        );
        self.open_stream(url, &query, BUILD_LOG_READ_TIMEOUT).await
    }

    async fn open_app_logs(
        &self,
        app_id: &AppId,
        options: &AppLogOptions,
    ) -> Result<LineStream, StreamError> {
        let url = format!("{}/apps/{}/logs/stream", self.base_url, app_id);
        let read_timeout = if options.follow {
            APP_LOG_FOLLOW_READ_TIMEOUT
        } else {
            APP_LOG_FETCH_READ_TIMEOUT
        };
        let query = vec![
            ("tail".to_string(), options.tail.to_string()),
            ("since".to_string(), options.since.clone()),
            ("follow".to_string(), options.follow.to_string()),
        ];
        debug!(app_id = %app_id, follow = options.follow, "opening app log stream");
        self.open_stream(url, &query, read_timeout).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status.is_server_error() {
        return Err(StreamError::server(
            status.as_u16(),
            status.canonical_reason().unwrap_or("server error"),
        ));
    }
    if status.is_client_error() {
        let detail = response
            .text()
            .await
            .unwrap_or_else(|_| "(response body unavailable)".to_string());
        return Err(StreamError::client(
            Some(status.as_u16()),
            format!("HTTP {}: {}", status.as_u16(), detail),
        ));
    }
    Err(StreamError::network(format!("unexpected status {status}")))
}

fn line_stream(response: reqwest::Response, read_timeout: Duration) -> LineStream {
    struct State {
        body: Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>,
        decoder: LineDecoder,
        pending: VecDeque<String>,
        read_timeout: Duration,
        done: bool,
    }

    let state = State {
        body: Box::pin(response.bytes_stream()),
        decoder: LineDecoder::default(),
        pending: VecDeque::new(),
        read_timeout,
        done: false,
    };

    Box::pin(stream::try_unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.pending.pop_front() {
                return Ok(Some((line, state)));
            }
            if state.done {
                return Ok(None);
            }

            match tokio::time::timeout(state.read_timeout, state.body.next()).await {
                Ok(Some(Ok(chunk))) => {
                    for line in state.decoder.push_chunk(&chunk) {
                        state.pending.push_back(line);
                    }
                }
                Ok(Some(Err(err))) => {
                    return Err(StreamError::network(format!("streaming read failed: {err}")));
                }
                Ok(None) => {
                    state.done = true;
                    if let Some(line) = std::mem::take(&mut state.decoder).finish() {
                        state.pending.push_back(line);
                    }
                }
                Err(_) => {
                    return Err(StreamError::network(format!(
                        "no data received within {}s",
                        state.read_timeout.as_secs()
                    )));
                }
            }
        }
    }))
}
