//! Streaming log client for the Cloudtail deployment platform.
//!
//! Build logs are a finite event stream that ends in `complete` or
//! `failed`; app logs are a bounded or endless tail of runtime output.
//! Both are consumed through [`LogStream`], with reconnects, bounded
//! retries with exponential backoff, and cursor-based resumption handled
//! internally.
//!
//! # Tailing app logs
//!
//! ```no_run
//! use cloudtail::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let identity = Identity::load();
//! let client = ApiClient::new(ClientConfig::from_env(), &identity)?;
//!
//! let mut logs = client.stream_app_logs("my-app", AppLogOptions::default().follow(false))?;
//! while let Some(item) = logs.next().await {
//!     match item {
//!         Ok(entry) => println!("{} {}", entry.timestamp, entry.message),
//!         Err(err) => eprintln!("stream failed: {err}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// App-log stream producer.
mod app_logs;
/// Exponential backoff schedule for retried attempts.
pub mod backoff;
/// Build-log stream producer and resume cursor.
mod build_logs;
/// Public API client.
pub mod client;
/// Client configuration.
pub mod config;
/// Public error types.
pub mod errors;
/// Wire-format event types and per-line parsers.
pub mod event;
/// Credential resolution and storage.
pub mod identity;
/// Id newtypes and app-log request options.
pub mod model;
/// Opt-in process logging setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Bounded-retry driver for streaming attempts.
pub mod retry;
/// Consumer-facing stream handle.
pub mod stream;
/// Transport capability and reqwest implementation.
pub mod transport;

pub use backoff::retry_delay;
pub use client::ApiClient;
pub use config::ClientConfig;
pub use errors::{ClientError, StreamError};
pub use event::{AppLogEntry, BuildLogEvent, parse_app_log_line, parse_build_log_line};
pub use identity::{AuthConfig, AuthMode, Identity};
pub use model::{AppId, AppLogOptions, DeploymentId};
pub use observability::init_logging;
pub use retry::StreamRetryPolicy;
pub use stream::LogStream;
pub use transport::{HttpTransport, LineStream, LogTransport};
