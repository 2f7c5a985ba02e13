//! Common imports for typical client usage.
//!
//! This module intentionally exports the most frequently used configuration
//! and streaming types so application code needs fewer import lines.
pub use crate::{
    ApiClient, AppId, AppLogEntry, AppLogOptions, BuildLogEvent, ClientConfig, ClientError,
    DeploymentId, Identity, LogStream, StreamError, StreamRetryPolicy,
};
