use std::time::Duration;

/// Errors surfaced while consuming a log stream.
///
/// `Network` and `Server` are transient: the retry driver backs off and
/// reconnects. Everything else ends the stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// Network-layer failure (connect, read, framing). Retried with backoff.
    #[error("network error: {message}")]
    Network { message: String },
    /// Server-side failure (HTTP 5xx). Retried with backoff.
    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },
    /// Client-side failure (HTTP 4xx) or an error reported in-stream.
    /// Never retried.
    #[error("{message}")]
    Client { status: Option<u16>, message: String },
    /// The attempt budget was exhausted without a completed stream.
    #[error("log streaming failed after {attempts} attempts")]
    TooManyRetries { attempts: u32 },
    /// The wall-clock budget across all attempts was exhausted.
    #[error("log streaming timed out after {}s", .budget.as_secs())]
    TimedOut { budget: Duration },
}

impl StreamError {
    /// Creates a network-layer error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a server-side (5xx) error.
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Creates a client-side error; `status` is absent for in-stream errors.
    pub fn client(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Client {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn too_many_retries(attempts: u32) -> Self {
        Self::TooManyRetries { attempts }
    }

    pub(crate) fn timed_out(budget: Duration) -> Self {
        Self::TimedOut { budget }
    }

    /// Whether the retry driver may reconnect after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Server { .. })
    }

    /// Returns the HTTP status associated with this error, when known.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Client { status, .. } => *status,
            _ => None,
        }
    }
}

/// Errors raised while constructing a client or validating options.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid or incomplete client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid caller-supplied option.
    #[error("validation error: {0}")]
    Validation(String),
}
