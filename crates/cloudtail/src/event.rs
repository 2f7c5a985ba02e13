use tracing::debug;

use crate::errors::StreamError;

/// One decoded line of a build-log stream.
///
/// The wire format is newline-delimited JSON tagged by `type`; any variant
/// may carry the server-issued `id` used for resumption.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BuildLogEvent {
    /// Build output line.
    Message {
        message: String,
        #[serde(default)]
        id: Option<String>,
    },
    /// Terminal success.
    Complete {
        #[serde(default)]
        id: Option<String>,
    },
    /// Terminal failure.
    Failed {
        #[serde(default)]
        id: Option<String>,
    },
    /// Server-initiated stream rotation; reconnect without backoff.
    Timeout {
        #[serde(default)]
        id: Option<String>,
    },
    /// Keep-alive; never surfaced to consumers.
    Heartbeat {
        #[serde(default)]
        id: Option<String>,
    },
}

impl BuildLogEvent {
    /// Returns the event id, when the server attached one.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Message { id, .. }
            | Self::Complete { id }
            | Self::Failed { id }
            | Self::Timeout { id }
            | Self::Heartbeat { id } => id.as_deref(),
        }
    }

    /// Whether this event permanently ends the build-log stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Failed { .. })
    }
}

/// One application log record.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AppLogEntry {
    /// RFC 3339 timestamp with a `Z` suffix.
    pub timestamp: String,
    pub message: String,
    pub level: String,
}

/// Decodes one build-log line; malformed or unknown lines are skipped.
pub fn parse_build_log_line(line: &str) -> Option<BuildLogEvent> {
    match serde_json::from_str(line) {
        Ok(event) => Some(event),
        Err(err) => {
            debug!(line = %preview(line), error = %err, "skipping malformed build log line");
            None
        }
    }
}

/// Decodes one app-log line.
///
/// Heartbeats and undecodable entries resolve to `Ok(None)`; a line with
/// `type == "error"` ends the stream with the server's message.
pub fn parse_app_log_line(line: &str) -> Result<Option<AppLogEntry>, StreamError> {
    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(err) => {
            debug!(line = %preview(line), error = %err, "skipping unparseable app log line");
            return Ok(None);
        }
    };

    match value.get("type").and_then(|v| v.as_str()) {
        Some("heartbeat") => return Ok(None),
        Some("error") => {
            let message = value
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown error");
            return Err(StreamError::client(None, message));
        }
        _ => {}
    }

    match serde_json::from_value(value) {
        Ok(entry) => Ok(Some(entry)),
        Err(err) => {
            debug!(line = %preview(line), error = %err, "skipping undecodable app log entry");
            Ok(None)
        }
    }
}

fn preview(line: &str) -> String {
    line.chars().take(100).collect()
}
