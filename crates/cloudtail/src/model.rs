use std::fmt;

use crate::errors::ClientError;

/// Identifier of a deployment whose build is streamed.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DeploymentId(pub String);

impl DeploymentId {
    /// Creates a deployment id from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeploymentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DeploymentId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Identifier of a deployed application.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AppId(pub String);

impl AppId {
    /// Creates an app id from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AppId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AppId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Options for an app-log streaming call.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AppLogOptions {
    /// Number of historical lines to deliver before live output.
    pub tail: u32,
    /// Relative start of the window: digits plus `s`, `m`, `h`, or `d`.
    pub since: String,
    /// Keep the stream open for live output instead of fetching and closing.
    pub follow: bool,
}

impl Default for AppLogOptions {
    fn default() -> Self {
        Self {
            tail: 100,
            since: "5m".to_string(),
            follow: true,
        }
    }
}

impl AppLogOptions {
    /// Sets the number of historical lines.
    pub fn tail(mut self, tail: u32) -> Self {
        self.tail = tail;
        self
    }

    /// Sets the relative window start (for example `"5m"`, `"1h"`, `"2d"`).
    pub fn since(mut self, since: impl Into<String>) -> Self {
        self.since = since.into();
        self
    }

    /// Enables or disables live following.
    pub fn follow(mut self, follow: bool) -> Self {
        self.follow = follow;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.tail == 0 {
            return Err(ClientError::Validation(
                "tail must be greater than 0".into(),
            ));
        }
        if !is_valid_since(&self.since) {
            return Err(ClientError::Validation(format!(
                "invalid since value {:?}: use a number followed by s, m, h, or d (e.g. '5m', '1h', '2d')",
                self.since
            )));
        }
        Ok(())
    }
}

fn is_valid_since(value: &str) -> bool {
    let Some(unit) = value.chars().last() else {
        return false;
    };
    if !matches!(unit, 's' | 'm' | 'h' | 'd') {
        return false;
    }
    let digits = &value[..value.len() - 1];
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
