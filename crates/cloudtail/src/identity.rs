use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::debug;

use crate::errors::ClientError;

const TOKEN_ENV_VAR: &str = "CLOUDTAIL_TOKEN";
const CONFIG_DIR_ENV_VAR: &str = "CLOUDTAIL_CONFIG_DIR";
const AUTH_FILE_NAME: &str = "auth.json";

/// Stored credential file contents.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AuthConfig {
    pub access_token: String,
}

/// How the active token was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMode {
    /// Token injected via the environment; expiry is the issuer's concern.
    Token,
    /// Token from the stored credential file; checked for expiry locally.
    User,
}

/// Current credentials for the platform API.
///
/// The token itself is opaque to the streaming core; it only flows into the
/// transport's `Authorization` header.
#[derive(Clone, Debug)]
pub struct Identity {
    token: Option<String>,
    auth_mode: AuthMode,
}

impl Identity {
    /// Resolves credentials from `CLOUDTAIL_TOKEN` or the stored credential
    /// file, in that order.
    pub fn load() -> Self {
        let env_token = std::env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|token| !token.trim().is_empty());
        Self::resolve(env_token, read_auth_config())
    }

    /// Creates an identity from an explicit token.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            auth_mode: AuthMode::Token,
        }
    }

    pub(crate) fn resolve(env_token: Option<String>, stored: Option<AuthConfig>) -> Self {
        if let Some(token) = env_token {
            return Self {
                token: Some(token),
                auth_mode: AuthMode::Token,
            };
        }
        Self {
            token: stored.map(|auth| auth.access_token),
            auth_mode: AuthMode::User,
        }
    }

    /// Returns the bearer token, when one is available.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }

    /// True when no token is present or the JWT's `exp` claim has passed.
    pub fn is_expired(&self) -> bool {
        match &self.token {
            None => true,
            Some(token) => jwt_expired(token),
        }
    }

    /// Whether usable credentials are available.
    ///
    /// Environment-injected tokens skip the local expiry check; the server
    /// is the authority on their validity.
    pub fn is_logged_in(&self) -> bool {
        if self.token.is_none() {
            debug!("login status: false (no token)");
            return false;
        }
        if self.auth_mode == AuthMode::User && self.is_expired() {
            debug!("login status: false (token expired)");
            return false;
        }
        debug!("login status: true");
        true
    }
}

/// Path of the stored credential file, when a config directory exists.
pub fn auth_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV_VAR)
        && !dir.trim().is_empty()
    {
        return Some(PathBuf::from(dir.trim()).join(AUTH_FILE_NAME));
    }
    dirs::config_dir().map(|dir| dir.join("cloudtail").join(AUTH_FILE_NAME))
}

/// Persists credentials to the stored credential file.
pub fn write_auth_config(auth: &AuthConfig) -> Result<(), ClientError> {
    let Some(path) = auth_path() else {
        return Err(ClientError::Config("no config directory available".into()));
    };
    write_auth_config_to(&path, auth)
}

/// Removes the stored credential file, if present.
pub fn delete_auth_config() -> Result<(), ClientError> {
    let Some(path) = auth_path() else {
        return Ok(());
    };
    if path.exists() {
        std::fs::remove_file(&path).map_err(|e| {
            ClientError::Config(format!("failed to delete {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "auth config deleted");
    }
    Ok(())
}

fn write_auth_config_to(path: &Path, auth: &AuthConfig) -> Result<(), ClientError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ClientError::Config(format!("failed to create config dir: {e}")))?;
    }
    let payload = serde_json::to_string(auth)
        .map_err(|e| ClientError::Config(format!("failed to serialize credentials: {e}")))?;
    std::fs::write(path, payload)
        .map_err(|e| ClientError::Config(format!("failed to write {}: {e}", path.display())))?;
    debug!(path = %path.display(), "auth config written");
    Ok(())
}

fn read_auth_config() -> Option<AuthConfig> {
    let path = auth_path()?;
    read_auth_config_from(&path)
}

fn read_auth_config_from(path: &Path) -> Option<AuthConfig> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(auth) => Some(auth),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "ignoring unreadable auth config");
            None
        }
    }
}

fn jwt_expired(token: &str) -> bool {
    let mut parts = token.split('.');
    let (Some(_), Some(payload), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        debug!("invalid JWT format: expected 3 segments");
        return true;
    };
    let Ok(decoded) = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')) else {
        debug!("failed to decode JWT payload");
        return true;
    };
    let Ok(claims) = serde_json::from_slice::<serde_json::Value>(&decoded) else {
        debug!("failed to parse JWT claims");
        return true;
    };
    let Some(exp) = claims.get("exp") else {
        debug!("no exp claim in token");
        return false;
    };
    let Some(exp) = exp.as_i64() else {
        debug!("invalid exp claim: expected an integer");
        return true;
    };
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0);
    now >= exp
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_with_claims(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        format!("{header}.{payload}.signature")
    }

    #[test]
    fn expired_jwt_is_detected() {
        let identity = Identity::from_token(jwt_with_claims(serde_json::json!({"exp": 1})));
        assert!(identity.is_expired());
    }

    #[test]
    fn future_jwt_is_not_expired() {
        // 2999-12-31, far past any test run.
        let identity =
            Identity::from_token(jwt_with_claims(serde_json::json!({"exp": 32_503_680_000i64})));
        assert!(!identity.is_expired());
    }

    #[test]
    fn missing_exp_claim_is_treated_as_unexpired() {
        let identity = Identity::from_token(jwt_with_claims(serde_json::json!({"sub": "user"})));
        assert!(!identity.is_expired());
    }

    #[test]
    fn malformed_tokens_count_as_expired() {
        assert!(Identity::from_token("not-a-jwt").is_expired());
        assert!(Identity::from_token("only.two").is_expired());
        assert!(Identity::from_token("a.%%%.c").is_expired());
    }

    #[test]
    fn env_token_takes_precedence_over_stored_credentials() {
        let identity = Identity::resolve(
            Some("env-token".to_string()),
            Some(AuthConfig {
                access_token: "stored-token".to_string(),
            }),
        );
        assert_eq!(identity.token(), Some("env-token"));
        assert_eq!(identity.auth_mode(), AuthMode::Token);
    }

    #[test]
    fn stored_credentials_are_used_without_env_token() {
        let identity = Identity::resolve(
            None,
            Some(AuthConfig {
                access_token: "stored-token".to_string(),
            }),
        );
        assert_eq!(identity.token(), Some("stored-token"));
        assert_eq!(identity.auth_mode(), AuthMode::User);
    }

    #[test]
    fn env_tokens_skip_the_expiry_check() {
        let identity = Identity::resolve(Some("opaque-token".to_string()), None);
        assert!(identity.is_logged_in());

        let stored = Identity::resolve(
            None,
            Some(AuthConfig {
                access_token: "opaque-token".to_string(),
            }),
        );
        // Stored tokens must be valid JWTs; an opaque one reads as expired.
        assert!(!stored.is_logged_in());
    }

    #[test]
    fn missing_credentials_are_not_logged_in() {
        let identity = Identity::resolve(None, None);
        assert!(identity.is_expired());
        assert!(!identity.is_logged_in());
    }

    #[test]
    fn auth_config_round_trips_through_the_credential_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("auth.json");
        let auth = AuthConfig {
            access_token: "token-123".to_string(),
        };
        write_auth_config_to(&path, &auth).expect("write");
        assert_eq!(read_auth_config_from(&path), Some(auth));
    }

    #[test]
    fn unreadable_credential_file_is_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("auth.json");
        std::fs::write(&path, "not json").expect("write");
        assert_eq!(read_auth_config_from(&path), None);
        assert_eq!(read_auth_config_from(&dir.path().join("missing.json")), None);
    }
}
