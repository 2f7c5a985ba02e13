use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.cloudtail.dev";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Configuration for the platform API client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the platform API.
    pub base_url: String,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Timeout for establishing connections.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfig {
    /// Creates a config with production defaults.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: format!("cloudtail/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Creates a config honoring `CLOUDTAIL_API_URL` (for staging or local
    /// test servers).
    pub fn from_env() -> Self {
        let mut config = Self::new();
        if let Ok(url) = std::env::var("CLOUDTAIL_API_URL")
            && !url.trim().is_empty()
        {
            config.base_url = url.trim().to_string();
        }
        config
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Overrides the connection timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
