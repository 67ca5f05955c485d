use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("EMLOG_API_URL must not be empty")]
    MissingApiUrl,
    #[error("EMLOG_API_KEY must not be empty")]
    MissingApiKey,
    #[error("EMLOG_API_URL is not a valid http(s) URL: {0}")]
    InvalidApiUrl(String),
    #[error("timeout must be at least one second")]
    InvalidTimeout,
}

/// Base endpoint and API key, fixed at startup and shared by every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    base_url: String,
    api_key: String,
}

impl Credentials {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ConfigError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ConfigError::MissingApiUrl);
        }
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        let parsed =
            url::Url::parse(base_url).map_err(|e| ConfigError::InvalidApiUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidApiUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }
        Ok(Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub credentials: Credentials,
    pub timeout: Duration,
}

impl RuntimeConfig {
    pub fn new(api_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self, ConfigError> {
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(Self {
            credentials: Credentials::new(api_url, api_key)?,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
