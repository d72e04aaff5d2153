use std::time::Duration;

pub const DEFAULT_API_HOST: &str = "https://api.genobase.io";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const ENV_API_HOST: &str = "GENOBASE_API_HOST";
const ENV_API_TOKEN: &str = "GENOBASE_API_TOKEN";
const ENV_TIMEOUT: &str = "GENOBASE_TIMEOUT_SECS";

/// Connection settings for the HTTP data source.
///
/// Configuration is explicit: build one here and pass it to
/// [`HttpDataSource::new`](crate::source::HttpDataSource::new). Nothing in
/// this crate reads process-wide state behind the caller's back.
#[derive(Debug, Clone)]
pub struct Config {
    api_host: String,
    api_token: Option<String>,
    timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_host: DEFAULT_API_HOST.to_string(),
            api_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    pub fn new(api_host: impl Into<String>) -> Self {
        Config {
            api_host: api_host.into(),
            ..Config::default()
        }
    }

    /// Read configuration from `GENOBASE_API_HOST`, `GENOBASE_API_TOKEN`
    /// and `GENOBASE_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(host) = std::env::var(ENV_API_HOST) {
            if !host.is_empty() {
                config.api_host = host;
            }
        }
        if let Ok(token) = std::env::var(ENV_API_TOKEN) {
            if !token.is_empty() {
                config.api_token = Some(token);
            }
        }
        if let Ok(secs) = std::env::var(ENV_TIMEOUT) {
            let secs: u64 = secs.parse().map_err(|_| {
                crate::Error::InvalidParameter(format!(
                    "{ENV_TIMEOUT} must be an integer number of seconds, got \"{secs}\""
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_host(&self) -> &str {
        &self.api_host
    }

    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
