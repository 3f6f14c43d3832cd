use std::env;
use std::time::Duration;

use reqwest::Url;

/// Base URL the classifier client talks to when nothing else is configured.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000";
/// Upper bound on a single prediction round-trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const ENDPOINT_VAR: &str = "DENTASCAN_ENDPOINT";
const TIMEOUT_VAR: &str = "DENTASCAN_TIMEOUT_SECS";
const PREDICTION_PATH: &str = "prediction/";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid inference endpoint '{0}': {1}")]
    InvalidEndpoint(String, String),
    #[error("Invalid timeout '{0}': expected a positive number of seconds")]
    InvalidTimeout(String),
}

/// Where the inference service lives and how long we are willing to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceConfig {
    pub endpoint: Url,
    pub timeout: Duration,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            // Only exception to error propagation: a constant literal, covered by test_default_config.
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl InferenceConfig {
    /// Creates a configuration for the given base URL with the default timeout
    pub fn new(endpoint: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Builds a configuration from the defaults, overridden by the environment:
    ///
    /// 1. `DENTASCAN_ENDPOINT` - base URL of the inference service
    /// 2. `DENTASCAN_TIMEOUT_SECS` - request timeout in whole seconds
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(endpoint) = env::var(ENDPOINT_VAR) {
            config.endpoint = parse_endpoint(&endpoint)?;
        }
        if let Ok(timeout) = env::var(TIMEOUT_VAR) {
            config.timeout = parse_timeout(&timeout)?;
        }
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL of the prediction route, keeping any path prefix of the base URL.
    pub fn prediction_url(&self) -> Result<Url, ConfigError> {
        let mut base = self.endpoint.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(PREDICTION_PATH)
            .map_err(|e| ConfigError::InvalidEndpoint(self.endpoint.to_string(), e.to_string()))
    }
}

pub(crate) fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEndpoint(raw.to_string(), e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidEndpoint(
            raw.to_string(),
            format!("unsupported scheme '{}'", other),
        )),
    }
}

pub(crate) fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout(raw.to_string())),
    }
}
