use std::time::Duration;

use log::info;

use super::controller::SessionController;
use super::error::InferenceError;
use super::inference::HttpInferenceService;
use super::preview::PreviewRegistry;
use crate::config::{parse_endpoint, ConfigError, InferenceConfig};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] InferenceError),
}

/// A builder for constructing a [`SessionController`] backed by the HTTP service.
#[derive(Debug, Default)]
pub struct SessionControllerBuilder {
    config: InferenceConfig,
    previews: Option<PreviewRegistry>,
}

impl SessionControllerBuilder {
    /// Creates a builder starting from the default configuration
    ///
    /// # Example
    /// ```
    /// use dentascan::SessionControllerBuilder;
    ///
    /// let builder = SessionControllerBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole inference configuration
    pub fn with_config(mut self, config: InferenceConfig) -> Self {
        self.config = config;
        self
    }

    /// Points the controller at a different inference service
    ///
    /// # Arguments
    /// * `endpoint` - Base URL of the service, e.g. `http://127.0.0.1:8000`
    ///
    /// # Returns
    /// * `Result<Self, BuildError>` - The builder, or an error if the URL does not parse
    ///   or uses a scheme other than `http`/`https`
    ///
    /// # Example
    /// ```
    /// use dentascan::SessionControllerBuilder;
    ///
    /// let builder = SessionControllerBuilder::new()
    ///     .with_endpoint("http://10.0.0.5:8000")
    ///     .unwrap();
    /// ```
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, BuildError> {
        self.config.endpoint = parse_endpoint(endpoint)?;
        Ok(self)
    }

    /// Sets the upper bound on a single prediction request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Shares an existing preview registry instead of creating a fresh one
    pub fn with_preview_registry(mut self, previews: PreviewRegistry) -> Self {
        self.previews = Some(previews);
        self
    }

    /// Builds the controller
    ///
    /// # Example
    /// ```
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use dentascan::{SessionControllerBuilder, SessionState};
    /// use std::time::Duration;
    ///
    /// let controller = SessionControllerBuilder::new()
    ///     .with_endpoint("http://127.0.0.1:8000")?
    ///     .with_timeout(Duration::from_secs(10))
    ///     .build()?;
    /// assert_eq!(controller.state(), SessionState::Empty);
    /// # Ok(())
    /// # }
    /// ```
    pub fn build(self) -> Result<SessionController<HttpInferenceService>, BuildError> {
        let service = HttpInferenceService::new(&self.config)?;
        info!(
            "Session controller targeting {} (timeout {:?})",
            service.prediction_url(),
            self.config.timeout
        );
        Ok(SessionController::with_previews(
            service,
            self.previews.unwrap_or_default(),
        ))
    }
}

impl SessionController<HttpInferenceService> {
    /// Creates a new builder for fluent construction
    pub fn builder() -> SessionControllerBuilder {
        SessionControllerBuilder::new()
    }
}
