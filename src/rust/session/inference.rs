use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};

use super::error::InferenceError;
use super::image::ImageFile;
use super::result::ClassificationResult;
use crate::config::InferenceConfig;

/// Multipart field the service reads the upload from.
pub const UPLOAD_FIELD: &str = "file";

/// The remote classifier, seen from the client as a single awaited call.
#[async_trait]
pub trait InferenceService {
    async fn predict(&self, image: &ImageFile) -> Result<ClassificationResult, InferenceError>;
}

/// Talks to the service's `POST /prediction/` route over HTTP.
#[derive(Debug, Clone)]
pub struct HttpInferenceService {
    client: Client,
    prediction_url: Url,
}

impl HttpInferenceService {
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let prediction_url = config
            .prediction_url()
            .map_err(|e| InferenceError::Request(e.to_string()))?;
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            prediction_url,
        })
    }

    pub fn prediction_url(&self) -> &Url {
        &self.prediction_url
    }

    fn form(image: &ImageFile) -> Result<Form, InferenceError> {
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.file_name().to_string())
            .mime_str(image.mime_type())
            .map_err(|e| InferenceError::Request(e.to_string()))?;
        Ok(Form::new().part(UPLOAD_FIELD, part))
    }
}

#[async_trait]
impl InferenceService for HttpInferenceService {
    async fn predict(&self, image: &ImageFile) -> Result<ClassificationResult, InferenceError> {
        debug!(
            "POST {} ({} bytes, {})",
            self.prediction_url,
            image.len(),
            image.mime_type()
        );
        let response = self
            .client
            .post(self.prediction_url.clone())
            .multipart(Self::form(image)?)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        debug!("Prediction response status: {}", status);
        if !status.is_success() {
            return Err(InferenceError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(map_transport)?;
        ClassificationResult::from_json(&body)
    }
}

fn map_transport(err: reqwest::Error) -> InferenceError {
    if err.is_timeout() {
        InferenceError::Timeout
    } else {
        InferenceError::Transport(err)
    }
}
