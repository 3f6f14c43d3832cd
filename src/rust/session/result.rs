use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::ImageFormat;
use serde::Deserialize;

use super::error::InferenceError;

/// A validated diagnosis returned by the inference service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub predicted_disease: String,
    pub condition: String,
    /// Already formatted by the service, e.g. `"92%"`
    pub confidence: String,
    pub advice: String,
    /// Base64-encoded PNG without a data-URI prefix
    pub heatmap_image: Option<String>,
}

/// Wire shape of a successful `/prediction/` response.
#[derive(Debug, Deserialize)]
struct PredictionResponse {
    predicted_disease: String,
    condition: String,
    confidence: String,
    advice: String,
    #[serde(default)]
    gradcam_base64: Option<String>,
}

impl From<PredictionResponse> for ClassificationResult {
    fn from(response: PredictionResponse) -> Self {
        Self {
            predicted_disease: response.predicted_disease,
            condition: response.condition,
            confidence: response.confidence,
            advice: response.advice,
            heatmap_image: response
                .gradcam_base64
                .map(|b64| b64.trim().to_string())
                .filter(|b64| !b64.is_empty()),
        }
    }
}

/// A heat map decoded into raw PNG bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heatmap {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum HeatmapError {
    #[error("Heatmap is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Heatmap is not a decodable PNG: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClassificationResult {
    /// Decodes and validates a response body.
    ///
    /// All four text fields are required and must be strings; a body missing
    /// any of them is rejected as a whole rather than partially accepted.
    pub fn from_json(body: &[u8]) -> Result<Self, InferenceError> {
        let response: PredictionResponse = serde_json::from_slice(body)
            .map_err(|e| InferenceError::Decode(e.to_string()))?;
        Ok(response.into())
    }

    /// The heat map as an inline `data:` URI, ready for an `<img>` style display.
    pub fn heatmap_data_uri(&self) -> Option<String> {
        self.heatmap_image
            .as_ref()
            .map(|b64| format!("data:image/png;base64,{}", b64.trim()))
    }

    /// Decodes the heat map payload, if the service sent one.
    pub fn decode_heatmap(&self) -> Option<Result<Heatmap, HeatmapError>> {
        self.heatmap_image.as_deref().map(decode_heatmap)
    }
}

pub(crate) fn decode_heatmap(b64: &str) -> Result<Heatmap, HeatmapError> {
    let png = STANDARD.decode(b64.trim())?;
    let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png)?;
    Ok(Heatmap {
        width: decoded.width(),
        height: decoded.height(),
        png,
    })
}
