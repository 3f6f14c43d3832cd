use std::fmt;

/// Reasons a single prediction round-trip did not produce a usable result.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Request timed out")]
    Timeout,
    #[error("Inference service returned HTTP {0}")]
    Status(u16),
    #[error("Malformed response: {0}")]
    Decode(String),
    #[error("Could not build request: {0}")]
    Request(String),
}

/// User-visible conditions raised by the session controller.
///
/// Neither variant is fatal: the session is always left in a state that was
/// reachable before the failing operation.
#[derive(Debug)]
pub enum SessionError {
    /// A prediction was requested before any image was chosen
    NoImageSelected,
    /// The inference service could not be reached or answered with something unusable
    PredictionFailed(InferenceError),
}

impl SessionError {
    /// Short notice suitable for showing to the user
    pub fn notice(&self) -> &'static str {
        match self {
            Self::NoImageSelected => "Please upload an image first.",
            Self::PredictionFailed(_) => "Prediction failed. Check the server.",
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoImageSelected => write!(f, "No image selected"),
            Self::PredictionFailed(err) => write!(f, "Prediction failed: {}", err),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NoImageSelected => None,
            Self::PredictionFailed(err) => Some(err),
        }
    }
}

impl From<InferenceError> for SessionError {
    fn from(err: InferenceError) -> Self {
        SessionError::PredictionFailed(err)
    }
}
