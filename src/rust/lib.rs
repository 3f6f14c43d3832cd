//! Client for a remote dental photo classifier.
//!
//! A [`SessionController`] drives the upload → infer → display → reset
//! cycle against an [`InferenceService`], keeping the image, its preview,
//! the decoded [`ClassificationResult`] and the in-flight flag consistent.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use dentascan::{ImageFile, SessionController, SubmitOutcome};
//!
//! let controller = SessionController::builder()
//!     .with_endpoint("http://127.0.0.1:8000")?
//!     .build()?;
//!
//! controller.select_image(ImageFile::from_path("molar.jpg")?);
//! if let SubmitOutcome::Completed(result) = controller.submit_for_classification().await? {
//!     println!("Disease: {} ({})", result.predicted_disease, result.confidence);
//! }
//! print!("{}", controller.view());
//! # Ok(())
//! # }
//! ```
//!
//! # Threading
//!
//! The controller is single-threaded by construction (its session lives in a
//! `RefCell`). Run it on one task; a `reset` issued while a submission is
//! pending makes the late response be discarded.

pub mod config;
pub mod heatmap_store;
pub mod session;

pub use config::{ConfigError, InferenceConfig, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
pub use heatmap_store::HeatmapStore;
pub use session::{
    is_image_path, BuildError, ClassificationResult, Heatmap, HeatmapError, HeatmapView,
    HttpInferenceService, ImageFile, InferenceError, InferenceService, PreviewHandle,
    PreviewRegistry, ResultView, Session, SessionController, SessionControllerBuilder,
    SessionError, SessionState, SessionView, SubmitOutcome, UPLOAD_FIELD,
};

pub fn init_logger() {
    env_logger::init();
}
