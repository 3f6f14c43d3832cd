mod builder;
mod controller;
mod error;
mod image;
mod inference;
mod preview;
mod result;
mod state;
mod view;

pub use builder::{BuildError, SessionControllerBuilder};
pub use controller::{SessionController, SubmitOutcome};
pub use error::{InferenceError, SessionError};
pub use image::{is_image_path, ImageFile};
pub use inference::{HttpInferenceService, InferenceService, UPLOAD_FIELD};
pub use preview::{PreviewHandle, PreviewRegistry};
pub use result::{ClassificationResult, Heatmap, HeatmapError};
pub use state::{Session, SessionState};
pub use view::{HeatmapView, ResultView, SessionView};
