use std::cell::{Ref, RefCell};

use log::{info, warn};

use super::error::SessionError;
use super::image::ImageFile;
use super::inference::InferenceService;
use super::preview::PreviewRegistry;
use super::result::ClassificationResult;
use super::state::{Session, SessionState};
use super::view::SessionView;

/// What became of a call to [`SessionController::submit_for_classification`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The service answered and the result is now shown
    Completed(ClassificationResult),
    /// Another request was already outstanding; nothing was sent
    AlreadySubmitting,
    /// The session was reset or given a new image while the request was out,
    /// so its response was dropped
    Discarded,
}

/// Mediates user intents against a [`Session`] and an [`InferenceService`].
///
/// All operations take `&self` and are meant to be driven from a single
/// thread. A `reset` or `select_image` may run while a submission is awaiting
/// the service; the late response is then discarded instead of being applied
/// to the superseded session.
///
/// ```rust
/// # use dentascan::{SessionController, HttpInferenceService, InferenceConfig, ImageFile, SessionState};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let service = HttpInferenceService::new(&InferenceConfig::default())?;
/// let controller = SessionController::new(service);
///
/// controller.select_image(ImageFile::new("molar.jpg", "image/jpeg", vec![0xFF, 0xD8]));
/// assert_eq!(controller.state(), SessionState::ImageSelected);
///
/// controller.reset();
/// assert_eq!(controller.state(), SessionState::Empty);
/// # Ok(())
/// # }
/// ```
pub struct SessionController<S> {
    service: S,
    previews: PreviewRegistry,
    session: RefCell<Session>,
}

impl<S> std::fmt::Debug for SessionController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state())
            .field("previews", &self.previews)
            .finish()
    }
}

impl<S: InferenceService> SessionController<S> {
    pub fn new(service: S) -> Self {
        Self::with_previews(service, PreviewRegistry::new())
    }

    pub fn with_previews(service: S, previews: PreviewRegistry) -> Self {
        Self {
            service,
            previews,
            session: RefCell::new(Session::new()),
        }
    }

    /// Selects a new image, replacing any previous one and clearing the result.
    ///
    /// Passing `None` models a cancelled file picker and leaves the session untouched.
    pub fn select_image(&self, file: impl Into<Option<ImageFile>>) {
        let Some(image) = file.into() else {
            return;
        };
        info!(
            "Selected image {} ({} bytes, sha256 {})",
            image.file_name(),
            image.len(),
            &image.digest()[..12]
        );
        self.session.borrow_mut().select(image, &self.previews);
    }

    /// Sends the selected image to the inference service and applies the answer.
    ///
    /// # Returns
    /// * `Err(SessionError::NoImageSelected)` - nothing was selected; no request is made
    /// * `Err(SessionError::PredictionFailed(_))` - the request failed; the image stays selected
    /// * `Ok(SubmitOutcome::AlreadySubmitting)` - a request is already outstanding
    /// * `Ok(SubmitOutcome::Discarded)` - the session moved on before the answer arrived
    /// * `Ok(SubmitOutcome::Completed(result))` - the result is now shown
    pub async fn submit_for_classification(&self) -> Result<SubmitOutcome, SessionError> {
        let (ticket, image) = {
            let mut session = self.session.borrow_mut();
            let Some(image) = session.selected_image().cloned() else {
                info!("Prediction requested with no image selected");
                return Err(SessionError::NoImageSelected);
            };
            if session.is_submitting() {
                info!("Prediction already in flight, ignoring request");
                return Ok(SubmitOutcome::AlreadySubmitting);
            }
            (session.begin_submission(), image)
        };

        info!("Submitting {} for classification", image.file_name());
        let outcome = self.service.predict(&image).await;

        let mut session = self.session.borrow_mut();
        if !session.finish_submission(ticket) {
            warn!(
                "Discarding response for {}: session changed while the request was in flight",
                image.file_name()
            );
            return Ok(SubmitOutcome::Discarded);
        }

        match outcome {
            Ok(result) => {
                info!(
                    "Prediction for {}: {} ({}, {})",
                    image.file_name(),
                    result.predicted_disease,
                    result.condition,
                    result.confidence
                );
                session.apply_result(result.clone());
                Ok(SubmitOutcome::Completed(result))
            }
            Err(err) => {
                warn!("Prediction for {} failed: {}", image.file_name(), err);
                Err(SessionError::PredictionFailed(err))
            }
        }
    }

    /// Clears the image, preview, result and in-flight flag. Idempotent.
    pub fn reset(&self) {
        let mut session = self.session.borrow_mut();
        if session.state() != SessionState::Empty {
            info!("Resetting session");
        }
        session.clear();
    }
}

impl<S> SessionController<S> {
    pub fn state(&self) -> SessionState {
        self.session.borrow().state()
    }

    /// Read access to the session. Do not hold this across an `.await`.
    pub fn session(&self) -> Ref<'_, Session> {
        self.session.borrow()
    }

    /// Snapshot of what the user should currently see
    pub fn view(&self) -> SessionView {
        SessionView::from_session(&self.session.borrow())
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn service(&self) -> &S {
        &self.service
    }
}
