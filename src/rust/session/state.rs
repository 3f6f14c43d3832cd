use super::image::ImageFile;
use super::preview::{PreviewHandle, PreviewRegistry};
use super::result::ClassificationResult;

/// The four observable states of a classification session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    ImageSelected,
    Submitting,
    ResultShown,
}

/// An image together with the preview derived from it.
///
/// Keeping both in one value makes "preview present iff image present"
/// hold by construction; dropping the selection releases the preview.
#[derive(Debug)]
pub(crate) struct Selection {
    pub(crate) image: ImageFile,
    pub(crate) preview: PreviewHandle,
}

/// Identifies one dispatched request and the session epoch it was issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SubmissionTicket {
    pub(crate) id: u64,
    pub(crate) epoch: u64,
}

/// Client-held state for one upload/predict/reset cycle.
#[derive(Debug, Default)]
pub struct Session {
    selection: Option<Selection>,
    result: Option<ClassificationResult>,
    in_flight: Option<u64>,
    /// Bumped by every upload and reset; responses from older epochs are stale.
    epoch: u64,
    next_submission: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_image(&self) -> Option<&ImageFile> {
        self.selection.as_ref().map(|s| &s.image)
    }

    pub fn preview_uri(&self) -> Option<&str> {
        self.selection.as_ref().map(|s| s.preview.uri())
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        self.result.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn state(&self) -> SessionState {
        match (&self.selection, &self.result, self.in_flight) {
            (None, _, _) => SessionState::Empty,
            (Some(_), _, Some(_)) => SessionState::Submitting,
            (Some(_), Some(_), None) => SessionState::ResultShown,
            (Some(_), None, None) => SessionState::ImageSelected,
        }
    }

    /// Replaces the selection and invalidates any earlier diagnosis.
    ///
    /// The previous preview is released when its selection is dropped here.
    pub(crate) fn select(&mut self, image: ImageFile, previews: &PreviewRegistry) {
        let preview = previews.acquire(&image);
        self.selection = Some(Selection { image, preview });
        self.result = None;
        self.epoch += 1;
    }

    /// Marks a request as dispatched and drops any earlier result.
    /// Callers check the guards first.
    pub(crate) fn begin_submission(&mut self) -> SubmissionTicket {
        self.result = None;
        self.next_submission += 1;
        let ticket = SubmissionTicket {
            id: self.next_submission,
            epoch: self.epoch,
        };
        self.in_flight = Some(ticket.id);
        ticket
    }

    /// Clears the in-flight flag for `ticket` and reports whether its
    /// outcome still belongs to the current epoch.
    pub(crate) fn finish_submission(&mut self, ticket: SubmissionTicket) -> bool {
        if self.in_flight == Some(ticket.id) {
            self.in_flight = None;
        }
        ticket.epoch == self.epoch
    }

    pub(crate) fn apply_result(&mut self, result: ClassificationResult) {
        self.result = Some(result);
    }

    pub(crate) fn clear(&mut self) {
        self.selection = None;
        self.result = None;
        self.in_flight = None;
        self.epoch += 1;
    }
}
