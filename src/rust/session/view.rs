use std::fmt;

use super::result::ClassificationResult;
use super::state::{Session, SessionState};

pub const UPLOAD_PROMPT: &str = "Click to Upload Image";
pub const SUBMIT_LABEL: &str = "Predict Condition";
pub const SUBMITTING_LABEL: &str = "Analyzing...";

/// Renderable snapshot of a session, one variant per observable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionView {
    Empty,
    ImageSelected { file_name: String, preview_uri: String },
    Submitting { file_name: String, preview_uri: String },
    ResultShown {
        file_name: String,
        preview_uri: String,
        result: ResultView,
    },
}

/// The result panel: four text fields plus the heat map, when one was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    pub disease: String,
    pub condition: String,
    pub confidence: String,
    pub advice: String,
    pub heatmap: HeatmapView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeatmapView {
    /// The service did not send a heat map
    Absent,
    /// Displayable inline image
    Inline {
        data_uri: String,
        width: u32,
        height: u32,
    },
    /// The service sent a payload that does not decode as a PNG
    Unavailable(String),
}

impl ResultView {
    pub fn from_result(result: &ClassificationResult) -> Self {
        let heatmap = match (result.decode_heatmap(), result.heatmap_data_uri()) {
            (Some(Ok(heatmap)), Some(data_uri)) => HeatmapView::Inline {
                data_uri,
                width: heatmap.width,
                height: heatmap.height,
            },
            (Some(Err(err)), _) => HeatmapView::Unavailable(err.to_string()),
            _ => HeatmapView::Absent,
        };
        Self {
            disease: result.predicted_disease.clone(),
            condition: result.condition.clone(),
            confidence: result.confidence.clone(),
            advice: result.advice.clone(),
            heatmap,
        }
    }
}

impl SessionView {
    pub fn from_session(session: &Session) -> Self {
        let selected = session
            .selected_image()
            .zip(session.preview_uri())
            .map(|(image, uri)| (image.file_name().to_string(), uri.to_string()));

        match (session.state(), selected) {
            (SessionState::Empty, _) | (_, None) => SessionView::Empty,
            (SessionState::ImageSelected, Some((file_name, preview_uri))) => {
                SessionView::ImageSelected { file_name, preview_uri }
            }
            (SessionState::Submitting, Some((file_name, preview_uri))) => {
                SessionView::Submitting { file_name, preview_uri }
            }
            (SessionState::ResultShown, Some((file_name, preview_uri))) => match session.result() {
                Some(result) => SessionView::ResultShown {
                    file_name,
                    preview_uri,
                    result: ResultView::from_result(result),
                },
                None => SessionView::ImageSelected { file_name, preview_uri },
            },
        }
    }

    pub fn state(&self) -> SessionState {
        match self {
            SessionView::Empty => SessionState::Empty,
            SessionView::ImageSelected { .. } => SessionState::ImageSelected,
            SessionView::Submitting { .. } => SessionState::Submitting,
            SessionView::ResultShown { .. } => SessionState::ResultShown,
        }
    }

    /// Whether the submit control should accept input.
    pub fn submit_enabled(&self) -> bool {
        !matches!(self, SessionView::Submitting { .. })
    }

    pub fn submit_label(&self) -> &'static str {
        if self.submit_enabled() {
            SUBMIT_LABEL
        } else {
            SUBMITTING_LABEL
        }
    }
}

impl fmt::Display for SessionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[ {} ]", UPLOAD_PROMPT)?;
        match self {
            SessionView::Empty => {}
            SessionView::ImageSelected { file_name, preview_uri }
            | SessionView::Submitting { file_name, preview_uri }
            | SessionView::ResultShown { file_name, preview_uri, .. } => {
                writeln!(f, "  Uploaded: {} <{}>", file_name, preview_uri)?;
            }
        }
        let marker = if self.submit_enabled() { "" } else { " (disabled)" };
        writeln!(f, "[ {}{} ]", self.submit_label(), marker)?;

        if let SessionView::ResultShown { result, .. } = self {
            writeln!(f)?;
            writeln!(f, "Prediction")?;
            match &result.heatmap {
                HeatmapView::Absent => {}
                HeatmapView::Inline { width, height, .. } => {
                    writeln!(f, "  Heatmap: {}x{} PNG", width, height)?;
                }
                HeatmapView::Unavailable(reason) => {
                    writeln!(f, "  Heatmap unavailable: {}", reason)?;
                }
            }
            writeln!(f, "  Disease: {}", result.disease)?;
            writeln!(f, "  Condition: {}", result.condition)?;
            writeln!(f, "  Accuracy: {}", result.confidence)?;
            writeln!(f, "  Advice: {}", result.advice)?;
            writeln!(f, "[ Close ]")?;
        }
        Ok(())
    }
}
