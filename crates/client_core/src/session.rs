//! Per-workflow upload session and its request lifecycle.

use shared::{
    domain::{WorkflowKind, WorkflowResult},
    error::WorkflowError,
};

use crate::validator::SelectedImage;

/// Lifecycle of one session. Result and error live inside the state, so a
/// session can never hold both.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Empty,
    Selected,
    Pending,
    Succeeded(WorkflowResult),
    Failed(WorkflowError),
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Selected => "selected",
            Self::Pending => "pending",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Debug)]
pub struct UploadSession {
    kind: WorkflowKind,
    image: Option<SelectedImage>,
    state: SessionState,
    generation: u64,
}

impl UploadSession {
    pub fn new(kind: WorkflowKind) -> Self {
        Self {
            kind,
            image: None,
            state: SessionState::Empty,
            generation: 0,
        }
    }

    pub fn kind(&self) -> WorkflowKind {
        self.kind
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn image(&self) -> Option<&SelectedImage> {
        self.image.as_ref()
    }

    pub fn preview_uri(&self) -> Option<String> {
        self.image.as_ref().map(|image| image.preview().uri())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn result(&self) -> Option<&WorkflowResult> {
        match &self.state {
            SessionState::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&WorkflowError> {
        match &self.state {
            SessionState::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }

    pub fn is_busy(&self) -> bool {
        self.state == SessionState::Pending
    }

    /// Holds an image and has no request in flight.
    pub fn can_submit(&self) -> bool {
        self.image.is_some() && !self.is_busy()
    }

    /// Drops the image (releasing its preview) and forgets any request in flight.
    pub fn reset(&mut self) {
        self.image = None;
        self.state = SessionState::Empty;
        self.generation += 1;
    }

    /// Replaces the current image. The previous preview is released and any
    /// request still in flight becomes stale.
    pub(crate) fn select(&mut self, image: SelectedImage) -> u64 {
        self.image = Some(image);
        self.state = SessionState::Selected;
        self.generation += 1;
        self.generation
    }

    /// Records a rejected selection. The previously selected image stays and
    /// no request is abandoned: while one is pending the session is left
    /// untouched and `false` is returned.
    pub(crate) fn reject_selection(&mut self, err: WorkflowError) -> bool {
        if self.is_busy() {
            return false;
        }
        self.state = SessionState::Failed(err);
        true
    }

    pub(crate) fn fail(&mut self, err: WorkflowError) {
        self.state = SessionState::Failed(err);
    }

    pub(crate) fn mark_pending(&mut self) -> u64 {
        self.generation += 1;
        self.state = SessionState::Pending;
        self.generation
    }

    /// Applies an outcome if it belongs to the request this session is
    /// still waiting on. Returns `false` for stale outcomes.
    pub(crate) fn settle(
        &mut self,
        generation: u64,
        outcome: Result<WorkflowResult, WorkflowError>,
    ) -> bool {
        if !self.is_busy() || generation != self.generation {
            return false;
        }
        self.state = match outcome {
            Ok(result) => SessionState::Succeeded(result),
            Err(err) => SessionState::Failed(err),
        };
        true
    }

    pub(crate) fn clear_image(&mut self) {
        self.image = None;
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
