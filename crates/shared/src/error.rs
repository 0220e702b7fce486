use thiserror::Error;

use crate::domain::WorkflowKind;

pub const UNKNOWN_SERVER_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Server,
    Network,
    Client,
}

/// Every failure a workflow can surface to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("Invalid file type. Only JPEG and PNG are allowed.")]
    InvalidFileType { media_type: Option<String> },
    #[error("Please select an image to {}.", .kind.label())]
    MissingInput { kind: WorkflowKind },
    #[error("Error {} animal: {}", .kind.failure_verb(), .message.as_deref().unwrap_or(UNKNOWN_SERVER_ERROR))]
    Server {
        kind: WorkflowKind,
        status: u16,
        message: Option<String>,
    },
    /// A 2xx response that lacks a required field. Rendered like a server error.
    #[error("Error {} animal: {detail}", .kind.failure_verb())]
    InvalidResponse { kind: WorkflowKind, detail: String },
    #[error("No response from the server. Please check your connection.")]
    Network { detail: String },
    #[error("Error: {message}")]
    Client { message: String },
}

impl WorkflowError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidFileType { .. } | Self::MissingInput { .. } => ErrorCategory::Validation,
            Self::Server { .. } | Self::InvalidResponse { .. } => ErrorCategory::Server,
            Self::Network { .. } => ErrorCategory::Network,
            Self::Client { .. } => ErrorCategory::Client,
        }
    }
}
