//! Drives upload sessions through validation, submission and completion.

use std::{fmt, sync::Arc};

use shared::{
    domain::{AnimalId, WorkflowKind, WorkflowResult},
    error::WorkflowError,
};
use tracing::{debug, info, warn};

use crate::{
    preview::PreviewStore,
    projector::{ProjectionError, ResultProjector},
    session::UploadSession,
    transport::{IdentityService, TransportError, UploadPayload},
    validator::{ImageFile, ImageValidator},
};

/// Ticket for one submission, tagged with the generation it was issued under.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub kind: WorkflowKind,
    pub generation: u64,
    pub upload: UploadPayload,
}

#[derive(Debug, Clone)]
pub struct CompletedRequest {
    pub kind: WorkflowKind,
    pub generation: u64,
    pub outcome: Result<WorkflowResult, WorkflowError>,
}

/// One-time acknowledgement raised when an outcome is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Registered(AnimalId),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered(animal_id) => {
                write!(f, "Animal registered successfully! ID: {animal_id}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Applied { notice: Option<Notice> },
    Discarded,
    /// No request was sent: the session had no image, or one was already pending.
    Rejected,
}

pub struct WorkflowController {
    service: Arc<dyn IdentityService>,
    validator: ImageValidator,
}

impl WorkflowController {
    pub fn new(service: Arc<dyn IdentityService>, previews: PreviewStore) -> Self {
        Self {
            service,
            validator: ImageValidator::new(previews),
        }
    }

    pub fn service(&self) -> Arc<dyn IdentityService> {
        Arc::clone(&self.service)
    }

    /// Validates `file` for the session's workflow and makes it the current
    /// selection. A rejected file is returned so callers can report it
    /// immediately; the session is marked `Failed` unless a request is still
    /// pending, in which case that request keeps its session.
    pub fn select(&self, session: &mut UploadSession, file: ImageFile) -> Result<(), WorkflowError> {
        let kind = session.kind();
        let name = file.name.clone();
        match self.validator.validate(file, kind) {
            Ok(image) => {
                let generation = session.select(image);
                debug!(workflow = %kind, file = %name, generation, "image selected");
                Ok(())
            }
            Err(err) => {
                warn!(workflow = %kind, file = %name, "rejected image selection: {err}");
                if !session.reject_selection(err.clone()) {
                    debug!(workflow = %kind, "request still pending; session left as is");
                }
                Err(err)
            }
        }
    }

    /// Moves the session to `Pending` and hands back the request to run.
    /// Returns `None` when nothing should be sent.
    pub fn begin_submit(&self, session: &mut UploadSession) -> Option<PendingRequest> {
        let kind = session.kind();
        if session.is_busy() {
            warn!(workflow = %kind, "submission ignored while a request is pending");
            return None;
        }
        let Some(image) = session.image() else {
            session.fail(WorkflowError::MissingInput { kind });
            return None;
        };
        let upload = image.upload_payload();
        let generation = session.mark_pending();
        debug!(workflow = %kind, generation, "request pending");
        Some(PendingRequest {
            kind,
            generation,
            upload,
        })
    }

    pub async fn execute(&self, request: PendingRequest) -> CompletedRequest {
        execute_request(self.service.as_ref(), request).await
    }

    /// Applies a finished request to its session, unless the session has
    /// moved on since the request was issued.
    pub fn complete(&self, session: &mut UploadSession, completed: CompletedRequest) -> Completion {
        let CompletedRequest {
            kind,
            generation,
            outcome,
        } = completed;
        if kind != session.kind() {
            warn!(
                workflow = %kind,
                session = %session.kind(),
                "discarding response routed to the wrong session"
            );
            return Completion::Discarded;
        }

        let notice = match &outcome {
            Ok(WorkflowResult::Registered(result)) => {
                Some(Notice::Registered(result.animal_id.clone()))
            }
            _ => None,
        };
        if !session.settle(generation, outcome) {
            warn!(
                workflow = %kind,
                generation,
                current = session.generation(),
                "discarding stale response"
            );
            return Completion::Discarded;
        }

        if kind == WorkflowKind::Register && notice.is_some() {
            session.clear_image();
        }
        Completion::Applied { notice }
    }

    /// Runs one full submission against the session.
    pub async fn submit(&self, session: &mut UploadSession) -> Completion {
        let Some(request) = self.begin_submit(session) else {
            return Completion::Rejected;
        };
        let completed = self.execute(request).await;
        self.complete(session, completed)
    }
}

/// Executes a request without touching any session; safe to run on a
/// worker while the session owner keeps handling input.
pub async fn execute_request(
    service: &dyn IdentityService,
    request: PendingRequest,
) -> CompletedRequest {
    let PendingRequest {
        kind,
        generation,
        upload,
    } = request;
    let outcome = match service.submit(kind, upload).await {
        Ok(raw) => ResultProjector::project(&raw, kind)
            .map_err(|err| classify_projection_error(kind, err)),
        Err(err) => Err(classify_transport_error(kind, err)),
    };
    match &outcome {
        Ok(_) => info!(workflow = %kind, generation, "identity service request succeeded"),
        Err(err) => info!(
            workflow = %kind,
            generation,
            category = ?err.category(),
            "identity service request failed: {err}"
        ),
    }
    CompletedRequest {
        kind,
        generation,
        outcome,
    }
}

pub fn classify_transport_error(kind: WorkflowKind, err: TransportError) -> WorkflowError {
    match err {
        TransportError::Status { status, message } => WorkflowError::Server {
            kind,
            status,
            message,
        },
        TransportError::InvalidBody(detail) => WorkflowError::InvalidResponse { kind, detail },
        TransportError::Network(detail) => WorkflowError::Network { detail },
        TransportError::Client(message) => WorkflowError::Client { message },
    }
}

fn classify_projection_error(kind: WorkflowKind, err: ProjectionError) -> WorkflowError {
    WorkflowError::InvalidResponse {
        kind,
        detail: err.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
