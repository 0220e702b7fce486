//! Client core for the animal face ID workflows: image validation, upload
//! sessions, the identity service transport and the workflow controller.

pub mod controller;
pub mod preview;
pub mod projector;
pub mod session;
pub mod transport;
pub mod validator;

pub use controller::{
    execute_request, CompletedRequest, Completion, Notice, PendingRequest, WorkflowController,
};
pub use preview::{PreviewHandle, PreviewStore};
pub use projector::{ProjectionError, ResultProjector};
pub use session::{SessionState, UploadSession};
pub use transport::{HttpIdentityService, IdentityService, TransportError, UploadPayload};
pub use validator::{ImageFile, ImageValidator, SelectedImage};
