//! Wire shapes exchanged with the identity service. Success bodies are
//! projected from raw JSON by the client; only the failure body is typed.

use serde::{Deserialize, Serialize};

/// Multipart field that carries the image bytes on both endpoints.
pub const IMAGE_FIELD: &str = "image";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}
