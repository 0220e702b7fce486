use std::{fmt, sync::Arc};

use shared::{domain::WorkflowKind, error::WorkflowError};

use crate::{
    preview::{PreviewHandle, PreviewStore},
    transport::UploadPayload,
};

/// Media types a registration image may have.
pub const REGISTER_ALLOWED_MEDIA_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

/// A file as the user picked it, before validation.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub name: String,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, media_type: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.map(str::to_string),
            bytes,
        }
    }
}

/// A validated image together with its live preview.
pub struct SelectedImage {
    name: String,
    media_type: Option<String>,
    bytes: Arc<[u8]>,
    preview: PreviewHandle,
}

impl SelectedImage {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    pub(crate) fn upload_payload(&self) -> UploadPayload {
        UploadPayload {
            file_name: self.name.clone(),
            media_type: self.media_type.clone(),
            bytes: Arc::clone(&self.bytes),
        }
    }
}

impl fmt::Debug for SelectedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedImage")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("size_bytes", &self.bytes.len())
            .field("preview", &self.preview)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageValidator {
    previews: PreviewStore,
}

impl ImageValidator {
    pub fn new(previews: PreviewStore) -> Self {
        Self { previews }
    }

    /// Registration only accepts JPEG and PNG; search takes any file and
    /// leaves content checks to the service.
    pub fn validate(
        &self,
        file: ImageFile,
        kind: WorkflowKind,
    ) -> Result<SelectedImage, WorkflowError> {
        if kind == WorkflowKind::Register && !is_allowed_register_type(file.media_type.as_deref())
        {
            return Err(WorkflowError::InvalidFileType {
                media_type: file.media_type,
            });
        }

        let bytes: Arc<[u8]> = Arc::from(file.bytes);
        let preview = self
            .previews
            .create(Arc::clone(&bytes), file.media_type.clone());
        Ok(SelectedImage {
            name: file.name,
            media_type: file.media_type,
            bytes,
            preview,
        })
    }
}

fn is_allowed_register_type(media_type: Option<&str>) -> bool {
    let Some(media_type) = media_type else {
        return false;
    };
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    REGISTER_ALLOWED_MEDIA_TYPES.contains(&essence.as_str())
}
