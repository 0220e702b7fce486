//! Revocable in-memory preview handles for selected images.
//!
//! A [`PreviewStore`] plays the role of an object-URL table: every
//! [`PreviewHandle`] it hands out resolves to the image bytes until the
//! handle is dropped, at which point the entry is revoked.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use uuid::Uuid;

const PREVIEW_URI_SCHEME: &str = "preview";

#[derive(Debug, Clone)]
pub struct PreviewEntry {
    pub media_type: Option<String>,
    pub bytes: Arc<[u8]>,
}

#[derive(Debug, Clone, Default)]
pub struct PreviewStore {
    entries: Arc<Mutex<HashMap<Uuid, PreviewEntry>>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, bytes: Arc<[u8]>, media_type: Option<String>) -> PreviewHandle {
        let id = Uuid::new_v4();
        self.entries()
            .insert(id, PreviewEntry { media_type, bytes });
        tracing::debug!(preview_id = %id, "allocated preview handle");
        PreviewHandle {
            id,
            store: self.clone(),
        }
    }

    /// Looks up a preview by its URI; `None` once the handle was released.
    pub fn resolve(&self, uri: &str) -> Option<PreviewEntry> {
        let id = parse_preview_uri(uri)?;
        self.entries().get(&id).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.entries().len()
    }

    fn revoke(&self, id: Uuid) {
        if self.entries().remove(&id).is_some() {
            tracing::debug!(preview_id = %id, "released preview handle");
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Uuid, PreviewEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn parse_preview_uri(uri: &str) -> Option<Uuid> {
    let raw = uri
        .strip_prefix(PREVIEW_URI_SCHEME)?
        .strip_prefix("://")?;
    Uuid::parse_str(raw).ok()
}

/// Owned reference to a preview entry. Dropping it revokes the entry.
pub struct PreviewHandle {
    id: Uuid,
    store: PreviewStore,
}

impl PreviewHandle {
    pub fn uri(&self) -> String {
        format!("{PREVIEW_URI_SCHEME}://{}", self.id)
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("uri", &self.uri())
            .finish()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.store.revoke(self.id);
    }
}
