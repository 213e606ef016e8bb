use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// A displayed image: an opaque local URL plus the bytes it resolves to.
#[derive(Debug, Clone)]
pub struct ImageHandle {
    url: String,
    bytes: Arc<[u8]>,
}

impl ImageHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// In-memory map from local `blob:` URLs to image bytes.
///
/// Every URL handed out by [`ObjectUrls::create`] stays alive until it is
/// revoked, so callers must revoke a handle once it is no longer displayed.
#[derive(Clone, Default)]
pub struct ObjectUrls {
    entries: Arc<Mutex<HashMap<String, Arc<[u8]>>>>,
}

impl ObjectUrls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, bytes: Vec<u8>) -> ImageHandle {
        let url = format!("blob:imagegen/{}", Uuid::new_v4());
        let bytes: Arc<[u8]> = bytes.into();
        self.entries().insert(url.clone(), bytes.clone());
        ImageHandle { url, bytes }
    }

    pub fn resolve(&self, url: &str) -> Option<Arc<[u8]>> {
        self.entries().get(url).cloned()
    }

    /// Returns `false` if the URL was unknown or already revoked.
    pub fn revoke(&self, url: &str) -> bool {
        self.entries().remove(url).is_some()
    }

    pub fn live_count(&self) -> usize {
        self.entries().len()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Arc<[u8]>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
