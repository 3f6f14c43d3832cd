use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;

use super::image::ImageFile;

const URI_SCHEME: &str = "preview";

/// Process-local store of displayable image previews.
///
/// Each preview is reachable through an opaque `preview:` URI for as long as
/// its [`PreviewHandle`] is alive. Dropping the handle revokes the URI and
/// frees the backing bytes.
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    entries: Mutex<HashMap<String, ImageFile>>,
}

impl fmt::Debug for PreviewRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewRegistry")
            .field("live", &self.live_count())
            .finish()
    }
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a preview for `image` and returns the handle that keeps it alive.
    pub fn acquire(&self, image: &ImageFile) -> PreviewHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let digest = image.digest();
        let uri = format!("{}:{}/{}", URI_SCHEME, id, &digest[..12]);
        self.entries().insert(uri.clone(), image.clone());
        debug!("Acquired preview {} for {}", uri, image.file_name());
        PreviewHandle {
            uri,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Looks up the image behind a preview URI, if it has not been revoked.
    pub fn resolve(&self, uri: &str) -> Option<ImageFile> {
        self.entries().get(uri).cloned()
    }

    /// Number of previews currently held
    pub fn live_count(&self) -> usize {
        self.entries().len()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, ImageFile>> {
        self.inner.lock_entries()
    }
}

impl RegistryInner {
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, ImageFile>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Scoped ownership of one preview URI. Revoked on drop.
pub struct PreviewHandle {
    uri: String,
    registry: Arc<RegistryInner>,
}

impl PreviewHandle {
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PreviewHandle").field(&self.uri).finish()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.lock_entries().remove(&self.uri);
        debug!("Released preview {}", self.uri);
    }
}
