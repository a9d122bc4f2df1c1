use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use pf_core::ports::PreviewResourcePort;
use pf_core::upload::{PreviewHandle, SelectedFile};
use tracing::{debug, warn};
use uuid::Uuid;

/// Hands out `blob:` style handles and tracks which ones are still live.
#[derive(Default)]
pub struct InMemoryPreviewRegistry {
    live: Mutex<HashSet<PreviewHandle>>,
}

impl InMemoryPreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl PreviewResourcePort for InMemoryPreviewRegistry {
    fn acquire(&self, file: &SelectedFile) -> Option<PreviewHandle> {
        if !file.is_image() {
            return None;
        }
        let handle = PreviewHandle::new(format!("blob:{}", Uuid::new_v4()));
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.clone());
        debug!(file = %file.name, handle = %handle, "preview acquired");
        Some(handle)
    }

    fn release(&self, handle: &PreviewHandle) {
        let removed = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(handle);
        if removed {
            debug!(handle = %handle, "preview released");
        } else {
            warn!(handle = %handle, "release of unknown preview handle");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_get_a_handle_until_released() {
        let registry = InMemoryPreviewRegistry::new();
        let handle = registry
            .acquire(&SelectedFile::new("sketch.png", 1024, "image/png"))
            .unwrap();
        assert!(handle.as_str().starts_with("blob:"));
        assert_eq!(registry.live_count(), 1);

        registry.release(&handle);
        registry.release(&handle);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn non_images_have_no_preview() {
        let registry = InMemoryPreviewRegistry::new();
        assert!(registry
            .acquire(&SelectedFile::new("notes.txt", 10, "text/plain"))
            .is_none());
        assert_eq!(registry.live_count(), 0);
    }
}
