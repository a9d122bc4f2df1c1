use crate::upload::{PreviewHandle, SelectedFile};

/// Allocates and frees local preview resources for selected images.
pub trait PreviewResourcePort: Send + Sync {
    /// Returns `None` for files that have no visual preview.
    fn acquire(&self, file: &SelectedFile) -> Option<PreviewHandle>;

    /// Must be called at most once per handle.
    fn release(&self, handle: &PreviewHandle);
}
