use crate::error::Result;
use crate::model::{Resource, ResourceHeader};

/// Raw resource I/O.
///
/// A backend knows how to persist resources (filesystem vs memory). The
/// visibility, locking and cascade rules live in
/// [`ResourceStore`](super::resource_store::ResourceStore).
pub trait StorageBackend {
    /// Load a resource header. `Ok(None)` if nothing exists at `path`.
    fn load_header(&self, path: &str) -> Result<Option<ResourceHeader>>;

    /// Load header and content.
    fn load(&self, path: &str) -> Result<Option<Resource>>;

    /// Persist a header, leaving content untouched.
    fn save_header(&self, header: &ResourceHeader) -> Result<()>;

    /// Persist header and content together.
    /// MUST be atomic per file so a crash never leaves half-written content.
    fn save(&self, resource: &Resource) -> Result<()>;

    /// Remove the resource. Removing a missing path is not an error.
    fn remove(&self, path: &str) -> Result<()>;

    /// All stored paths, sorted.
    fn list_paths(&self) -> Result<Vec<String>>;
}
