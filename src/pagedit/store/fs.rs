use super::fs_backend::FsBackend;
use super::resource_store::ResourceStore;
use std::path::PathBuf;

/// Production store, persisted under a root directory.
pub type FileStore = ResourceStore<FsBackend>;

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        ResourceStore::with_backend(FsBackend::new(root))
    }
}
