use super::backend::StorageBackend;
use crate::error::{EditError, Result};
use crate::model::{Resource, ResourceHeader};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};

/// In-memory storage backend for testing.
///
/// Uses `RefCell` for interior mutability since a session is single-threaded.
/// Besides storage it can inject failures and records removals so tests can
/// observe cleanup.
#[derive(Default)]
pub struct MemBackend {
    resources: RefCell<BTreeMap<String, Resource>>,
    simulate_write_error: RefCell<bool>,
    failing_paths: RefCell<HashSet<String>>,
    failing_headers: RefCell<HashSet<String>>,
    pending_conflicts: RefCell<u32>,
    removed: RefCell<Vec<String>>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable write error simulation for every path.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        *self.simulate_write_error.borrow_mut() = simulate;
    }

    /// Make every write to `path` fail with a store error.
    pub fn fail_writes_to(&self, path: &str) {
        self.failing_paths.borrow_mut().insert(path.to_string());
    }

    /// Make header-only writes (properties, locks, modes) to `path` fail.
    pub fn fail_header_writes_to(&self, path: &str) {
        self.failing_headers.borrow_mut().insert(path.to_string());
    }

    /// The next `count` creations of new resources fail with a storage conflict.
    pub fn inject_conflicts(&self, count: u32) {
        *self.pending_conflicts.borrow_mut() = count;
    }

    /// Paths removed so far, in order.
    pub fn removed_paths(&self) -> Vec<String> {
        self.removed.borrow().clone()
    }

    fn check_write(&self, path: &str) -> Result<()> {
        if *self.simulate_write_error.borrow() || self.failing_paths.borrow().contains(path) {
            return Err(EditError::Store(format!("Simulated write error on {}", path)));
        }
        Ok(())
    }
}

impl StorageBackend for MemBackend {
    fn load_header(&self, path: &str) -> Result<Option<ResourceHeader>> {
        Ok(self.resources.borrow().get(path).map(|r| r.header.clone()))
    }

    fn load(&self, path: &str) -> Result<Option<Resource>> {
        Ok(self.resources.borrow().get(path).cloned())
    }

    fn save_header(&self, header: &ResourceHeader) -> Result<()> {
        self.check_write(&header.path)?;
        if self.failing_headers.borrow().contains(&header.path) {
            return Err(EditError::Store(format!(
                "Simulated header write error on {}",
                header.path
            )));
        }
        let mut resources = self.resources.borrow_mut();
        match resources.get_mut(&header.path) {
            Some(existing) => {
                existing.header = header.clone();
                Ok(())
            }
            None => Err(EditError::NotFound(header.path.clone())),
        }
    }

    fn save(&self, resource: &Resource) -> Result<()> {
        self.check_write(resource.path())?;
        let mut resources = self.resources.borrow_mut();
        if !resources.contains_key(resource.path()) {
            let mut pending = self.pending_conflicts.borrow_mut();
            if *pending > 0 {
                *pending -= 1;
                return Err(EditError::Conflict(resource.path().to_string()));
            }
        }
        resources.insert(resource.path().to_string(), resource.clone());
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<()> {
        if self.resources.borrow_mut().remove(path).is_some() {
            self.removed.borrow_mut().push(path.to_string());
        }
        Ok(())
    }

    fn list_paths(&self) -> Result<Vec<String>> {
        Ok(self.resources.borrow().keys().cloned().collect())
    }
}
