//! # Storage Layer
//!
//! The editor never touches files directly. Everything goes through the
//! [`DataStore`] trait, whose operations mirror what a content repository
//! offers: read, write, copy, delete, lock and properties, all scoped to the
//! project carried by the [`RequestContext`].
//!
//! ## Projects and Visibility
//!
//! A resource is either *published* (no owning project, visible from every
//! project, read-only until someone locks it) or *owned* by one project, in
//! which case it is invisible from every other project. Locking a published
//! resource claims it for the acting project. Paths are global: a path taken
//! in one project cannot be created in another.
//!
//! Content and property mutation require the resource to be locked by the
//! acting user *and* owned by the acting project.
//!
//! ## Page / Body Companions
//!
//! A page at `/a/page.html` owns a body companion at
//! `<body_root>/a/page.html`. Copying a page copies its companion, deleting a
//! page deletes its companion. This is the only cascade the store performs.
//!
//! ## Implementations
//!
//! - [`resource_store::ResourceStore`]: the rules above, over any
//!   [`backend::StorageBackend`].
//! - [`fs::FileStore`]: `ResourceStore<FsBackend>`, persists under a root dir.
//! - [`memory::InMemoryStore`]: `ResourceStore<MemBackend>`, for tests.

use crate::error::Result;
use crate::model::{AccessMode, RequestContext, Resource, ResourceHeader};
use std::collections::BTreeMap;

pub mod backend;
pub mod fs;
pub mod fs_backend;
pub mod mem_backend;
pub mod memory;
pub mod resource_store;

pub const DEFAULT_BODY_ROOT: &str = "/content/bodys";

/// Abstract interface for the resource repository.
pub trait DataStore {
    /// Header of any resource, regardless of owning project.
    fn read_header(&self, ctx: &RequestContext, path: &str) -> Result<ResourceHeader>;

    /// Whether anything exists at `path` in any project.
    fn exists(&self, path: &str) -> Result<bool>;

    /// Full resource, if visible from the current project.
    fn read_file(&self, ctx: &RequestContext, path: &str) -> Result<Resource>;

    /// Replace the content of a resource.
    fn write_file(&mut self, ctx: &RequestContext, path: &str, content: &[u8]) -> Result<()>;

    /// Store a resource exactly as given. Fails if the path is taken.
    fn import(&mut self, resource: Resource) -> Result<()>;

    /// Copy `src` to `dst` inside the current project, locked by the acting user.
    fn copy_file(&mut self, ctx: &RequestContext, src: &str, dst: &str) -> Result<()>;

    /// Delete a resource owned by the current project.
    fn delete_file(&mut self, ctx: &RequestContext, path: &str) -> Result<()>;

    /// Lock a resource for the acting user, claiming it for the current project.
    fn lock(&mut self, ctx: &RequestContext, path: &str) -> Result<()>;

    /// Whether the acting user could write the resource from the current project.
    fn access_write(&self, ctx: &RequestContext, path: &str) -> Result<bool>;

    /// Set the access mode.
    fn chmod(&mut self, ctx: &RequestContext, path: &str, mode: AccessMode) -> Result<()>;

    fn read_property(&self, ctx: &RequestContext, path: &str, key: &str)
        -> Result<Option<String>>;

    fn read_all_properties(
        &self,
        ctx: &RequestContext,
        path: &str,
    ) -> Result<BTreeMap<String, String>>;

    fn write_property(
        &mut self,
        ctx: &RequestContext,
        path: &str,
        key: &str,
        value: &str,
    ) -> Result<()>;

    /// Every stored path, sorted.
    fn list_paths(&self) -> Result<Vec<String>>;
}
