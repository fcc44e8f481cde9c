use super::backend::StorageBackend;
use super::{DataStore, DEFAULT_BODY_ROOT};
use crate::error::{EditError, Result};
use crate::model::{AccessMode, RequestContext, Resource, ResourceHeader};
use std::collections::BTreeMap;
use tracing::debug;

pub struct ResourceStore<B: StorageBackend> {
    /// The underlying storage backend.
    /// Exposed as pub(crate) for testing and internal access only.
    pub(crate) backend: B,
    body_root: String,
}

impl<B: StorageBackend> ResourceStore<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            body_root: DEFAULT_BODY_ROOT.to_string(),
        }
    }

    pub fn with_body_root(mut self, body_root: &str) -> Self {
        self.body_root = body_root.trim_end_matches('/').to_string();
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Body companion of a page path. Bodies themselves have none.
    pub fn companion_of(&self, path: &str) -> Option<String> {
        if path.starts_with(&format!("{}/", self.body_root)) {
            None
        } else {
            Some(format!("{}{}", self.body_root, path))
        }
    }

    fn header(&self, path: &str) -> Result<ResourceHeader> {
        self.backend
            .load_header(path)?
            .ok_or_else(|| EditError::NotFound(path.to_string()))
    }

    fn visible(&self, ctx: &RequestContext, path: &str) -> Result<Resource> {
        match self.backend.load(path)? {
            Some(resource) if resource.header.is_visible_from(ctx.project()) => Ok(resource),
            _ => Err(EditError::NotFound(path.to_string())),
        }
    }

    /// The mutation invariant: locked by the acting user, owned by the
    /// acting project.
    fn ensure_writable(&self, ctx: &RequestContext, header: &ResourceHeader) -> Result<()> {
        if header.project != Some(ctx.project()) {
            return Err(EditError::AccessDenied(format!(
                "{} is not part of {}",
                header.path,
                ctx.project()
            )));
        }
        match header.lock.as_deref() {
            Some(owner) if owner == ctx.user() => Ok(()),
            Some(owner) => Err(EditError::Locked {
                path: header.path.clone(),
                owner: owner.to_string(),
            }),
            None => Err(EditError::AccessDenied(format!(
                "{} must be locked before it is modified",
                header.path
            ))),
        }
    }

    fn copy_one(&self, ctx: &RequestContext, source: &Resource, dst: &str) -> Result<()> {
        let copy = Resource {
            header: ResourceHeader {
                path: dst.to_string(),
                project: Some(ctx.project()),
                lock: Some(ctx.user().to_string()),
                mode: source.header.mode,
                properties: source.header.properties.clone(),
            },
            content: source.content.clone(),
        };
        self.backend.save(&copy)
    }
}

impl<B: StorageBackend> DataStore for ResourceStore<B> {
    fn read_header(&self, _ctx: &RequestContext, path: &str) -> Result<ResourceHeader> {
        self.header(path)
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.backend.load_header(path)?.is_some())
    }

    fn read_file(&self, ctx: &RequestContext, path: &str) -> Result<Resource> {
        self.visible(ctx, path)
    }

    fn write_file(&mut self, ctx: &RequestContext, path: &str, content: &[u8]) -> Result<()> {
        let mut resource = self.visible(ctx, path)?;
        self.ensure_writable(ctx, &resource.header)?;
        resource.content = content.to_vec();
        self.backend.save(&resource)
    }

    fn import(&mut self, resource: Resource) -> Result<()> {
        if self.exists(resource.path())? {
            return Err(EditError::FileExists(resource.path().to_string()));
        }
        self.backend.save(&resource)
    }

    fn copy_file(&mut self, ctx: &RequestContext, src: &str, dst: &str) -> Result<()> {
        // Copying only reads the source, so it may live in any project.
        let source = self
            .backend
            .load(src)?
            .ok_or_else(|| EditError::NotFound(src.to_string()))?;
        if self.exists(dst)? {
            return Err(EditError::FileExists(dst.to_string()));
        }

        let companions = match (self.companion_of(src), self.companion_of(dst)) {
            (Some(src_body), Some(dst_body)) => match self.backend.load(&src_body)? {
                Some(body) => {
                    if self.exists(&dst_body)? {
                        return Err(EditError::FileExists(dst_body));
                    }
                    Some((body, dst_body))
                }
                None => None,
            },
            _ => None,
        };

        self.copy_one(ctx, &source, dst)?;
        if let Some((body, dst_body)) = companions {
            if let Err(e) = self.copy_one(ctx, &body, &dst_body) {
                self.backend.remove(dst)?;
                return Err(e);
            }
            debug!(src, dst, body = %dst_body, "copied page with body companion");
        }
        Ok(())
    }

    fn delete_file(&mut self, ctx: &RequestContext, path: &str) -> Result<()> {
        let header = self.visible(ctx, path)?.header;
        self.ensure_writable(ctx, &header)?;
        self.backend.remove(path)?;

        if let Some(body) = self.companion_of(path) {
            if let Some(body_header) = self.backend.load_header(&body)? {
                if body_header.project == Some(ctx.project()) {
                    self.backend.remove(&body)?;
                    debug!(path, body = %body, "deleted body companion");
                }
            }
        }
        Ok(())
    }

    fn lock(&mut self, ctx: &RequestContext, path: &str) -> Result<()> {
        let mut header = self.header(path)?;
        if !header.is_visible_from(ctx.project()) {
            return Err(EditError::AccessDenied(format!(
                "{} belongs to another project",
                path
            )));
        }
        if let Some(owner) = header.lock.as_deref() {
            if owner != ctx.user() {
                return Err(EditError::Locked {
                    path: path.to_string(),
                    owner: owner.to_string(),
                });
            }
        }
        header.lock = Some(ctx.user().to_string());
        header.project = Some(ctx.project());
        self.backend.save_header(&header)
    }

    fn access_write(&self, ctx: &RequestContext, path: &str) -> Result<bool> {
        let header = self.header(path)?;
        let locked_by_other = header.lock.as_deref().is_some_and(|u| u != ctx.user());
        Ok(header.mode.is_writable()
            && !locked_by_other
            && header.is_visible_from(ctx.project()))
    }

    fn chmod(&mut self, ctx: &RequestContext, path: &str, mode: AccessMode) -> Result<()> {
        let mut header = self.visible(ctx, path)?.header;
        self.ensure_writable(ctx, &header)?;
        header.mode = mode;
        self.backend.save_header(&header)
    }

    fn read_property(
        &self,
        ctx: &RequestContext,
        path: &str,
        key: &str,
    ) -> Result<Option<String>> {
        Ok(self.visible(ctx, path)?.header.properties.get(key).cloned())
    }

    fn read_all_properties(
        &self,
        ctx: &RequestContext,
        path: &str,
    ) -> Result<BTreeMap<String, String>> {
        Ok(self.visible(ctx, path)?.header.properties)
    }

    fn write_property(
        &mut self,
        ctx: &RequestContext,
        path: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let mut header = self.visible(ctx, path)?.header;
        self.ensure_writable(ctx, &header)?;
        header.properties.insert(key.to_string(), value.to_string());
        self.backend.save_header(&header)
    }

    fn list_paths(&self) -> Result<Vec<String>> {
        self.backend.list_paths()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProjectId;
    use crate::store::mem_backend::MemBackend;

    const WORK: ProjectId = ProjectId(1);
    const SCRATCH: ProjectId = ProjectId(2);

    fn make_store() -> ResourceStore<MemBackend> {
        let mut store = ResourceStore::with_backend(MemBackend::new());
        store
            .import(Resource::published("/a/page.html", "page").with_property("title", "Old"))
            .unwrap();
        store
            .import(Resource::published("/content/bodys/a/page.html", "body"))
            .unwrap();
        store
    }

    fn alice() -> RequestContext {
        RequestContext::new("alice", WORK)
    }

    #[test]
    fn published_resources_are_read_only_until_locked() {
        let mut store = make_store();
        let ctx = alice();
        assert_eq!(store.read_file(&ctx, "/a/page.html").unwrap().content, b"page");
        assert!(matches!(
            store.write_file(&ctx, "/a/page.html", b"x"),
            Err(EditError::AccessDenied(_))
        ));

        store.lock(&ctx, "/a/page.html").unwrap();
        store.write_file(&ctx, "/a/page.html", b"x").unwrap();
        let header = store.read_header(&ctx, "/a/page.html").unwrap();
        assert_eq!(header.project, Some(WORK));
        assert!(header.is_locked_by("alice"));
    }

    #[test]
    fn lock_held_by_another_user_is_reported() {
        let mut store = make_store();
        store.lock(&alice(), "/a/page.html").unwrap();

        let bob = RequestContext::new("bob", WORK);
        assert!(matches!(
            store.lock(&bob, "/a/page.html"),
            Err(EditError::Locked { ref owner, .. }) if owner == "alice"
        ));
        assert!(!store.access_write(&bob, "/a/page.html").unwrap());
        assert!(store.access_write(&alice(), "/a/page.html").unwrap());
    }

    #[test]
    fn copies_are_owned_by_the_acting_project_and_invisible_elsewhere() {
        let mut store = make_store();
        let scratch = RequestContext::new("alice", SCRATCH);
        store.copy_file(&scratch, "/a/page.html", "/a/TMP_page.html").unwrap();

        let copy = store.read_file(&scratch, "/a/TMP_page.html").unwrap();
        assert_eq!(copy.header.project, Some(SCRATCH));
        assert!(copy.header.is_locked_by("alice"));
        assert_eq!(copy.header.properties.get("title").unwrap(), "Old");
        assert!(matches!(
            store.read_file(&alice(), "/a/TMP_page.html"),
            Err(EditError::NotFound(_))
        ));
    }

    #[test]
    fn copying_a_page_carries_its_body() {
        let mut store = make_store();
        let scratch = RequestContext::new("alice", SCRATCH);
        store.copy_file(&scratch, "/a/page.html", "/a/TMP_page.html").unwrap();

        let body = store
            .read_file(&scratch, "/content/bodys/a/TMP_page.html")
            .unwrap();
        assert_eq!(body.content, b"body");
    }

    #[test]
    fn copy_refuses_taken_destination_in_any_project() {
        let mut store = make_store();
        let scratch = RequestContext::new("alice", SCRATCH);
        store.copy_file(&scratch, "/a/page.html", "/a/TMP_page.html").unwrap();

        let other = RequestContext::new("bob", ProjectId(5));
        assert!(matches!(
            store.copy_file(&other, "/a/page.html", "/a/TMP_page.html"),
            Err(EditError::FileExists(_))
        ));
    }

    #[test]
    fn copy_checks_body_collision_before_writing() {
        let mut store = make_store();
        store
            .import(Resource::published("/content/bodys/a/TMP_page.html", "stale"))
            .unwrap();
        let scratch = RequestContext::new("alice", SCRATCH);
        assert!(matches!(
            store.copy_file(&scratch, "/a/page.html", "/a/TMP_page.html"),
            Err(EditError::FileExists(ref p)) if p == "/content/bodys/a/TMP_page.html"
        ));
        assert!(!store.exists("/a/TMP_page.html").unwrap());
    }

    #[test]
    fn deleting_a_page_cascades_to_its_body() {
        let mut store = make_store();
        let scratch = RequestContext::new("alice", SCRATCH);
        store.copy_file(&scratch, "/a/page.html", "/a/TMP_page.html").unwrap();
        store.delete_file(&scratch, "/a/TMP_page.html").unwrap();

        assert!(!store.exists("/a/TMP_page.html").unwrap());
        assert!(!store.exists("/content/bodys/a/TMP_page.html").unwrap());
        assert_eq!(
            store.backend().removed_paths(),
            vec!["/a/TMP_page.html", "/content/bodys/a/TMP_page.html"]
        );
        // Originals stay.
        assert!(store.exists("/content/bodys/a/page.html").unwrap());
    }

    #[test]
    fn property_writes_need_the_lock() {
        let mut store = make_store();
        let ctx = alice();
        assert!(store
            .write_property(&ctx, "/a/page.html", "title", "New")
            .is_err());
        store.lock(&ctx, "/a/page.html").unwrap();
        store
            .write_property(&ctx, "/a/page.html", "title", "New")
            .unwrap();
        assert_eq!(
            store.read_property(&ctx, "/a/page.html", "title").unwrap(),
            Some("New".to_string())
        );
    }

    #[test]
    fn read_only_mode_denies_write_access() {
        let mut store = make_store();
        let mut readonly = Resource::published("/a/locked.html", "");
        readonly.header.mode = AccessMode(1 | 8 | 64);
        store.import(readonly).unwrap();
        assert!(!store.access_write(&alice(), "/a/locked.html").unwrap());
    }
}
