use super::mem_backend::MemBackend;
use super::resource_store::ResourceStore;

pub type InMemoryStore = ResourceStore<MemBackend>;

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        ResourceStore::with_backend(MemBackend::new())
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use crate::document::{BodyDocument, ControlDescriptor, LayoutDocument, BODY_ELEMENT};
    use crate::model::Resource;
    use crate::store::DataStore;

    pub const LAYOUT: &str = "/system/layouts/main.html";
    pub const ALT_LAYOUT: &str = "/system/layouts/wide.html";
    pub const LAYOUT_CLASS: &str = crate::document::DEFAULT_TEMPLATE_CLASS;
    pub const BODY_CLASS: &str = crate::document::DEFAULT_BODY_CLASS;

    /// Published resources for page editing tests.
    pub struct StoreFixture {
        pub store: InMemoryStore,
    }

    impl Default for StoreFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl StoreFixture {
        /// A store with two layouts and nothing else.
        pub fn new() -> Self {
            let mut store = InMemoryStore::new();
            let main = LayoutDocument {
                body_tag: Some("class=\"main\"".to_string()),
                stylesheet: Some("/css/main.css".to_string()),
            };
            let wide = LayoutDocument {
                body_tag: Some("class=\"wide\"".to_string()),
                stylesheet: Some("/css/wide.css".to_string()),
            };
            store
                .import(Resource::published(LAYOUT, serde_json::to_vec(&main).unwrap()))
                .unwrap();
            store
                .import(Resource::published(
                    ALT_LAYOUT,
                    serde_json::to_vec(&wide).unwrap(),
                ))
                .unwrap();
            Self { store }
        }

        /// Add a page bound to `<body_root><path>`, titled `title`, whose body
        /// holds `sections` in order.
        pub fn with_page(mut self, path: &str, title: &str, sections: &[(&str, &str)]) -> Self {
            let body_path = format!("{}{}", crate::store::DEFAULT_BODY_ROOT, path);
            let descriptor = ControlDescriptor::new(LAYOUT, LAYOUT_CLASS).with_element(
                BODY_ELEMENT,
                BODY_CLASS,
                &body_path,
            );
            let mut body = BodyDocument::default();
            for (name, content) in sections {
                body.set_section_content(name, content);
            }

            self.store
                .import(
                    Resource::published(path, serde_json::to_vec(&descriptor).unwrap())
                        .with_property("title", title),
                )
                .unwrap();
            self.store
                .import(
                    Resource::published(body_path, serde_json::to_vec(&body).unwrap())
                        .with_property("keywords", "fixture"),
                )
                .unwrap();
            self
        }

        /// Add a page whose descriptor has no body binding.
        pub fn with_unbound_page(mut self, path: &str) -> Self {
            let descriptor = ControlDescriptor::new(LAYOUT, LAYOUT_CLASS);
            self.store
                .import(Resource::published(
                    path,
                    serde_json::to_vec(&descriptor).unwrap(),
                ))
                .unwrap();
            self
        }

        /// Store an arbitrary resource as given.
        pub fn with_resource(mut self, resource: Resource) -> Self {
            self.store.import(resource).unwrap();
            self
        }
    }
}
