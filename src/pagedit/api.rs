//! # API Facade
//!
//! The single entry point for clients. It owns the store, the configuration
//! and the presenter, and hands out round trips of the session engine.
//!
//! ## Role and Responsibilities
//!
//! - **Parses** flat request parameters into an [`EditRequest`]
//! - **Dispatches** to the [`Engine`] with the owned collaborators
//! - **Seeds** layouts and pages so there is something to edit
//! - **Lists** the choices a client offers: layouts, editor modes, preview
//!
//! Sessions are not kept here. The caller owns each [`SessionState`] and
//! passes it to every call, the same way it owns the request context.
//!
//! ## Generic Over DataStore
//!
//! - Production: `EditorApi<FileStore>`
//! - Testing: `EditorApi<InMemoryStore>`

use std::collections::HashMap;
use tracing::{debug, info};

use crate::allocator;
use crate::config::EditorConfig;
use crate::document::{
    BodyDocument, ControlDescriptor, LayoutDocument, BODY_ELEMENT, DEFAULT_BODY_CLASS,
    DEFAULT_TEMPLATE_CLASS, SCRIPT_SECTION,
};
use crate::error::{EditError, Result};
use crate::model::{ClientInfo, EditorMode, RequestContext, Resource};
use crate::session::commit::TITLE_PROPERTY;
use crate::session::{EditRequest, Engine, Outcome, PlainPresenter, Presenter, Redirector};
use crate::store::DataStore;

pub use crate::session::SessionState;

pub struct EditorApi<S: DataStore, P: Presenter = PlainPresenter> {
    store: S,
    config: EditorConfig,
    presenter: P,
}

impl<S: DataStore> EditorApi<S> {
    pub fn new(store: S, config: EditorConfig) -> Self {
        Self::with_presenter(store, config, PlainPresenter)
    }
}

impl<S: DataStore, P: Presenter> EditorApi<S, P> {
    pub fn with_presenter(store: S, config: EditorConfig, presenter: P) -> Self {
        Self {
            store,
            config,
            presenter,
        }
    }

    /// A context for `user` in the configured working project.
    pub fn context(&self, user: &str) -> RequestContext {
        RequestContext::new(user, self.config.default_project)
    }

    /// Start an episode on `file`.
    pub fn open<R: Redirector>(
        &mut self,
        ctx: &mut RequestContext,
        session: &mut SessionState,
        client: &ClientInfo,
        redirector: &mut R,
        file: &str,
    ) -> Result<Outcome> {
        self.submit(ctx, session, client, redirector, EditRequest::open(file))
    }

    /// Run one round trip from raw request parameters.
    pub fn round_trip<R: Redirector>(
        &mut self,
        ctx: &mut RequestContext,
        session: &mut SessionState,
        client: &ClientInfo,
        redirector: &mut R,
        params: &HashMap<String, String>,
    ) -> Result<Outcome> {
        let request = EditRequest::from_params(params)?;
        self.submit(ctx, session, client, redirector, request)
    }

    pub fn submit<R: Redirector>(
        &mut self,
        ctx: &mut RequestContext,
        session: &mut SessionState,
        client: &ClientInfo,
        redirector: &mut R,
        request: EditRequest,
    ) -> Result<Outcome> {
        Engine::new(
            &mut self.store,
            &self.config,
            &self.presenter,
            redirector,
            client,
        )
        .round_trip(ctx, session, request)
    }

    /// Publish a master layout at `path`.
    pub fn create_layout(&mut self, path: &str, layout: &LayoutDocument) -> Result<()> {
        self.store
            .import(Resource::published(path, serde_json::to_vec(layout)?))?;
        info!(path, "layout created");
        Ok(())
    }

    /// Publish a page using `layout`, with a body holding `sections` in order.
    /// Returns the body path.
    pub fn create_page(
        &mut self,
        path: &str,
        title: &str,
        layout: &str,
        sections: &[(String, String)],
    ) -> Result<String> {
        if !self.store.exists(layout)? {
            return Err(EditError::NotFound(layout.to_string()));
        }
        let body_path = allocator::body_path_for(&self.config, path);
        for taken in [path, body_path.as_str()] {
            if self.store.exists(taken)? {
                return Err(EditError::FileExists(taken.to_string()));
            }
        }

        let descriptor = ControlDescriptor::new(layout, DEFAULT_TEMPLATE_CLASS).with_element(
            BODY_ELEMENT,
            DEFAULT_BODY_CLASS,
            &body_path,
        );
        let body = if sections.is_empty() {
            BodyDocument::with_default_section("")
        } else {
            let mut body = BodyDocument::default();
            for (name, content) in sections {
                body.set_section_content(name, content);
            }
            body
        };

        let mut page = Resource::published(path, serde_json::to_vec(&descriptor)?);
        if !title.is_empty() {
            page = page.with_property(TITLE_PROPERTY, title);
        }
        self.store.import(page)?;
        self.store
            .import(Resource::published(&body_path, serde_json::to_vec(&body)?))?;
        info!(path, body = %body_path, "page created");
        Ok(body_path)
    }

    /// The resource at `path` as seen from `ctx`'s project.
    pub fn show(&self, ctx: &RequestContext, path: &str) -> Result<Resource> {
        self.store.read_file(ctx, path)
    }

    /// Sections of the body at `path`.
    pub fn sections(&self, ctx: &RequestContext, path: &str) -> Result<BodyDocument> {
        BodyDocument::read(&self.store, ctx, path)
    }

    /// Master layouts visible from `ctx` under the configured layout root,
    /// sorted by path. Resources there that are not layouts are skipped.
    pub fn available_layouts(&self, ctx: &RequestContext) -> Result<Vec<(String, LayoutDocument)>> {
        let root = format!("{}/", self.config.layout_root.trim_end_matches('/'));
        let mut paths = self.store.list_paths()?;
        paths.retain(|path| path.starts_with(&root));
        paths.sort();

        let mut layouts = Vec::new();
        for path in paths {
            match LayoutDocument::read(&self.store, ctx, &path) {
                Ok(layout) => layouts.push((path, layout)),
                Err(e @ (EditError::NotFound(_) | EditError::Serialization(_))) => {
                    debug!(path = %path, error = %e, "skipped, not a usable layout");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(layouts)
    }

    /// Editor modes a client may pick while editing `section`.
    ///
    /// The script section and clients without rich-text support only get text.
    pub fn editor_modes(&self, client: &ClientInfo, section: &str) -> Vec<EditorMode> {
        if client.rich_text && section != SCRIPT_SECTION {
            vec![EditorMode::Html, EditorMode::Text]
        } else {
            vec![EditorMode::Text]
        }
    }

    /// Where a preview of the running episode is shown.
    pub fn preview_path<'s>(&self, session: &'s SessionState) -> Option<&'s str> {
        session.temp_page_file.as_deref()
    }

    pub fn list_paths(&self) -> Result<Vec<String>> {
        self.store.list_paths()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
