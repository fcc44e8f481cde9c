//! # Editing Session Engine
//!
//! One call to [`Engine::round_trip`] is one request/response cycle of the
//! page editor. The engine holds nothing between calls; everything that must
//! survive lives in the caller-owned [`SessionState`].
//!
//! ## Phases
//!
//! - **Fresh** (no `content` parameter): resolve the body binding, check and
//!   take locks, allocate the temporary page (its body comes along), select
//!   the first section and write the temporary descriptor.
//! - **Editing** (`content` present): diff the request against the session,
//!   apply each [`Change`] in rank order, then store the submitted content in
//!   the section the client was editing.
//!
//! After either phase the action decides the ending: `preview` redirects to
//! the temporary page, `save` commits (before `exit` is looked at, so
//! `saveexit` commits first), `exit` deletes the temporary files and
//! redirects to the landing page. Without a terminal action the active
//! section is rendered and the session's `old_*` fields are refreshed.
//!
//! ## Scratch Scope
//!
//! Every read or write of a temporary file happens inside a
//! [`RequestContext::switch_to`] block, so the caller's project is back in
//! place however the block is left.
//!
//! ## Failure Handling
//!
//! Drafting is best-effort: a failed title write, a refused rename or an
//! unresolvable stylesheet is logged through [`absorb`] and the round trip
//! carries on. Everything else (bootstrap, content writes, commit, redirect)
//! fails the round trip.

use chrono::Utc;
use tracing::{debug, info, warn};

use super::changes::{diff, Change, Changeset};
use super::collab::{Presenter, Redirector};
use super::commit::{commit, CommitPlan, TITLE_PROPERTY};
use super::request::{
    decode_content, encode_content, EditRequest, Phase, PARAM_BODY_FILE, PARAM_TEMPLATE,
};
use super::state::SessionState;
use crate::allocator;
use crate::config::EditorConfig;
use crate::document::{
    BodyDocument, ControlDescriptor, LayoutDocument, BODY_ELEMENT, DEFAULT_SECTION,
    SCRIPT_SECTION,
};
use crate::error::{EditError, Result};
use crate::model::{ClientInfo, EditorMode, RequestContext};
use crate::store::DataStore;

/// Prefix of sections created by `newbody`.
const NEW_SECTION_PREFIX: &str = "body";

const TEMP_PAGE_KEY: &str = "te_temppagefile";

/// What the client gets back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Send the client to `target`.
    Redirect { target: String },
    /// Show `content` in the editor; `params` come back with the next request.
    Render {
        content: String,
        params: EditRequest,
    },
}

/// Everything one round trip works on.
struct Draft {
    page: String,
    temp_page: String,
    temp_body: String,
    body_file: String,
    body_class: String,
    template_class: String,
    editor: EditorMode,
    /// Section to show next.
    body: String,
    /// Section the client was editing; submitted content goes here.
    old_body: String,
    body_title: String,
    title: String,
    layout: String,
    stylesheet: String,
    layout_doc: LayoutDocument,
    descriptor: ControlDescriptor,
    body_doc: BodyDocument,
    preview: bool,
}

pub struct Engine<'a, S: DataStore + ?Sized, P: Presenter, R: Redirector> {
    store: &'a mut S,
    config: &'a EditorConfig,
    presenter: &'a P,
    redirector: &'a mut R,
    client: &'a ClientInfo,
}

impl<'a, S, P, R> Engine<'a, S, P, R>
where
    S: DataStore + ?Sized,
    P: Presenter,
    R: Redirector,
{
    pub fn new(
        store: &'a mut S,
        config: &'a EditorConfig,
        presenter: &'a P,
        redirector: &'a mut R,
        client: &'a ClientInfo,
    ) -> Self {
        Self {
            store,
            config,
            presenter,
            redirector,
            client,
        }
    }

    pub fn round_trip(
        &mut self,
        ctx: &mut RequestContext,
        session: &mut SessionState,
        request: EditRequest,
    ) -> Result<Outcome> {
        let mut draft = match Phase::of(&request) {
            Phase::Fresh => self.bootstrap(ctx, session, &request)?,
            Phase::Editing => {
                let mut draft = self.resume(ctx, session, &request)?;
                let changes = diff(session, &request);
                self.apply_changes(ctx, session, &mut draft, &changes);
                self.store_content(ctx, session, &mut draft, &request)?;
                draft
            }
        };

        if draft.preview {
            return self.redirect(&draft.temp_page);
        }
        if request.save_requested() {
            self.save(ctx, &mut draft)?;
        }
        if request.exit_requested() {
            return self.exit(ctx, session, draft);
        }
        self.continuation(session, draft)
    }

    fn bootstrap(
        &mut self,
        ctx: &mut RequestContext,
        session: &mut SessionState,
        request: &EditRequest,
    ) -> Result<Draft> {
        // A fresh request starts over from the originals.
        self.discard_episode(ctx, session);

        let page = request.file.as_str();
        let original = ControlDescriptor::read(&*self.store, ctx, page)?;
        let (body_class, body_file) = original
            .body_binding()
            .map(|(class, template)| (class.to_string(), template.to_string()))
            .ok_or_else(|| EditError::BodyBindingMissing(page.to_string()))?;

        // All checks before the first lock, so a refusal leaves no lock behind.
        for path in [page, body_file.as_str()] {
            if !self.store.access_write(ctx, path)? {
                return Err(EditError::AccessDenied(path.to_string()));
            }
        }
        for path in [page, body_file.as_str()] {
            if !self.store.read_header(ctx, path)?.is_locked_by(ctx.user()) {
                self.store.lock(ctx, path)?;
                debug!(path, user = ctx.user(), "locked for editing");
            }
        }

        let editor = match request.editor {
            Some(editor) => editor,
            None => {
                let editor = self.config.default_editor_for(self.client);
                session.page_editor = Some(editor);
                editor
            }
        };
        let title = self
            .store
            .read_property(ctx, page, TITLE_PROPERTY)?
            .unwrap_or_default();

        let header = self.store.read_header(ctx, page)?;
        let temp_page = allocator::allocate(&mut *self.store, ctx, self.config, &header)?;
        let temp_body = allocator::body_path_for(self.config, &temp_page);
        session.temp_page_file = Some(temp_page.clone());
        session.temp_body_file = Some(temp_body.clone());
        session.started_at = Some(Utc::now());
        info!(page, temp = %temp_page, user = ctx.user(), "editing episode started");

        let draft = Draft {
            page: page.to_string(),
            temp_page: temp_page.clone(),
            temp_body,
            body_file,
            body_class,
            template_class: original.template_class.clone(),
            editor,
            body: String::new(),
            old_body: String::new(),
            body_title: String::new(),
            title,
            layout: original.master_template().to_string(),
            stylesheet: String::new(),
            layout_doc: LayoutDocument::default(),
            descriptor: original,
            body_doc: BodyDocument::default(),
            preview: request.preview_requested(),
        };

        match self.prepare_temp_files(ctx, session, draft) {
            Ok(draft) => Ok(draft),
            Err(e) => {
                warn!(temp = %temp_page, error = %e, "bootstrap failed, discarding temporary files");
                self.discard_episode(ctx, session);
                Err(e)
            }
        }
    }

    /// Delete the temporary pair of the running episode, if any, and forget it.
    fn discard_episode(&mut self, ctx: &mut RequestContext, session: &mut SessionState) {
        if let Some(temp_page) = session.temp_page_file.take() {
            debug!(temp = %temp_page, "discarding temporary files");
            let scratch = ctx.switch_to(self.config.scratch_project);
            // The store removes the temporary body along with the page.
            absorb(
                "temporary file cleanup",
                self.store.delete_file(&scratch, &temp_page),
            );
        }
        session.clear();
    }

    /// Select the first section and point the temporary descriptor at it.
    fn prepare_temp_files(
        &mut self,
        ctx: &mut RequestContext,
        session: &mut SessionState,
        mut draft: Draft,
    ) -> Result<Draft> {
        draft.layout_doc = LayoutDocument::read(&*self.store, ctx, &draft.layout)?;

        {
            let scratch = ctx.switch_to(self.config.scratch_project);
            // Bodies outside the body root are not copied along with the page.
            if !self.store.exists(&draft.temp_body)? {
                self.store
                    .copy_file(&scratch, &draft.body_file, &draft.temp_body)?;
            }
            draft.body_doc = BodyDocument::read(&*self.store, &scratch, &draft.temp_body)?;
            draft.descriptor = ControlDescriptor::read(&*self.store, &scratch, &draft.temp_page)?;

            if draft.body_doc.sections.is_empty() {
                draft.body_doc = BodyDocument::with_default_section("");
            }
            draft.body = draft
                .body_doc
                .first_section()
                .unwrap_or(DEFAULT_SECTION)
                .to_string();
            draft.old_body = draft.body.clone();
            draft.body_title = section_title(&draft.body);

            draft.descriptor.set_selector(BODY_ELEMENT, &draft.body);
            draft.descriptor.set_template(BODY_ELEMENT, &draft.temp_body);
            draft
                .descriptor
                .write(&mut *self.store, &scratch, &draft.temp_page)?;
        }

        draft.stylesheet = self.resolve_stylesheet(&draft.layout_doc);
        session.stylesheet = Some(draft.stylesheet.clone());
        session.template_class = Some(draft.template_class.clone());
        Ok(draft)
    }

    fn resume(
        &mut self,
        ctx: &mut RequestContext,
        session: &SessionState,
        request: &EditRequest,
    ) -> Result<Draft> {
        let (temp_page, temp_body) = session
            .temp_files()
            .map(|(page, body)| (page.to_string(), body.to_string()))
            .ok_or(EditError::MissingParameter(TEMP_PAGE_KEY))?;
        let body_file = request
            .body_file
            .clone()
            .filter(|f| !f.is_empty())
            .ok_or(EditError::MissingParameter(PARAM_BODY_FILE))?;
        let layout = request
            .template
            .clone()
            .or_else(|| session.old_layout.clone())
            .filter(|l| !l.is_empty())
            .ok_or(EditError::MissingParameter(PARAM_TEMPLATE))?;

        let editor = request
            .editor
            .or(session.old_editor)
            .unwrap_or_else(|| self.config.default_editor_for(self.client));
        let body = request
            .body
            .clone()
            .or_else(|| session.old_body.clone())
            .unwrap_or_else(|| DEFAULT_SECTION.to_string());
        let old_body = session.old_body.clone().unwrap_or_else(|| body.clone());

        let layout_doc = LayoutDocument::read(&*self.store, ctx, &layout)?;
        let (descriptor, body_doc) = {
            let scratch = ctx.switch_to(self.config.scratch_project);
            (
                ControlDescriptor::read(&*self.store, &scratch, &temp_page)?,
                BodyDocument::read(&*self.store, &scratch, &temp_body)?,
            )
        };
        let template_class = session
            .template_class
            .clone()
            .unwrap_or_else(|| descriptor.template_class.clone());

        Ok(Draft {
            page: request.file.clone(),
            temp_page,
            temp_body,
            body_file,
            body_class: request.body_class.clone().unwrap_or_default(),
            template_class,
            editor,
            body,
            old_body,
            body_title: request
                .body_title
                .clone()
                .or_else(|| session.old_body_title.clone())
                .unwrap_or_default(),
            title: request
                .title
                .clone()
                .or_else(|| session.old_title.clone())
                .unwrap_or_default(),
            layout,
            stylesheet: session.stylesheet.clone().unwrap_or_default(),
            layout_doc,
            descriptor,
            body_doc,
            preview: false,
        })
    }

    fn apply_changes(
        &mut self,
        ctx: &mut RequestContext,
        session: &mut SessionState,
        draft: &mut Draft,
        changes: &Changeset,
    ) {
        for change in changes.iter() {
            debug!(page = %draft.page, ?change, "applying change");
            match change {
                Change::Title(title) => self.change_title(ctx, draft, title),
                Change::Layout(layout) => self.change_layout(session, draft, layout),
                Change::BodyTitle(name) => {
                    self.rename_section(session, draft, name, changes.selects_body())
                }
                Change::BodySelection(body) => self.select_section(session, draft, body),
                Change::NewBody => self.new_section(session, draft),
                Change::Preview => draft.preview = true,
            }
        }
    }

    /// Titles go to the temporary page only; the original gets them on save.
    fn change_title(&mut self, ctx: &mut RequestContext, draft: &mut Draft, title: &str) {
        draft.title = title.to_string();
        let scratch = ctx.switch_to(self.config.scratch_project);
        absorb(
            "title update",
            self.store
                .write_property(&scratch, &draft.temp_page, TITLE_PROPERTY, title),
        );
    }

    fn change_layout(&mut self, session: &mut SessionState, draft: &mut Draft, layout: &str) {
        draft.layout = layout.to_string();
        draft.descriptor.set_master_template(layout);
        draft.stylesheet = self.resolve_stylesheet(&draft.layout_doc);
        session.stylesheet = Some(draft.stylesheet.clone());
    }

    fn rename_section(
        &mut self,
        session: &mut SessionState,
        draft: &mut Draft,
        name: &str,
        selects_body: bool,
    ) {
        let current = draft.old_body.clone();
        if current == DEFAULT_SECTION || current == SCRIPT_SECTION {
            debug!(section = %current, "section keeps its name");
            draft.body_title = session.old_body_title.clone().unwrap_or_default();
            return;
        }

        let name = if name.eq_ignore_ascii_case(SCRIPT_SECTION) {
            SCRIPT_SECTION.to_string()
        } else {
            name.to_string()
        };
        match absorb(
            "section rename",
            draft.body_doc.rename_section(&current, &name),
        ) {
            Some(()) => {
                info!(from = %current, to = %name, "section renamed");
                draft.old_body = name.clone();
                draft.body_title = name.clone();
                if !selects_body {
                    draft.descriptor.set_selector(BODY_ELEMENT, &name);
                    draft.body = name;
                }
            }
            None => {
                draft.body_title = session.old_body_title.clone().unwrap_or_default();
            }
        }

        if draft.body_title == SCRIPT_SECTION {
            session.page_editor = Some(draft.editor);
            draft.editor = EditorMode::Text;
        }
    }

    fn select_section(&mut self, session: &mut SessionState, draft: &mut Draft, body: &str) {
        draft.body = body.to_string();
        draft.descriptor.set_selector(BODY_ELEMENT, body);
        draft.body_title = section_title(body);

        if body == SCRIPT_SECTION {
            session.page_editor = Some(draft.editor);
            draft.editor = EditorMode::Text;
        } else if draft.old_body == SCRIPT_SECTION {
            draft.editor = self.restored_editor(session);
        }
    }

    fn new_section(&mut self, session: &mut SessionState, draft: &mut Draft) {
        let leaving_script = draft.body == SCRIPT_SECTION;
        let name = draft.body_doc.create_section(NEW_SECTION_PREFIX);
        info!(page = %draft.page, section = %name, "section created");

        draft.descriptor.set_selector(BODY_ELEMENT, &name);
        draft.descriptor.set_template(BODY_ELEMENT, &draft.temp_body);
        draft.body_title = name.clone();
        draft.body = name;
        if leaving_script {
            draft.editor = self.restored_editor(session);
        }
    }

    /// Store the submitted content and persist both temporary documents.
    fn store_content(
        &mut self,
        ctx: &mut RequestContext,
        session: &SessionState,
        draft: &mut Draft,
        request: &EditRequest,
    ) -> Result<()> {
        let submitted = decode_content(request.content.as_deref().unwrap_or_default())?;
        if !request.exit_requested() || request.save_requested() {
            let shown_as = session.old_editor.unwrap_or(draft.editor);
            let content = self.presenter.edited_content(&submitted, shown_as)?;
            draft.body_doc.set_section_content(&draft.old_body, &content);
        }

        let scratch = ctx.switch_to(self.config.scratch_project);
        draft
            .body_doc
            .write(&mut *self.store, &scratch, &draft.temp_body)?;
        draft
            .descriptor
            .write(&mut *self.store, &scratch, &draft.temp_page)?;
        debug!(temp = %draft.temp_page, section = %draft.old_body, "draft stored");
        Ok(())
    }

    fn save(&mut self, ctx: &mut RequestContext, draft: &mut Draft) -> Result<()> {
        let plan = CommitPlan {
            page: &draft.page,
            body: &draft.body_file,
            temp_page: &draft.temp_page,
            temp_body: &draft.temp_body,
            layout: draft.descriptor.master_template(),
        };
        let committed = commit(&mut *self.store, ctx, self.config.scratch_project, &plan)?;
        if let Some(title) = committed {
            draft.title = title;
        }
        Ok(())
    }

    fn exit(
        &mut self,
        ctx: &mut RequestContext,
        session: &mut SessionState,
        draft: Draft,
    ) -> Result<Outcome> {
        {
            let scratch = ctx.switch_to(self.config.scratch_project);
            // The store removes the temporary body along with the page.
            self.store.delete_file(&scratch, &draft.temp_page)?;
        }
        info!(page = %draft.page, temp = %draft.temp_page, "editing episode closed");
        drop(draft);
        session.clear();

        let config = self.config;
        self.redirect(&config.landing_path)
    }

    fn continuation(&self, session: &mut SessionState, mut draft: Draft) -> Result<Outcome> {
        if draft.body == SCRIPT_SECTION {
            draft.editor = EditorMode::Text;
        }
        draft
            .body_doc
            .set_body_tag(draft.layout_doc.body_tag.clone());
        let content = self.presenter.editable_content(
            &draft.body_doc,
            &draft.body,
            draft.editor,
            &draft.stylesheet,
        )?;

        session.old_editor = Some(draft.editor);
        session.old_body = Some(draft.body.clone());
        session.old_body_title = Some(draft.body_title.clone());
        session.old_layout = Some(draft.layout.clone());
        session.old_title = Some(draft.title.clone());
        session.template_class = Some(draft.template_class);
        session.stylesheet = Some(draft.stylesheet);

        let params = EditRequest {
            file: draft.page,
            content: Some(encode_content(&content)),
            body: Some(draft.body),
            editor: Some(draft.editor),
            title: Some(draft.title),
            body_title: Some(draft.body_title),
            template: Some(draft.layout),
            body_class: Some(draft.body_class),
            body_file: Some(draft.body_file),
            action: None,
        };
        Ok(Outcome::Render { content, params })
    }

    fn redirect(&mut self, target: &str) -> Result<Outcome> {
        self.redirector
            .send_redirect(target)
            .map_err(|source| EditError::Transport {
                target: target.to_string(),
                source,
            })?;
        debug!(to = target, "redirect sent");
        Ok(Outcome::Redirect {
            target: target.to_string(),
        })
    }

    fn resolve_stylesheet(&self, layout: &LayoutDocument) -> String {
        absorb("stylesheet lookup", self.presenter.stylesheet(layout))
            .map(|path| {
                if path.is_empty() || self.client.host.is_empty() {
                    path
                } else {
                    format!("{}{}", self.client.host, path)
                }
            })
            .unwrap_or_default()
    }

    fn restored_editor(&self, session: &SessionState) -> EditorMode {
        session
            .page_editor
            .unwrap_or_else(|| self.config.default_editor_for(self.client))
    }
}

/// The default section shows no title.
fn section_title(section: &str) -> String {
    if section == DEFAULT_SECTION {
        String::new()
    } else {
        section.to_string()
    }
}

/// Log a failed best-effort drafting step and carry on without its value.
fn absorb<T>(what: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(kind = ?e.kind(), error = %e, "{} failed, continuing", what);
            None
        }
    }
}
