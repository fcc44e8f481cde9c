//! Copying a finished draft onto the original resources.
//!
//! The store has no transactions, so the commit is a fixed sequence of
//! independent writes:
//!
//! 1. [`CommitStep::BodyContent`]: temp body bytes onto the original body.
//! 2. [`CommitStep::BodyProperties`]: every temp body property, key by key.
//! 3. [`CommitStep::PageTitle`]: the temp page title, when non-empty.
//! 4. [`CommitStep::Layout`]: the temp master layout into the original
//!    descriptor.
//!
//! A failing step stops the sequence. Earlier steps stay committed; the
//! returned [`EditError::Commit`] lists them so the caller can tell the user
//! exactly what landed.

use std::fmt;
use tracing::{debug, error, info};

use crate::document::ControlDescriptor;
use crate::error::{EditError, Result};
use crate::model::{ProjectId, RequestContext};
use crate::store::DataStore;

pub const TITLE_PROPERTY: &str = "title";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStep {
    BodyContent,
    BodyProperties,
    PageTitle,
    Layout,
}

impl CommitStep {
    pub const ORDER: [CommitStep; 4] = [
        CommitStep::BodyContent,
        CommitStep::BodyProperties,
        CommitStep::PageTitle,
        CommitStep::Layout,
    ];
}

impl fmt::Display for CommitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommitStep::BodyContent => "body content",
            CommitStep::BodyProperties => "body properties",
            CommitStep::PageTitle => "page title",
            CommitStep::Layout => "layout",
        };
        f.write_str(name)
    }
}

/// Originals and their temporary counterparts.
#[derive(Debug, Clone)]
pub struct CommitPlan<'a> {
    pub page: &'a str,
    pub body: &'a str,
    pub temp_page: &'a str,
    pub temp_body: &'a str,
    pub layout: &'a str,
}

/// Run every step in [`CommitStep::ORDER`]. Returns the committed title.
pub fn commit<S: DataStore + ?Sized>(
    store: &mut S,
    ctx: &mut RequestContext,
    scratch: ProjectId,
    plan: &CommitPlan<'_>,
) -> Result<Option<String>> {
    let mut completed = Vec::new();
    let mut title = None;

    for step in CommitStep::ORDER {
        let outcome = match step {
            CommitStep::BodyContent => commit_body_content(store, ctx, scratch, plan),
            CommitStep::BodyProperties => commit_body_properties(store, ctx, scratch, plan),
            CommitStep::PageTitle => commit_title(store, ctx, scratch, plan).map(|t| {
                title = t;
            }),
            CommitStep::Layout => commit_layout(store, ctx, plan),
        };
        if let Err(source) = outcome {
            error!(page = plan.page, %step, ?completed, error = %source, "commit interrupted");
            return Err(EditError::Commit {
                step,
                completed,
                source: Box::new(source),
            });
        }
        debug!(page = plan.page, %step, "committed");
        completed.push(step);
    }

    info!(page = plan.page, body = plan.body, "draft committed");
    Ok(title)
}

fn commit_body_content<S: DataStore + ?Sized>(
    store: &mut S,
    ctx: &mut RequestContext,
    scratch: ProjectId,
    plan: &CommitPlan<'_>,
) -> Result<()> {
    let draft = {
        let scratch = ctx.switch_to(scratch);
        store.read_file(&scratch, plan.temp_body)?
    };
    store.write_file(ctx, plan.body, &draft.content)
}

fn commit_body_properties<S: DataStore + ?Sized>(
    store: &mut S,
    ctx: &mut RequestContext,
    scratch: ProjectId,
    plan: &CommitPlan<'_>,
) -> Result<()> {
    let properties = {
        let scratch = ctx.switch_to(scratch);
        store.read_all_properties(&scratch, plan.temp_body)?
    };
    for (key, value) in &properties {
        store.write_property(ctx, plan.body, key, value)?;
    }
    Ok(())
}

fn commit_title<S: DataStore + ?Sized>(
    store: &mut S,
    ctx: &mut RequestContext,
    scratch: ProjectId,
    plan: &CommitPlan<'_>,
) -> Result<Option<String>> {
    let title = {
        let scratch = ctx.switch_to(scratch);
        store.read_property(&scratch, plan.temp_page, TITLE_PROPERTY)?
    };
    match title {
        Some(title) if !title.is_empty() => {
            store.write_property(ctx, plan.page, TITLE_PROPERTY, &title)?;
            Ok(Some(title))
        }
        other => Ok(other),
    }
}

fn commit_layout<S: DataStore + ?Sized>(
    store: &mut S,
    ctx: &RequestContext,
    plan: &CommitPlan<'_>,
) -> Result<()> {
    let mut original = ControlDescriptor::read(&*store, ctx, plan.page)?;
    original.set_master_template(plan.layout);
    original.write(store, ctx, plan.page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BodyDocument, LayoutDocument};
    use crate::store::memory::fixtures::{StoreFixture, ALT_LAYOUT, LAYOUT};
    use crate::store::memory::InMemoryStore;

    const PAGE: &str = "/a/page.html";
    const BODY: &str = "/content/bodys/a/page.html";
    const TEMP_PAGE: &str = "/a/TMP_page.html";
    const TEMP_BODY: &str = "/content/bodys/a/TMP_page.html";
    const SCRATCH: ProjectId = ProjectId(2);

    fn plan(layout: &str) -> CommitPlan<'_> {
        CommitPlan {
            page: PAGE,
            body: BODY,
            temp_page: TEMP_PAGE,
            temp_body: TEMP_BODY,
            layout,
        }
    }

    /// Locked originals plus a drafted temp page and body.
    fn drafted(title: &str) -> (InMemoryStore, RequestContext) {
        let mut store = StoreFixture::new()
            .with_page(PAGE, "Home", &[("(default)", "old")])
            .store;
        let mut ctx = RequestContext::new("alice", ProjectId(1));
        store.lock(&ctx, PAGE).unwrap();
        store.lock(&ctx, BODY).unwrap();

        let scratch = ctx.switch_to(SCRATCH);
        store.copy_file(&scratch, PAGE, TEMP_PAGE).unwrap();
        BodyDocument::with_default_section("new")
            .write(&mut store, &scratch, TEMP_BODY)
            .unwrap();
        store
            .write_property(&scratch, TEMP_BODY, "keywords", "edited")
            .unwrap();
        store
            .write_property(&scratch, TEMP_PAGE, TITLE_PROPERTY, title)
            .unwrap();
        drop(scratch);
        (store, ctx)
    }

    #[test]
    fn every_step_lands_on_the_originals() {
        let (mut store, mut ctx) = drafted("Welcome");

        let title = commit(&mut store, &mut ctx, SCRATCH, &plan(ALT_LAYOUT)).unwrap();
        assert_eq!(title.as_deref(), Some("Welcome"));
        assert_eq!(ctx.project(), ProjectId(1));

        let body = BodyDocument::read(&store, &ctx, BODY).unwrap();
        assert_eq!(body.section("(default)").unwrap().content, "new");
        assert_eq!(
            store.read_property(&ctx, BODY, "keywords").unwrap().as_deref(),
            Some("edited")
        );
        assert_eq!(
            store.read_property(&ctx, PAGE, TITLE_PROPERTY).unwrap().as_deref(),
            Some("Welcome")
        );
        let descriptor = ControlDescriptor::read(&store, &ctx, PAGE).unwrap();
        assert_eq!(descriptor.master_template(), ALT_LAYOUT);
        LayoutDocument::read(&store, &ctx, descriptor.master_template()).unwrap();
    }

    #[test]
    fn empty_title_keeps_the_original_one() {
        let (mut store, mut ctx) = drafted("");

        let title = commit(&mut store, &mut ctx, SCRATCH, &plan(LAYOUT)).unwrap();
        assert_eq!(title.as_deref(), Some(""));
        assert_eq!(
            store.read_property(&ctx, PAGE, TITLE_PROPERTY).unwrap().as_deref(),
            Some("Home")
        );
    }

    #[test]
    fn failing_step_reports_what_already_landed() {
        let (mut store, mut ctx) = drafted("Welcome");
        store.backend().fail_writes_to(BODY);

        let err = commit(&mut store, &mut ctx, SCRATCH, &plan(LAYOUT)).unwrap_err();
        match err {
            EditError::Commit {
                step, completed, ..
            } => {
                assert_eq!(step, CommitStep::BodyContent);
                assert!(completed.is_empty());
            }
            other => panic!("expected a commit error, got {:?}", other),
        }
        assert_eq!(ctx.project(), ProjectId(1));
        let body = BodyDocument::read(&store, &ctx, BODY).unwrap();
        assert_eq!(body.section("(default)").unwrap().content, "old");
    }
}
