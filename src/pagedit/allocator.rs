//! # Temporary File Allocator
//!
//! Every editing episode works on a scratch copy of the page. The copy lives
//! next to the original (`/a/page.html` -> `/a/TMP_page.html`) but is owned by
//! the scratch project, so nobody outside that project sees it.
//!
//! Paths are shared by all projects, so a concurrent episode on the same page
//! (or a leftover from an abandoned one) may already hold the candidate name.
//! The allocator then appends an increasing counter (`TMP_page.html0`,
//! `TMP_page.html1`, ...) until a copy succeeds, giving up with
//! [`EditError::TempCapacity`] after `max_temp_attempts` names.

use tracing::{debug, warn};

use crate::config::EditorConfig;
use crate::error::{EditError, Result};
use crate::model::{RequestContext, ResourceHeader};
use crate::store::DataStore;

/// First candidate for the temporary copy of `original`.
pub fn temp_candidate(config: &EditorConfig, original: &str) -> String {
    match original.rfind('/') {
        Some(idx) => format!(
            "{}{}{}",
            &original[..=idx],
            config.temp_prefix,
            &original[idx + 1..]
        ),
        None => format!("{}{}", config.temp_prefix, original),
    }
}

/// Body file belonging to a temporary page.
pub fn body_path_for(config: &EditorConfig, temp_page: &str) -> String {
    format!("{}{}", config.body_root.trim_end_matches('/'), temp_page)
}

/// Copy `original` into the scratch project under a free name and return it.
///
/// The caller's project is restored on every path out of this function.
pub fn allocate<S: DataStore + ?Sized>(
    store: &mut S,
    ctx: &mut RequestContext,
    config: &EditorConfig,
    original: &ResourceHeader,
) -> Result<String> {
    let base = temp_candidate(config, &original.path);
    let scratch = ctx.switch_to(config.scratch_project);

    let mut candidate = base.clone();
    for attempt in 0..config.max_temp_attempts {
        match try_copy(store, &scratch, config, &original.path, &candidate) {
            Ok(()) => {
                debug!(original = %original.path, temp = %candidate, attempt, "allocated temporary file");
                return Ok(candidate);
            }
            Err(e) if e.kind().is_retryable_collision() => {
                debug!(temp = %candidate, error = %e, "temporary name taken, retrying");
                candidate = format!("{}{}", base, attempt);
            }
            Err(e) => return Err(e),
        }
    }

    warn!(original = %original.path, attempts = config.max_temp_attempts, "no free temporary name");
    Err(EditError::TempCapacity {
        path: original.path.clone(),
        attempts: config.max_temp_attempts,
    })
}

fn try_copy<S: DataStore + ?Sized>(
    store: &mut S,
    scratch: &RequestContext,
    config: &EditorConfig,
    original: &str,
    candidate: &str,
) -> Result<()> {
    store.copy_file(scratch, original, candidate)?;
    if let Err(e) = store.chmod(scratch, candidate, config.temp_mode) {
        // The copy is ours, so it goes before the error surfaces.
        if let Err(cleanup) = store.delete_file(scratch, candidate) {
            warn!(temp = candidate, error = %cleanup, "could not remove half-made temporary file");
        }
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProjectId, Resource};
    use crate::store::memory::InMemoryStore;
    use std::collections::HashSet;

    fn setup() -> (InMemoryStore, RequestContext, EditorConfig, ResourceHeader) {
        let mut store = InMemoryStore::new();
        store
            .import(Resource::published("/a/page.html", "page"))
            .unwrap();
        store
            .import(Resource::published("/content/bodys/a/page.html", "body"))
            .unwrap();
        let ctx = RequestContext::new("alice", ProjectId(1));
        let header = store.read_header(&ctx, "/a/page.html").unwrap();
        (store, ctx, EditorConfig::default(), header)
    }

    #[test]
    fn derives_candidate_in_same_folder() {
        let config = EditorConfig::default();
        assert_eq!(temp_candidate(&config, "/a/page.html"), "/a/TMP_page.html");
        assert_eq!(temp_candidate(&config, "/index.html"), "/TMP_index.html");
        assert_eq!(
            body_path_for(&config, "/a/TMP_page.html"),
            "/content/bodys/a/TMP_page.html"
        );
    }

    #[test]
    fn allocates_in_scratch_project_and_restores_caller() {
        let (mut store, mut ctx, config, header) = setup();
        let temp = allocate(&mut store, &mut ctx, &config, &header).unwrap();

        assert_eq!(temp, "/a/TMP_page.html");
        assert_eq!(ctx.project(), ProjectId(1));
        let copy = store.read_header(&ctx, &temp).unwrap();
        assert_eq!(copy.project, Some(config.scratch_project));
        assert_eq!(copy.mode, config.temp_mode);
    }

    #[test]
    fn skips_every_taken_name() {
        let (mut store, mut ctx, config, header) = setup();
        let mut taken = HashSet::new();
        for _ in 0..5 {
            let temp = allocate(&mut store, &mut ctx, &config, &header).unwrap();
            assert!(taken.insert(temp));
        }
        assert!(taken.contains("/a/TMP_page.html"));
        assert!(taken.contains("/a/TMP_page.html0"));
        assert!(taken.contains("/a/TMP_page.html3"));
    }

    #[test]
    fn retries_storage_conflicts() {
        let (mut store, mut ctx, config, header) = setup();
        store.backend().inject_conflicts(2);
        let temp = allocate(&mut store, &mut ctx, &config, &header).unwrap();
        assert_eq!(temp, "/a/TMP_page.html1");
    }

    #[test]
    fn gives_up_after_the_bound() {
        let (mut store, mut ctx, mut config, header) = setup();
        config.max_temp_attempts = 3;
        for _ in 0..3 {
            allocate(&mut store, &mut ctx, &config, &header).unwrap();
        }
        let err = allocate(&mut store, &mut ctx, &config, &header).unwrap_err();
        assert!(matches!(err, EditError::TempCapacity { attempts: 3, .. }));
        assert_eq!(ctx.project(), ProjectId(1));
    }

    #[test]
    fn other_failures_propagate_with_project_restored() {
        let (mut store, mut ctx, config, header) = setup();
        store.backend().set_simulate_write_error(true);
        let err = allocate(&mut store, &mut ctx, &config, &header).unwrap_err();
        assert!(matches!(err, EditError::Store(_)));
        assert_eq!(ctx.project(), ProjectId(1));
    }

    #[test]
    fn failed_chmod_removes_the_fresh_copy() {
        let (mut store, mut ctx, config, header) = setup();
        store.backend().fail_header_writes_to("/a/TMP_page.html");

        let err = allocate(&mut store, &mut ctx, &config, &header).unwrap_err();
        assert!(matches!(err, EditError::Store(_)));
        assert_eq!(ctx.project(), ProjectId(1));
        assert!(!store.exists("/a/TMP_page.html").unwrap());
        assert!(!store.exists("/content/bodys/a/TMP_page.html").unwrap());
    }
}
