//! Full editing episodes against the filesystem store.

use pagedit::api::{EditorApi, SessionState};
use pagedit::config::EditorConfig;
use pagedit::document::LayoutDocument;
use pagedit::error::EditError;
use pagedit::model::{ClientInfo, EditorMode};
use pagedit::session::{Action, EditRequest, Outcome, RecordingRedirector};
use pagedit::store::fs::FileStore;
use pagedit::store::DataStore;
use tempfile::TempDir;

const LAYOUT: &str = "/system/layouts/main.html";
const PAGE: &str = "/a/page.html";
const BODY: &str = "/content/bodys/a/page.html";
const TEMP_PAGE: &str = "/a/TMP_page.html";
const TEMP_BODY: &str = "/content/bodys/a/TMP_page.html";

fn api(dir: &TempDir) -> EditorApi<FileStore> {
    let config = EditorConfig::default();
    let store = FileStore::new(dir.path().to_path_buf()).with_body_root(&config.body_root);
    EditorApi::new(store, config)
}

fn seeded(dir: &TempDir) -> EditorApi<FileStore> {
    let mut api = api(dir);
    api.create_layout(
        LAYOUT,
        &LayoutDocument {
            body_tag: None,
            stylesheet: Some("/css/main.css".into()),
        },
    )
    .unwrap();
    api.create_page(
        PAGE,
        "Home",
        LAYOUT,
        &[("(default)".to_string(), "hello".to_string())],
    )
    .unwrap();
    api
}

fn rendered(outcome: Outcome) -> (String, EditRequest) {
    match outcome {
        Outcome::Render { content, params } => (content, params),
        other => panic!("expected a render, got {:?}", other),
    }
}

#[test]
fn episode_edits_scratch_copies_until_saved() {
    let dir = TempDir::new().unwrap();
    let mut api = seeded(&dir);
    let mut ctx = api.context("alice");
    let mut session = SessionState::new();
    let mut redirector = RecordingRedirector::new();
    let client = ClientInfo::default();

    let (content, shown) = rendered(
        api.open(&mut ctx, &mut session, &client, &mut redirector, PAGE)
            .unwrap(),
    );
    assert_eq!(content, "hello");
    assert_eq!(shown.editor, Some(EditorMode::Text));
    assert_eq!(session.temp_files(), Some((TEMP_PAGE, TEMP_BODY)));
    assert!(api.store().exists(TEMP_PAGE).unwrap());
    assert!(api.store().exists(TEMP_BODY).unwrap());

    // A new section, then its content with a save-and-exit.
    let (_, shown) = rendered(
        api.submit(
            &mut ctx,
            &mut session,
            &client,
            &mut redirector,
            shown.with_action(Action::NewBody),
        )
        .unwrap(),
    );
    assert_eq!(shown.body.as_deref(), Some("body_1"));
    let body = api.sections(&ctx, BODY).unwrap();
    assert!(!body.has_section("body_1"));

    let mut request = shown.with_content("second").with_action(Action::SaveExit);
    request.title = Some("Welcome".into());
    let outcome = api
        .submit(&mut ctx, &mut session, &client, &mut redirector, request)
        .unwrap();
    assert_eq!(
        outcome,
        Outcome::Redirect {
            target: api.config().landing_path.clone()
        }
    );

    let body = api.sections(&ctx, BODY).unwrap();
    assert_eq!(body.section_names(), vec!["(default)", "body_1"]);
    assert_eq!(body.section("body_1").unwrap().content, "second");
    let page = api.show(&ctx, PAGE).unwrap();
    assert_eq!(page.header.properties.get("title").unwrap(), "Welcome");
    assert_eq!(page.header.lock.as_deref(), Some("alice"));

    assert!(session.is_closed());
    assert!(!api.store().exists(TEMP_PAGE).unwrap());
    assert!(!api.store().exists(TEMP_BODY).unwrap());
}

#[test]
fn episode_survives_a_store_reopen() {
    let dir = TempDir::new().unwrap();
    let mut ctx;
    let mut session = SessionState::new();
    let client = ClientInfo::default();

    let shown = {
        let mut api = seeded(&dir);
        ctx = api.context("alice");
        let outcome = api
            .open(
                &mut ctx,
                &mut session,
                &client,
                &mut RecordingRedirector::new(),
                PAGE,
            )
            .unwrap();
        rendered(outcome).1
    };

    // Only the session map crosses the process boundary.
    let map = session.to_map().unwrap();
    let mut session = SessionState::from_map(&map).unwrap();

    let mut api = api(&dir);
    let (content, _) = rendered(
        api.submit(
            &mut ctx,
            &mut session,
            &client,
            &mut RecordingRedirector::new(),
            shown.with_content("draft"),
        )
        .unwrap(),
    );
    assert_eq!(content, "draft");

    // Originals stay untouched until a save.
    let body = api.sections(&ctx, BODY).unwrap();
    assert_eq!(body.section("(default)").unwrap().content, "hello");
}

#[test]
fn page_locked_by_someone_else_cannot_be_opened() {
    let dir = TempDir::new().unwrap();
    let mut api = seeded(&dir);
    let client = ClientInfo::default();

    let mut alice = api.context("alice");
    api.open(
        &mut alice,
        &mut SessionState::new(),
        &client,
        &mut RecordingRedirector::new(),
        PAGE,
    )
    .unwrap();

    let mut bob = api.context("bob");
    let mut session = SessionState::new();
    let result = api.open(
        &mut bob,
        &mut session,
        &client,
        &mut RecordingRedirector::new(),
        PAGE,
    );
    assert!(matches!(result, Err(EditError::AccessDenied(_))));
    assert!(session.is_closed());
    assert!(!api.store().exists("/a/TMP_page.html0").unwrap());
}
