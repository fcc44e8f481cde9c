use clap::Parser;
use colored::*;
use directories::ProjectDirs;
use pagedit::api::EditorApi;
use pagedit::config::EditorConfig;
use pagedit::document::LayoutDocument;
use pagedit::error::{EditError, Result};
use pagedit::model::{ClientInfo, EditorMode, ProjectId, RequestContext, Resource};
use pagedit::session::{Action, EditRequest, Outcome, Redirector, SessionState};
use pagedit::store::fs::FileStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod args;
use args::{Cli, Commands};

const SESSIONS_DIR: &str = "sessions";

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Log to stderr so stdout stays the command output.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("PAGEDIT_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct AppContext {
    api: EditorApi<FileStore>,
    root: PathBuf,
    ctx: RequestContext,
}

/// What the CLI remembers between `open` and the following `edit`s.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    user: String,
    project: ProjectId,
    rich_text: bool,
    host: String,
    state: SessionState,
    /// Parameters of the last response; the next request starts from them.
    params: HashMap<String, String>,
}

impl StoredSession {
    fn client(&self) -> ClientInfo {
        ClientInfo {
            rich_text: self.rich_text,
            host: self.host.clone(),
        }
    }
}

/// Prints redirects instead of sending them.
struct StdoutRedirector;

impl Redirector for StdoutRedirector {
    fn send_redirect(&mut self, target: &str) -> io::Result<()> {
        writeln!(io::stdout().lock(), "{} {}", "redirect".cyan(), target)
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut app = init_context(&cli)?;

    match cli.command {
        Commands::Init => handle_init(&app),
        Commands::Layout {
            path,
            stylesheet,
            body_tag,
        } => handle_layout(&mut app, &path, stylesheet, body_tag),
        Commands::Layouts => handle_layouts(&app),
        Commands::Page {
            path,
            layout,
            title,
            sections,
        } => handle_page(&mut app, &path, &layout, &title, &sections),
        Commands::Show { path } => handle_show(&app, &path),
        Commands::List => handle_list(&app),
        Commands::Open { file, rich, host } => handle_open(&mut app, &file, rich, host),
        Commands::Edit {
            session,
            content,
            action,
            title,
            body,
            body_title,
            template,
            editor,
        } => {
            let overrides = Overrides {
                content,
                action,
                title,
                body,
                body_title,
                template,
                editor,
            };
            handle_edit(&mut app, &session, overrides)
        }
        Commands::Sessions => handle_sessions(&app),
    }
}

fn store_root(cli: &Cli) -> Result<PathBuf> {
    if let Some(root) = &cli.root {
        return Ok(root.clone());
    }
    if let Ok(home) = std::env::var("PAGEDIT_HOME") {
        return Ok(PathBuf::from(home));
    }
    ProjectDirs::from("org", "pagedit", "pagedit")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| EditError::Store("could not determine a data directory".into()))
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let root = store_root(cli)?;
    let config = EditorConfig::load(&root)?;
    let project = cli.project.map(ProjectId).unwrap_or(config.default_project);
    let ctx = RequestContext::new(cli.user.clone(), project);

    let store = FileStore::new(root.clone()).with_body_root(&config.body_root);
    Ok(AppContext {
        api: EditorApi::new(store, config),
        root,
        ctx,
    })
}

fn handle_init(app: &AppContext) -> Result<()> {
    fs::create_dir_all(app.root.join(SESSIONS_DIR))?;
    app.api.config().save(&app.root)?;
    success(&format!("Initialized store at {}", app.root.display()));
    Ok(())
}

fn handle_layout(
    app: &mut AppContext,
    path: &str,
    stylesheet: Option<String>,
    body_tag: Option<String>,
) -> Result<()> {
    let layout = LayoutDocument {
        body_tag,
        stylesheet,
    };
    app.api.create_layout(path, &layout)?;
    success(&format!("Created layout {}", path));
    Ok(())
}

fn handle_layouts(app: &AppContext) -> Result<()> {
    let layouts = app.api.available_layouts(&app.ctx)?;
    if layouts.is_empty() {
        println!("{}", "No layouts.".dimmed());
    }
    for (path, layout) in layouts {
        println!(
            "{}  {}",
            path,
            layout.stylesheet.as_deref().unwrap_or("-").dimmed()
        );
    }
    Ok(())
}

fn handle_page(
    app: &mut AppContext,
    path: &str,
    layout: &str,
    title: &str,
    sections: &[String],
) -> Result<()> {
    let sections = sections
        .iter()
        .map(|raw| {
            raw.split_once('=')
                .map(|(name, content)| (name.to_string(), content.to_string()))
                .ok_or_else(|| EditError::InvalidParameter {
                    name: "section",
                    value: raw.clone(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let body = app.api.create_page(path, title, layout, &sections)?;
    success(&format!("Created page {} with body {}", path, body));
    Ok(())
}

fn handle_show(app: &AppContext, path: &str) -> Result<()> {
    let resource = app.api.show(&app.ctx, path)?;
    print_resource(&resource);
    Ok(())
}

fn handle_list(app: &AppContext) -> Result<()> {
    let paths = app.api.list_paths()?;
    if paths.is_empty() {
        println!("{}", "Store is empty.".dimmed());
    }
    for path in paths {
        println!("{}", path);
    }
    Ok(())
}

fn handle_open(app: &mut AppContext, file: &str, rich: bool, host: String) -> Result<()> {
    let client = ClientInfo {
        rich_text: rich,
        host,
    };
    let mut session = SessionState::new();
    let mut ctx = app.ctx.clone();
    let outcome = app
        .api
        .open(&mut ctx, &mut session, &client, &mut StdoutRedirector, file)?;

    let id = Uuid::new_v4().to_string();
    let mut stored = StoredSession {
        user: ctx.user().to_string(),
        project: ctx.project(),
        rich_text: client.rich_text,
        host: client.host,
        state: session,
        params: HashMap::new(),
    };
    finish(app, &id, &mut stored, EditRequest::open(file), outcome)
}

struct Overrides {
    content: Option<String>,
    action: Option<String>,
    title: Option<String>,
    body: Option<String>,
    body_title: Option<String>,
    template: Option<String>,
    editor: Option<String>,
}

fn handle_edit(app: &mut AppContext, id: &str, overrides: Overrides) -> Result<()> {
    let mut stored = load_session(&app.root, id)?;
    let mut request = EditRequest::from_params(&stored.params)?;

    if let Some(raw) = overrides.content.as_deref() {
        request = request.with_content(raw);
    }
    request.action = overrides
        .action
        .as_deref()
        .map(str::parse::<Action>)
        .transpose()?;
    if let Some(editor) = overrides.editor.as_deref() {
        request.editor = Some(editor.parse::<EditorMode>()?);
    }
    let replace = [
        (&mut request.title, overrides.title),
        (&mut request.body, overrides.body),
        (&mut request.body_title, overrides.body_title),
        (&mut request.template, overrides.template),
    ];
    for (field, value) in replace {
        if value.is_some() {
            *field = value;
        }
    }

    let mut ctx = RequestContext::new(stored.user.clone(), stored.project);
    let client = stored.client();
    let outcome = app.api.submit(
        &mut ctx,
        &mut stored.state,
        &client,
        &mut StdoutRedirector,
        request.clone(),
    );
    match outcome {
        Ok(outcome) => finish(app, id, &mut stored, request, outcome),
        Err(e) => {
            // An exit whose redirect failed has already removed the temp files.
            forget_if_closed(&app.root, id, &stored)?;
            Err(e)
        }
    }
}

/// Remove the session file once its episode is over.
fn forget_if_closed(root: &Path, id: &str, stored: &StoredSession) -> Result<bool> {
    let path = session_path(root, id);
    if !stored.state.is_closed() || !path.exists() {
        return Ok(false);
    }
    fs::remove_file(&path)?;
    Ok(true)
}

/// Persist or drop the session after a round trip and print the result.
fn finish(
    app: &AppContext,
    id: &str,
    stored: &mut StoredSession,
    mut request: EditRequest,
    outcome: Outcome,
) -> Result<()> {
    let path = session_path(&app.root, id);
    if stored.state.is_closed() {
        forget_if_closed(&app.root, id, stored)?;
        info("Session closed.");
        return Ok(());
    }

    match outcome {
        Outcome::Render { content, params } => {
            stored.params = params.to_params();
            save_session(&path, stored)?;
            let section = params.body.as_deref().unwrap_or_default();
            let modes = app
                .api
                .editor_modes(&stored.client(), section)
                .into_iter()
                .map(EditorMode::as_str)
                .collect::<Vec<_>>()
                .join(",");
            println!(
                "{} {}  {} {}  {} {}  {} {}",
                "session".dimmed(),
                id.yellow(),
                "section".dimmed(),
                section.bold(),
                "editor".dimmed(),
                params.editor.map(EditorMode::as_str).unwrap_or_default(),
                "modes".dimmed(),
                modes,
            );
            println!("{}", content);
        }
        Outcome::Redirect { .. } => {
            // A preview: the draft is stored, resend the same parameters next time.
            request.action = None;
            stored.params = request.to_params();
            save_session(&path, stored)?;
        }
    }
    Ok(())
}

fn handle_sessions(app: &AppContext) -> Result<()> {
    let dir = app.root.join(SESSIONS_DIR);
    if !dir.exists() {
        println!("{}", "No sessions.".dimmed());
        return Ok(());
    }

    let mut entries: Vec<_> = fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    entries.sort();
    if entries.is_empty() {
        println!("{}", "No sessions.".dimmed());
    }

    for path in entries {
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stored = read_session(&path)?;
        let started = stored
            .state
            .started_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{}  {}  {}  {}",
            id.yellow(),
            stored.params.get("file").map(String::as_str).unwrap_or("?"),
            stored.user,
            started.dimmed()
        );
    }
    Ok(())
}

fn print_resource(resource: &Resource) {
    let header = &resource.header;
    println!("{}", header.path.bold());
    let owner = match header.project {
        Some(project) => project.to_string(),
        None => "published".to_string(),
    };
    println!("{} {}", "project".dimmed(), owner);
    if let Some(lock) = &header.lock {
        println!("{} {}", "locked by".dimmed(), lock.yellow());
    }
    println!("{} {}", "mode".dimmed(), header.mode.0);
    for (key, value) in &header.properties {
        println!("{} {} = {}", "property".dimmed(), key, value);
    }
    println!("--------------------------------");
    println!("{}", String::from_utf8_lossy(&resource.content));
}

fn session_path(root: &Path, id: &str) -> PathBuf {
    root.join(SESSIONS_DIR).join(format!("{}.json", id))
}

fn load_session(root: &Path, id: &str) -> Result<StoredSession> {
    let path = session_path(root, id);
    if !path.exists() {
        return Err(EditError::NotFound(format!("session {}", id)));
    }
    read_session(&path)
}

fn read_session(path: &Path) -> Result<StoredSession> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn save_session(path: &Path, stored: &StoredSession) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, serde_json::to_string_pretty(stored)?)?;
    Ok(())
}

fn success(message: &str) {
    println!("{}", message.green());
}

fn info(message: &str) {
    println!("{}", message.dimmed());
}
