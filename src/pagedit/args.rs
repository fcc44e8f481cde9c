use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Version string with git hash and commit date for non-release builds.
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "pagedit", version = get_version())]
#[command(about = "Edit template pages through scratch copies", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Store directory (defaults to $PAGEDIT_HOME, then the user data dir)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Acting user
    #[arg(short, long, global = true, default_value = "admin")]
    pub user: String,

    /// Working project (defaults to the configured one)
    #[arg(short, long, global = true)]
    pub project: Option<u32>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the store and write the default configuration
    Init,

    /// Publish a master layout
    Layout {
        /// Path of the layout, e.g. /system/layouts/main.html
        path: String,

        /// Stylesheet path used by bodies rendered in this layout
        #[arg(long)]
        stylesheet: Option<String>,

        /// Attributes of the shared body tag
        #[arg(long)]
        body_tag: Option<String>,
    },

    /// List the master layouts pages can switch to
    Layouts,

    /// Publish a page and its body
    Page {
        /// Path of the page, e.g. /a/page.html
        path: String,

        /// Master layout path
        #[arg(short, long)]
        layout: String,

        /// Document title
        #[arg(short, long, default_value = "")]
        title: String,

        /// Body section as NAME=CONTENT (repeatable)
        #[arg(short, long = "section", value_name = "NAME=CONTENT")]
        sections: Vec<String>,
    },

    /// Print a resource
    Show {
        path: String,
    },

    /// List every stored path
    #[command(alias = "ls")]
    List,

    /// Start editing a page
    Open {
        /// Page to edit
        file: String,

        /// Pretend the client can host the rich-text editor
        #[arg(long)]
        rich: bool,

        /// Host prefixed to stylesheet paths
        #[arg(long, default_value = "")]
        host: String,
    },

    /// Continue an editing session
    #[command(alias = "e")]
    Edit {
        /// Session id printed by `open`
        session: String,

        /// New section content (raw, encoded for you)
        #[arg(short, long)]
        content: Option<String>,

        /// save, saveexit, exit, newbody or preview
        #[arg(short, long)]
        action: Option<String>,

        #[arg(long)]
        title: Option<String>,

        /// Section to show
        #[arg(long)]
        body: Option<String>,

        /// New name for the current section
        #[arg(long)]
        body_title: Option<String>,

        /// Master layout path
        #[arg(long)]
        template: Option<String>,

        /// html or text
        #[arg(long)]
        editor: Option<String>,
    },

    /// List running editing sessions
    Sessions,
}
