use crate::error::{EditError, Result};
use crate::model::{AccessMode, ClientInfo, EditorMode, ProjectId};
use crate::store::DEFAULT_BODY_ROOT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILENAME: &str = "config.json";
const DEFAULT_TEMP_PREFIX: &str = "TMP_";
const DEFAULT_LAYOUT_ROOT: &str = "/system/layouts";
const DEFAULT_LANDING_PATH: &str = "/system/workplace/action/index.html";

/// Editor configuration, stored in `<root>/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EditorConfig {
    /// Project holding in-progress edits.
    #[serde(default = "default_scratch_project")]
    pub scratch_project: ProjectId,

    /// Project users work in when none is given.
    #[serde(default = "default_project")]
    pub default_project: ProjectId,

    /// Marker prefixed to the file name of a temporary copy.
    #[serde(default = "default_temp_prefix")]
    pub temp_prefix: String,

    /// Names tried before the allocator gives up.
    #[serde(default = "default_max_temp_attempts")]
    pub max_temp_attempts: u32,

    /// Folder mirroring the page tree with body files.
    #[serde(default = "default_body_root")]
    pub body_root: String,

    /// Folder holding the master layouts pages can switch to.
    #[serde(default = "default_layout_root")]
    pub layout_root: String,

    /// Where the client is sent after leaving the editor.
    #[serde(default = "default_landing_path")]
    pub landing_path: String,

    /// Access flags stamped on temporary copies.
    #[serde(default = "default_temp_mode")]
    pub temp_mode: AccessMode,

    #[serde(default = "default_editor_rich")]
    pub default_editor_rich: EditorMode,

    #[serde(default = "default_editor_plain")]
    pub default_editor_plain: EditorMode,
}

fn default_scratch_project() -> ProjectId {
    ProjectId(2)
}

fn default_project() -> ProjectId {
    ProjectId(1)
}

fn default_temp_prefix() -> String {
    DEFAULT_TEMP_PREFIX.to_string()
}

fn default_max_temp_attempts() -> u32 {
    100
}

fn default_body_root() -> String {
    DEFAULT_BODY_ROOT.to_string()
}

fn default_layout_root() -> String {
    DEFAULT_LAYOUT_ROOT.to_string()
}

fn default_landing_path() -> String {
    DEFAULT_LANDING_PATH.to_string()
}

fn default_temp_mode() -> AccessMode {
    AccessMode(91)
}

fn default_editor_rich() -> EditorMode {
    EditorMode::Html
}

fn default_editor_plain() -> EditorMode {
    EditorMode::Text
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            scratch_project: default_scratch_project(),
            default_project: default_project(),
            temp_prefix: default_temp_prefix(),
            max_temp_attempts: default_max_temp_attempts(),
            body_root: default_body_root(),
            layout_root: default_layout_root(),
            landing_path: default_landing_path(),
            temp_mode: default_temp_mode(),
            default_editor_rich: default_editor_rich(),
            default_editor_plain: default_editor_plain(),
        }
    }
}

impl EditorConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(EditError::Io)?;
        let config: EditorConfig =
            serde_json::from_str(&content).map_err(EditError::Serialization)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).map_err(EditError::Io)?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(self).map_err(EditError::Serialization)?;
        fs::write(config_path, content).map_err(EditError::Io)?;
        Ok(())
    }

    /// Editor mode picked at bootstrap when the request names none.
    pub fn default_editor_for(&self, client: &ClientInfo) -> EditorMode {
        if client.rich_text {
            self.default_editor_rich
        } else {
            self.default_editor_plain
        }
    }
}
