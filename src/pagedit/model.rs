use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use crate::error::EditError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(pub u32);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project#{}", self.0)
    }
}

/// Who is acting and in which project.
///
/// Every store call receives the context; the store reads the current project
/// from it. The current project is only ever changed through [`switch_to`],
/// which hands back a guard that restores the previous project when dropped.
///
/// [`switch_to`]: RequestContext::switch_to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    user: String,
    current_project: ProjectId,
}

impl RequestContext {
    pub fn new(user: impl Into<String>, current_project: ProjectId) -> Self {
        Self {
            user: user.into(),
            current_project,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn project(&self) -> ProjectId {
        self.current_project
    }

    /// Make `project` current until the returned guard goes out of scope.
    pub fn switch_to(&mut self, project: ProjectId) -> ProjectSwitch<'_> {
        let previous = std::mem::replace(&mut self.current_project, project);
        ProjectSwitch {
            ctx: self,
            previous,
        }
    }
}

/// Scoped project switch. Restores the caller's project on drop.
pub struct ProjectSwitch<'a> {
    ctx: &'a mut RequestContext,
    previous: ProjectId,
}

impl ProjectSwitch<'_> {
    pub fn previous(&self) -> ProjectId {
        self.previous
    }
}

impl Deref for ProjectSwitch<'_> {
    type Target = RequestContext;

    fn deref(&self) -> &RequestContext {
        self.ctx
    }
}

impl DerefMut for ProjectSwitch<'_> {
    fn deref_mut(&mut self) -> &mut RequestContext {
        self.ctx
    }
}

impl Drop for ProjectSwitch<'_> {
    fn drop(&mut self) {
        self.ctx.current_project = self.previous;
    }
}

/// Owner/group/public access flags. Only the write bits are interpreted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessMode(pub u32);

impl AccessMode {
    pub const OWNER_WRITE: u32 = 2;
    pub const GROUP_WRITE: u32 = 16;
    pub const PUBLIC_WRITE: u32 = 128;
    /// Read and visibility for everyone, write for owner and group.
    pub const DEFAULT: u32 = 383;

    pub fn is_writable(self) -> bool {
        self.0 & (Self::OWNER_WRITE | Self::GROUP_WRITE | Self::PUBLIC_WRITE) != 0
    }
}

impl Default for AccessMode {
    fn default() -> Self {
        AccessMode(Self::DEFAULT)
    }
}

/// Everything about a resource except its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHeader {
    pub path: String,
    /// Owning project; `None` once published.
    pub project: Option<ProjectId>,
    pub lock: Option<String>,
    pub mode: AccessMode,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl ResourceHeader {
    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    pub fn is_locked_by(&self, user: &str) -> bool {
        self.lock.as_deref() == Some(user)
    }

    /// Published resources are visible everywhere, owned ones only inside
    /// their project.
    pub fn is_visible_from(&self, project: ProjectId) -> bool {
        match self.project {
            None => true,
            Some(owner) => owner == project,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub header: ResourceHeader,
    pub content: Vec<u8>,
}

impl Resource {
    /// A published, unlocked resource.
    pub fn published(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            header: ResourceHeader {
                path: path.into(),
                project: None,
                lock: None,
                mode: AccessMode::default(),
                properties: BTreeMap::new(),
            },
            content: content.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.header.path
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.header
            .properties
            .insert(key.to_string(), value.to_string());
        self
    }
}

/// How the client edits section content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorMode {
    /// Rich-text editing of the rendered markup.
    Html,
    /// Plain source editing. Forced for the `script` section.
    Text,
}

impl EditorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            EditorMode::Html => "html",
            EditorMode::Text => "text",
        }
    }
}

impl fmt::Display for EditorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditorMode {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "html" => Ok(EditorMode::Html),
            "text" => Ok(EditorMode::Text),
            other => Err(EditError::InvalidParameter {
                name: "editor",
                value: other.to_string(),
            }),
        }
    }
}

/// What the editor knows about the requesting client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    /// Whether the client can host the rich-text editor.
    pub rich_text: bool,
    /// Scheme and host prefixed to stylesheet paths, e.g. `http://cms.local`.
    pub host: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_restores_previous_project() {
        let mut ctx = RequestContext::new("alice", ProjectId(1));
        {
            let scratch = ctx.switch_to(ProjectId(2));
            assert_eq!(scratch.project(), ProjectId(2));
            assert_eq!(scratch.previous(), ProjectId(1));
        }
        assert_eq!(ctx.project(), ProjectId(1));
    }

    #[test]
    fn switch_restores_on_early_return() {
        fn failing(ctx: &mut RequestContext) -> Result<(), EditError> {
            let _scratch = ctx.switch_to(ProjectId(9));
            Err(EditError::Store("boom".into()))
        }

        let mut ctx = RequestContext::new("alice", ProjectId(1));
        assert!(failing(&mut ctx).is_err());
        assert_eq!(ctx.project(), ProjectId(1));
    }

    #[test]
    fn nested_switches_unwind_in_order() {
        let mut ctx = RequestContext::new("alice", ProjectId(1));
        {
            let mut outer = ctx.switch_to(ProjectId(2));
            {
                let inner = outer.switch_to(ProjectId(3));
                assert_eq!(inner.project(), ProjectId(3));
            }
            assert_eq!(outer.project(), ProjectId(2));
        }
        assert_eq!(ctx.project(), ProjectId(1));
    }

    #[test]
    fn visibility_follows_ownership() {
        let mut header = Resource::published("/a", "x").header;
        assert!(header.is_visible_from(ProjectId(7)));
        header.project = Some(ProjectId(2));
        assert!(header.is_visible_from(ProjectId(2)));
        assert!(!header.is_visible_from(ProjectId(1)));
    }

    #[test]
    fn temp_mode_is_writable() {
        assert!(AccessMode(91).is_writable());
        assert!(!AccessMode(1 | 8 | 64).is_writable());
    }

    #[test]
    fn editor_mode_parses() {
        assert_eq!("text".parse::<EditorMode>().unwrap(), EditorMode::Text);
        assert!("wysiwyg".parse::<EditorMode>().is_err());
    }
}
