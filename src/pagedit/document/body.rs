use serde::{Deserialize, Serialize};

use crate::error::{EditError, Result};
use crate::model::RequestContext;
use crate::store::DataStore;

/// Section every body starts with. Cannot be renamed.
pub const DEFAULT_SECTION: &str = "(default)";

/// Section holding script code. Always edited in plain-text mode.
pub const SCRIPT_SECTION: &str = "script";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    #[serde(default)]
    pub content: String,
}

/// A body template file: an ordered list of uniquely named sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyDocument {
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Body tag attributes inherited from the layout, for rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_tag: Option<String>,
}

impl BodyDocument {
    /// A body with one empty default section.
    pub fn with_default_section(content: &str) -> Self {
        Self {
            sections: vec![Section {
                name: DEFAULT_SECTION.to_string(),
                content: content.to_string(),
            }],
            body_tag: None,
        }
    }

    pub fn read<S: DataStore + ?Sized>(store: &S, ctx: &RequestContext, path: &str) -> Result<Self> {
        super::load(store, ctx, path)
    }

    pub fn write<S: DataStore + ?Sized>(
        &self,
        store: &mut S,
        ctx: &RequestContext,
        path: &str,
    ) -> Result<()> {
        super::save(self, store, ctx, path)
    }

    pub fn section_names(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn first_section(&self) -> Option<&str> {
        self.sections.first().map(|s| s.name.as_str())
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    pub fn rename_section(&mut self, old: &str, new: &str) -> Result<()> {
        if old == new {
            return Ok(());
        }
        if new.trim().is_empty() {
            return Err(EditError::InvalidParameter {
                name: "bodytitle",
                value: new.to_string(),
            });
        }
        if self.has_section(new) {
            return Err(EditError::SectionExists(new.to_string()));
        }
        let section = self
            .sections
            .iter_mut()
            .find(|s| s.name == old)
            .ok_or_else(|| EditError::SectionNotFound(old.to_string()))?;
        section.name = new.to_string();
        Ok(())
    }

    /// Append an empty section named `<prefix>_<n>` with the smallest free
    /// `n >= 1`, returning its name.
    pub fn create_section(&mut self, prefix: &str) -> String {
        let name = (1..)
            .map(|n| format!("{}_{}", prefix, n))
            .find(|candidate| !self.has_section(candidate))
            .unwrap_or_else(|| format!("{}_{}", prefix, self.sections.len() + 1));
        self.sections.push(Section {
            name: name.clone(),
            content: String::new(),
        });
        name
    }

    /// Replace a section's content, appending the section if it is missing.
    pub fn set_section_content(&mut self, name: &str, content: &str) {
        match self.sections.iter_mut().find(|s| s.name == name) {
            Some(section) => section.content = content.to_string(),
            None => self.sections.push(Section {
                name: name.to_string(),
                content: content.to_string(),
            }),
        }
    }

    pub fn set_body_tag(&mut self, body_tag: Option<String>) {
        self.body_tag = body_tag;
    }
}
