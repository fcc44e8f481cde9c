use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{EditError, Result};
use crate::model::EditorMode;

/// Per-episode state carried between round trips.
///
/// The caller owns it and hands it to every round trip. The `old_*` fields
/// hold what the client was last shown; the next round trip diffs the
/// incoming parameters against them. Serialized field names are the session
/// keys used by the request layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(rename = "te_oldedit", default, skip_serializing_if = "Option::is_none")]
    pub old_editor: Option<EditorMode>,

    #[serde(rename = "te_oldbody", default, skip_serializing_if = "Option::is_none")]
    pub old_body: Option<String>,

    #[serde(rename = "te_oldbodytitle", default, skip_serializing_if = "Option::is_none")]
    pub old_body_title: Option<String>,

    #[serde(rename = "te_oldlayout", default, skip_serializing_if = "Option::is_none")]
    pub old_layout: Option<String>,

    #[serde(rename = "te_title", default, skip_serializing_if = "Option::is_none")]
    pub old_title: Option<String>,

    /// Class of the master layout.
    #[serde(rename = "te_templateclass", default, skip_serializing_if = "Option::is_none")]
    pub template_class: Option<String>,

    #[serde(rename = "te_temppagefile", default, skip_serializing_if = "Option::is_none")]
    pub temp_page_file: Option<String>,

    #[serde(rename = "te_tempbodyfile", default, skip_serializing_if = "Option::is_none")]
    pub temp_body_file: Option<String>,

    #[serde(rename = "te_stylesheet", default, skip_serializing_if = "Option::is_none")]
    pub stylesheet: Option<String>,

    /// Mode to return to when leaving the script section.
    #[serde(rename = "te_pageeditor", default, skip_serializing_if = "Option::is_none")]
    pub page_editor: Option<EditorMode>,

    /// When the episode began. Kept outside the `te_*` keys the client knows.
    #[serde(rename = "started_at", default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an episode is running, i.e. temp files exist.
    pub fn is_active(&self) -> bool {
        self.temp_page_file.is_some()
    }

    /// No episode running: never started, or exited.
    pub fn is_closed(&self) -> bool {
        !self.is_active()
    }

    /// `(temp page, temp body)` of the running episode.
    pub fn temp_files(&self) -> Option<(&str, &str)> {
        Some((
            self.temp_page_file.as_deref()?,
            self.temp_body_file.as_deref()?,
        ))
    }

    /// Forget everything. Called once the temp files are gone.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Flat string view, keyed by session key.
    pub fn to_map(&self) -> Result<BTreeMap<String, String>> {
        let value = serde_json::to_value(self).map_err(EditError::Serialization)?;
        let mut map = BTreeMap::new();
        if let serde_json::Value::Object(entries) = value {
            for (key, value) in entries {
                let text = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                map.insert(key, text);
            }
        }
        Ok(map)
    }

    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self> {
        let entries = map
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::from_value(serde_json::Value::Object(entries)).map_err(EditError::Serialization)
    }
}
