use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{EditError, Result};
use crate::model::EditorMode;

pub const PARAM_CONTENT: &str = "content";
pub const PARAM_BODY: &str = "body";
pub const PARAM_FILE: &str = "file";
pub const PARAM_EDITOR: &str = "editor";
pub const PARAM_TITLE: &str = "title";
pub const PARAM_BODY_TITLE: &str = "bodytitle";
pub const PARAM_TEMPLATE: &str = "template";
pub const PARAM_BODY_CLASS: &str = "bodyclass";
pub const PARAM_BODY_FILE: &str = "bodyfile";
pub const PARAM_ACTION: &str = "action";

/// Button the user pressed, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Save,
    SaveExit,
    Exit,
    NewBody,
    Preview,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Save => "save",
            Action::SaveExit => "saveexit",
            Action::Exit => "exit",
            Action::NewBody => "newbody",
            Action::Preview => "preview",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "save" => Ok(Action::Save),
            "saveexit" => Ok(Action::SaveExit),
            "exit" => Ok(Action::Exit),
            "newbody" => Ok(Action::NewBody),
            "preview" => Ok(Action::Preview),
            other => Err(EditError::InvalidParameter {
                name: PARAM_ACTION,
                value: other.to_string(),
            }),
        }
    }
}

/// Where a round trip starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No content submitted: a new episode begins.
    Fresh,
    /// The client sends back edited content.
    Editing,
}

impl Phase {
    pub fn of(request: &EditRequest) -> Self {
        if request.content.is_some() {
            Phase::Editing
        } else {
            Phase::Fresh
        }
    }
}

/// One round trip's parameters, validated at the boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditRequest {
    /// Page being edited. Always present.
    pub file: String,
    /// Transport-encoded section content.
    pub content: Option<String>,
    /// Section the client wants shown.
    pub body: Option<String>,
    pub editor: Option<EditorMode>,
    pub title: Option<String>,
    pub body_title: Option<String>,
    /// Master layout path.
    pub template: Option<String>,
    pub body_class: Option<String>,
    pub body_file: Option<String>,
    pub action: Option<Action>,
}

impl EditRequest {
    /// A request opening `file` for editing.
    pub fn open(file: &str) -> Self {
        Self {
            file: file.to_string(),
            ..Self::default()
        }
    }

    pub fn from_params(params: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| params.get(key).cloned();
        let non_empty = |key: &str| params.get(key).filter(|v| !v.is_empty());

        let file = non_empty(PARAM_FILE)
            .cloned()
            .ok_or(EditError::MissingParameter(PARAM_FILE))?;
        let editor = non_empty(PARAM_EDITOR)
            .map(|v| v.parse::<EditorMode>())
            .transpose()?;
        let action = non_empty(PARAM_ACTION)
            .map(|v| v.parse::<Action>())
            .transpose()?;

        Ok(Self {
            file,
            content: get(PARAM_CONTENT),
            body: get(PARAM_BODY),
            editor,
            title: get(PARAM_TITLE),
            body_title: get(PARAM_BODY_TITLE),
            template: get(PARAM_TEMPLATE),
            body_class: get(PARAM_BODY_CLASS),
            body_file: get(PARAM_BODY_FILE),
            action,
        })
    }

    pub fn to_params(&self) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert(PARAM_FILE.to_string(), self.file.clone());
        let optional = [
            (PARAM_CONTENT, self.content.clone()),
            (PARAM_BODY, self.body.clone()),
            (PARAM_EDITOR, self.editor.map(|e| e.as_str().to_string())),
            (PARAM_TITLE, self.title.clone()),
            (PARAM_BODY_TITLE, self.body_title.clone()),
            (PARAM_TEMPLATE, self.template.clone()),
            (PARAM_BODY_CLASS, self.body_class.clone()),
            (PARAM_BODY_FILE, self.body_file.clone()),
            (PARAM_ACTION, self.action.map(|a| a.as_str().to_string())),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                params.insert(key.to_string(), value);
            }
        }
        params
    }

    pub fn phase(&self) -> Phase {
        Phase::of(self)
    }

    pub fn save_requested(&self) -> bool {
        matches!(self.action, Some(Action::Save | Action::SaveExit))
    }

    pub fn exit_requested(&self) -> bool {
        matches!(self.action, Some(Action::Exit | Action::SaveExit))
    }

    pub fn preview_requested(&self) -> bool {
        self.action == Some(Action::Preview)
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Replace the content with `raw`, transport-encoded.
    pub fn with_content(mut self, raw: &str) -> Self {
        self.content = Some(encode_content(raw));
        self
    }
}

/// Encode section content for the client. Blanks become `%20`.
pub fn encode_content(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

pub fn decode_content(encoded: &str) -> Result<String> {
    urlencoding::decode(encoded)
        .map(|s| s.into_owned())
        .map_err(|_| EditError::InvalidParameter {
            name: PARAM_CONTENT,
            value: encoded.chars().take(40).collect(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn file_is_required() {
        assert!(matches!(
            EditRequest::from_params(&params(&[("content", "x")])),
            Err(EditError::MissingParameter("file"))
        ));
        assert!(matches!(
            EditRequest::from_params(&params(&[("file", "")])),
            Err(EditError::MissingParameter("file"))
        ));
    }

    #[test]
    fn empty_content_still_means_editing() {
        let req = EditRequest::from_params(&params(&[("file", "/a"), ("content", "")])).unwrap();
        assert_eq!(req.phase(), Phase::Editing);
        let req = EditRequest::from_params(&params(&[("file", "/a")])).unwrap();
        assert_eq!(req.phase(), Phase::Fresh);
    }

    #[test]
    fn actions_parse_and_combine() {
        let req =
            EditRequest::from_params(&params(&[("file", "/a"), ("action", "saveexit")])).unwrap();
        assert!(req.save_requested());
        assert!(req.exit_requested());

        let req = EditRequest::from_params(&params(&[("file", "/a"), ("action", "")])).unwrap();
        assert_eq!(req.action, None);

        assert!(matches!(
            EditRequest::from_params(&params(&[("file", "/a"), ("action", "publish")])),
            Err(EditError::InvalidParameter { name: "action", .. })
        ));
    }

    #[test]
    fn params_survive_the_trip() {
        let req = EditRequest {
            file: "/a/page.html".into(),
            body: Some("intro".into()),
            editor: Some(EditorMode::Text),
            action: Some(Action::NewBody),
            ..EditRequest::default()
        }
        .with_content("a b&c");
        let back = EditRequest::from_params(&req.to_params()).unwrap();
        assert_eq!(back, req);
        assert_eq!(back.content.as_deref(), Some("a%20b%26c"));
    }

    #[test]
    fn content_decoding() {
        assert_eq!(decode_content("a%20b%26c").unwrap(), "a b&c");
        assert!(decode_content("%FF").is_err());
    }
}
