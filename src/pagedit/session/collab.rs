//! Collaborators the engine delegates to: rendering sections for the client
//! and sending redirects.

use std::io;

use crate::document::{BodyDocument, LayoutDocument};
use crate::error::Result;
use crate::model::EditorMode;

/// Turns body sections into something an editor widget can show, and back.
pub trait Presenter {
    /// Content of `section` as the client should see it in `mode`.
    fn editable_content(
        &self,
        body: &BodyDocument,
        section: &str,
        mode: EditorMode,
        stylesheet: &str,
    ) -> Result<String>;

    /// Section content recovered from what a client in `mode` submitted.
    fn edited_content(&self, submitted: &str, mode: EditorMode) -> Result<String>;

    /// Server-relative stylesheet of a layout. Empty when it has none.
    fn stylesheet(&self, layout: &LayoutDocument) -> Result<String>;
}

/// Wraps HTML-mode content in a minimal document carrying the layout's body
/// tag and stylesheet. Text mode passes content through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainPresenter;

impl Presenter for PlainPresenter {
    fn editable_content(
        &self,
        body: &BodyDocument,
        section: &str,
        mode: EditorMode,
        stylesheet: &str,
    ) -> Result<String> {
        let content = body
            .section(section)
            .map(|s| s.content.as_str())
            .unwrap_or_default();

        Ok(match mode {
            EditorMode::Text => content.to_string(),
            EditorMode::Html => {
                let head = if stylesheet.is_empty() {
                    String::new()
                } else {
                    format!("<link rel=\"stylesheet\" href=\"{}\">", stylesheet)
                };
                let body_open = match body.body_tag.as_deref() {
                    Some(attrs) if !attrs.is_empty() => format!("<body {}>", attrs),
                    _ => "<body>".to_string(),
                };
                format!(
                    "<html><head>{}</head>{}{}</body></html>",
                    head, body_open, content
                )
            }
        })
    }

    fn edited_content(&self, submitted: &str, mode: EditorMode) -> Result<String> {
        if mode == EditorMode::Text {
            return Ok(submitted.to_string());
        }
        Ok(inner_body(submitted).unwrap_or(submitted).to_string())
    }

    fn stylesheet(&self, layout: &LayoutDocument) -> Result<String> {
        Ok(layout.stylesheet.clone().unwrap_or_default())
    }
}

/// Text between `<body ...>` and the last `</body>`.
fn inner_body(html: &str) -> Option<&str> {
    let open = html.find("<body")?;
    let start = open + html[open..].find('>')? + 1;
    let end = html.rfind("</body>")?;
    html.get(start..end)
}

/// Sends the client somewhere else.
pub trait Redirector {
    fn send_redirect(&mut self, target: &str) -> io::Result<()>;
}

/// Keeps every redirect target. Can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct RecordingRedirector {
    pub targets: Vec<String>,
    fail: bool,
}

impl RecordingRedirector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A redirector whose every send fails with a broken pipe.
    pub fn failing() -> Self {
        Self {
            targets: Vec::new(),
            fail: true,
        }
    }

    pub fn last(&self) -> Option<&str> {
        self.targets.last().map(String::as_str)
    }
}

impl Redirector for RecordingRedirector {
    fn send_redirect(&mut self, target: &str) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "client went away",
            ));
        }
        self.targets.push(target.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> BodyDocument {
        let mut doc = BodyDocument::with_default_section("<p>hi</p>");
        doc.set_body_tag(Some("class=\"main\"".into()));
        doc
    }

    #[test]
    fn html_mode_wraps_and_unwraps() {
        let presenter = PlainPresenter;
        let shown = presenter
            .editable_content(&body(), "(default)", EditorMode::Html, "http://h/css/main.css")
            .unwrap();
        assert_eq!(
            shown,
            "<html><head><link rel=\"stylesheet\" href=\"http://h/css/main.css\"></head>\
             <body class=\"main\"><p>hi</p></body></html>"
        );
        assert_eq!(
            presenter.edited_content(&shown, EditorMode::Html).unwrap(),
            "<p>hi</p>"
        );
    }

    #[test]
    fn text_mode_is_verbatim() {
        let presenter = PlainPresenter;
        let shown = presenter
            .editable_content(&body(), "(default)", EditorMode::Text, "")
            .unwrap();
        assert_eq!(shown, "<p>hi</p>");
        assert_eq!(
            presenter
                .edited_content("<body>x</body>", EditorMode::Text)
                .unwrap(),
            "<body>x</body>"
        );
    }

    #[test]
    fn missing_section_renders_empty() {
        let shown = PlainPresenter
            .editable_content(&body(), "nope", EditorMode::Text, "")
            .unwrap();
        assert!(shown.is_empty());
    }

    #[test]
    fn html_fragment_without_body_is_kept() {
        assert_eq!(
            PlainPresenter
                .edited_content("<b>bold</b>", EditorMode::Html)
                .unwrap(),
            "<b>bold</b>"
        );
    }

    #[test]
    fn recording_redirector() {
        let mut ok = RecordingRedirector::new();
        ok.send_redirect("/x").unwrap();
        assert_eq!(ok.last(), Some("/x"));

        let mut broken = RecordingRedirector::failing();
        assert!(broken.send_redirect("/x").is_err());
        assert!(broken.targets.is_empty());
    }
}
