//! Diff of an incoming request against what the client was last shown.

use super::request::{Action, EditRequest};
use super::state::SessionState;

/// One thing the user changed since the previous round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// New document title.
    Title(String),
    /// New master layout path.
    Layout(String),
    /// New name for the section being edited.
    BodyTitle(String),
    /// Another section selected.
    BodySelection(String),
    /// A fresh section requested.
    NewBody,
    /// Redirect to the temporary page after saving the draft.
    Preview,
}

impl Change {
    /// Application order. Later changes read state written by earlier ones:
    /// a rename updates the section a selection switches away from.
    pub fn rank(&self) -> u8 {
        match self {
            Change::Title(_) => 0,
            Change::Layout(_) => 1,
            Change::BodyTitle(_) => 2,
            Change::BodySelection(_) => 3,
            Change::NewBody => 4,
            Change::Preview => 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset(Vec<Change>);

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.0.iter()
    }

    pub fn selects_body(&self) -> bool {
        self.0.iter().any(|c| matches!(c, Change::BodySelection(_)))
    }
}

impl FromIterator<Change> for Changeset {
    fn from_iter<I: IntoIterator<Item = Change>>(iter: I) -> Self {
        let mut changes: Vec<Change> = iter.into_iter().collect();
        changes.sort_by_key(Change::rank);
        Changeset(changes)
    }
}

/// A field counts as changed only when both sides are known and differ.
fn changed(old: Option<&str>, new: Option<&str>) -> Option<String> {
    match (old, new) {
        (Some(old), Some(new)) if old != new => Some(new.to_string()),
        _ => None,
    }
}

pub fn diff(session: &SessionState, request: &EditRequest) -> Changeset {
    let mut changes = Vec::new();

    if let Some(title) = changed(session.old_title.as_deref(), request.title.as_deref()) {
        changes.push(Change::Title(title));
    }
    if let Some(layout) = changed(session.old_layout.as_deref(), request.template.as_deref()) {
        changes.push(Change::Layout(layout));
    }
    if let Some(name) = changed(
        session.old_body_title.as_deref(),
        request.body_title.as_deref(),
    ) {
        changes.push(Change::BodyTitle(name));
    }
    if let Some(body) = changed(session.old_body.as_deref(), request.body.as_deref()) {
        changes.push(Change::BodySelection(body));
    }
    match request.action {
        Some(Action::NewBody) => changes.push(Change::NewBody),
        Some(Action::Preview) => changes.push(Change::Preview),
        _ => {}
    }

    changes.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shown() -> SessionState {
        SessionState {
            old_title: Some("Hello".into()),
            old_layout: Some("/layouts/main".into()),
            old_body: Some("(default)".into()),
            old_body_title: Some(String::new()),
            ..SessionState::default()
        }
    }

    fn echo() -> EditRequest {
        EditRequest {
            file: "/a/page.html".into(),
            content: Some(String::new()),
            title: Some("Hello".into()),
            template: Some("/layouts/main".into()),
            body: Some("(default)".into()),
            body_title: Some(String::new()),
            ..EditRequest::default()
        }
    }

    #[test]
    fn echoing_the_last_values_changes_nothing() {
        assert!(diff(&shown(), &echo()).is_empty());
    }

    #[test]
    fn unknown_sides_are_not_changes() {
        let request = EditRequest {
            title: None,
            ..echo()
        };
        assert!(diff(&shown(), &request).is_empty());
        assert!(diff(&SessionState::default(), &echo()).is_empty());
    }

    #[test]
    fn changes_come_out_in_application_order() {
        let request = EditRequest {
            body: Some("intro".into()),
            body_title: Some("news".into()),
            title: Some("Bye".into()),
            template: Some("/layouts/wide".into()),
            action: Some(Action::Preview),
            ..echo()
        };
        let changes: Vec<_> = diff(&shown(), &request).iter().cloned().collect();
        assert_eq!(
            changes,
            vec![
                Change::Title("Bye".into()),
                Change::Layout("/layouts/wide".into()),
                Change::BodyTitle("news".into()),
                Change::BodySelection("intro".into()),
                Change::Preview,
            ]
        );
    }

    #[test]
    fn actions_without_a_change_flag_are_ignored() {
        let request = echo().with_action(Action::Save);
        assert!(diff(&shown(), &request).is_empty());
        let request = echo().with_action(Action::NewBody);
        assert_eq!(diff(&shown(), &request).len(), 1);
    }
}
