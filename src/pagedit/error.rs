use thiserror::Error;

use crate::session::commit::CommitStep;

/// Coarse classification of every failure the editor can produce.
///
/// The engine decides between "fail the round trip" and "log and carry on"
/// by looking at the kind, never at the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required request parameter is missing or malformed.
    UserInput,
    /// The acting user may not write the resource.
    AccessDenied,
    /// A name is already taken (temp file, section).
    NameCollision,
    /// The temp allocator ran out of attempts.
    Capacity,
    /// Any other store-layer fault.
    Store,
    /// Sending a redirect failed.
    Transport,
}

impl ErrorKind {
    /// Collisions the temp allocator resolves by picking another name.
    pub fn is_retryable_collision(self) -> bool {
        self == ErrorKind::NameCollision
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Missing parameter \"{0}\": don't know which file should be edited")]
    MissingParameter(&'static str),

    #[error("Invalid value for parameter \"{name}\": {value}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("Insufficient rights for editing {0}")]
    AccessDenied(String),

    #[error("Resource {path} is locked by {owner}")]
    Locked { path: String, owner: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    FileExists(String),

    #[error("Storage conflict on {0}")]
    Conflict(String),

    #[error("Section \"{0}\" already exists")]
    SectionExists(String),

    #[error("Section \"{0}\" not found")]
    SectionNotFound(String),

    #[error("No free temporary name for {path} after {attempts} attempts")]
    TempCapacity { path: String, attempts: u32 },

    #[error("Body element class or template is not defined in {0}")]
    BodyBindingMissing(String),

    #[error("Commit failed at {step} (already committed: {completed:?}): {source}")]
    Commit {
        step: CommitStep,
        completed: Vec<CommitStep>,
        #[source]
        source: Box<EditError>,
    },

    #[error("Could not send redirect to {target}: {source}")]
    Transport {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),
}

impl EditError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EditError::MissingParameter(_) | EditError::InvalidParameter { .. } => {
                ErrorKind::UserInput
            }
            EditError::AccessDenied(_) | EditError::Locked { .. } => ErrorKind::AccessDenied,
            EditError::FileExists(_) | EditError::Conflict(_) | EditError::SectionExists(_) => {
                ErrorKind::NameCollision
            }
            EditError::TempCapacity { .. } => ErrorKind::Capacity,
            EditError::Transport { .. } => ErrorKind::Transport,
            EditError::NotFound(_)
            | EditError::SectionNotFound(_)
            | EditError::BodyBindingMissing(_)
            | EditError::Commit { .. }
            | EditError::Io(_)
            | EditError::Serialization(_)
            | EditError::Store(_) => ErrorKind::Store,
        }
    }
}

pub type Result<T> = std::result::Result<T, EditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collisions_are_retryable() {
        assert!(EditError::FileExists("/a".into())
            .kind()
            .is_retryable_collision());
        assert!(EditError::Conflict("/a".into())
            .kind()
            .is_retryable_collision());
        assert!(!EditError::NotFound("/a".into())
            .kind()
            .is_retryable_collision());
    }

    #[test]
    fn commit_failure_is_a_store_failure() {
        let err = EditError::Commit {
            step: CommitStep::Layout,
            completed: vec![CommitStep::BodyContent],
            source: Box::new(EditError::Store("disk full".into())),
        };
        assert_eq!(err.kind(), ErrorKind::Store);
        assert!(err.to_string().contains("disk full"));
    }
}
