//! # Editing Sessions
//!
//! An editing *episode* runs from the first request for a page (no `content`
//! parameter) to the `exit` action. During an episode exactly one pair of
//! temporary resources exists: a scratch copy of the page and of its body.
//! The user edits the copies; `save` copies them back onto the originals.
//!
//! - [`request`]: typed request parameters, parsed at the boundary.
//! - [`state`]: what survives between round trips, owned by the caller.
//! - [`changes`]: the diff of a request against that state.
//! - [`commit`]: the ordered copy of a draft onto the originals.
//! - [`collab`]: rendering and redirect collaborators.
//! - [`engine`]: one round trip, start to finish.

pub mod changes;
pub mod collab;
pub mod commit;
pub mod engine;
pub mod request;
pub mod state;

pub use changes::{diff, Change, Changeset};
pub use collab::{PlainPresenter, Presenter, RecordingRedirector, Redirector};
pub use commit::CommitStep;
pub use engine::{Engine, Outcome};
pub use request::{Action, EditRequest, Phase};
pub use state::SessionState;
