//! # Structured Documents
//!
//! Three kinds of resources carry structure the editor understands, all stored
//! as JSON in the resource content:
//!
//! - [`descriptor::ControlDescriptor`]: the page file itself. Links the page
//!   to its master layout and binds named elements (only `body` matters here)
//!   to a class, a template file and a section selector.
//! - [`body::BodyDocument`]: a body template file holding named sections.
//! - [`layout::LayoutDocument`]: a master layout, contributing the shared
//!   body tag and the stylesheet.
//!
//! Documents are read, mutated in memory and written back explicitly. Nothing
//! is flushed implicitly.

use crate::error::{EditError, Result};
use crate::model::RequestContext;
use crate::store::DataStore;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod body;
pub mod descriptor;
pub mod layout;

pub use body::{BodyDocument, Section, DEFAULT_SECTION, SCRIPT_SECTION};
pub use descriptor::{
    ControlDescriptor, ElementBinding, BODY_ELEMENT, DEFAULT_BODY_CLASS, DEFAULT_TEMPLATE_CLASS,
};
pub use layout::LayoutDocument;

/// Read and parse a JSON document. Empty content yields the default document.
pub(crate) fn load<T, S>(store: &S, ctx: &RequestContext, path: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
    S: DataStore + ?Sized,
{
    let resource = store.read_file(ctx, path)?;
    if resource.content.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(&resource.content).map_err(EditError::Serialization)
}

pub(crate) fn save<T, S>(doc: &T, store: &mut S, ctx: &RequestContext, path: &str) -> Result<()>
where
    T: Serialize,
    S: DataStore + ?Sized,
{
    let raw = serde_json::to_vec_pretty(doc).map_err(EditError::Serialization)?;
    store.write_file(ctx, path, &raw)
}
