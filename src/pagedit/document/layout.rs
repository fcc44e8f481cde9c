use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::RequestContext;
use crate::store::DataStore;

/// A master layout as far as the editor cares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutDocument {
    /// Body tag shared with every body rendered inside this layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_tag: Option<String>,
    /// Server-relative stylesheet path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stylesheet: Option<String>,
}

impl LayoutDocument {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EditError;
    use crate::model::{ProjectId, RequestContext};
    use crate::store::memory::fixtures::{StoreFixture, LAYOUT};

    #[test]
    fn published_layout_is_readable_from_any_project() {
        let store = StoreFixture::new().store;
        for project in [ProjectId(1), ProjectId(2)] {
            let ctx = RequestContext::new("alice", project);
            let layout = LayoutDocument::read(&store, &ctx, LAYOUT).unwrap();
            assert_eq!(layout.stylesheet.as_deref(), Some("/css/main.css"));
        }
    }

    #[test]
    fn missing_fields_default_to_none() {
        let layout: LayoutDocument = serde_json::from_str("{}").unwrap();
        assert_eq!(layout, LayoutDocument::default());
    }

    #[test]
    fn missing_layout_is_not_found() {
        let store = StoreFixture::new().store;
        let ctx = RequestContext::new("alice", ProjectId(1));
        assert!(matches!(
            LayoutDocument::read(&store, &ctx, "/nope.html"),
            Err(EditError::NotFound(_))
        ));
    }
}
