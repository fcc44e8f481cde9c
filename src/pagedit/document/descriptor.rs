use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::RequestContext;
use crate::store::DataStore;

/// Name of the element whose content the page editor edits.
pub const BODY_ELEMENT: &str = "body";

/// Class given to master layouts of pages created by the editor.
pub const DEFAULT_TEMPLATE_CLASS: &str = "MasterTemplate";

/// Class given to body elements of pages created by the editor.
pub const DEFAULT_BODY_CLASS: &str = "BodyTemplate";

/// Binding of one element of a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementBinding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Section of the template currently shown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

/// The page's control file: master layout plus element bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlDescriptor {
    #[serde(default)]
    pub master_template: String,
    #[serde(default)]
    pub template_class: String,
    #[serde(default)]
    pub elements: BTreeMap<String, ElementBinding>,
}

impl ControlDescriptor {
    pub fn new(master_template: &str, template_class: &str) -> Self {
        Self {
            master_template: master_template.to_string(),
            template_class: template_class.to_string(),
            elements: BTreeMap::new(),
        }
    }

    pub fn with_element(mut self, name: &str, class: &str, template: &str) -> Self {
        self.elements.insert(
            name.to_string(),
            ElementBinding {
                class: Some(class.to_string()),
                template: Some(template.to_string()),
                selector: None,
            },
        );
        self
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

    pub fn element(&self, name: &str) -> Option<&ElementBinding> {
        self.elements.get(name)
    }

    pub fn element_class(&self, name: &str) -> Option<&str> {
        self.element(name).and_then(|e| e.class.as_deref())
    }

    pub fn element_template(&self, name: &str) -> Option<&str> {
        self.element(name).and_then(|e| e.template.as_deref())
    }

    pub fn element_selector(&self, name: &str) -> Option<&str> {
        self.element(name).and_then(|e| e.selector.as_deref())
    }

    /// `(class, template)` of the body element, when both are defined.
    pub fn body_binding(&self) -> Option<(&str, &str)> {
        Some((
            self.element_class(BODY_ELEMENT)?,
            self.element_template(BODY_ELEMENT)?,
        ))
    }

    pub fn set_selector(&mut self, name: &str, selector: &str) {
        self.elements.entry(name.to_string()).or_default().selector = Some(selector.to_string());
    }

    pub fn set_template(&mut self, name: &str, template: &str) {
        self.elements.entry(name.to_string()).or_default().template = Some(template.to_string());
    }

    pub fn set_master_template(&mut self, layout: &str) {
        self.master_template = layout.to_string();
    }

    pub fn master_template(&self) -> &str {
        &self.master_template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_binding_needs_class_and_template() {
        let mut descriptor = ControlDescriptor::new("/layouts/main", "LayoutClass");
        assert_eq!(descriptor.body_binding(), None);

        descriptor.set_template(BODY_ELEMENT, "/content/bodys/a.html");
        assert_eq!(descriptor.body_binding(), None);

        let descriptor = descriptor.with_element(BODY_ELEMENT, "BodyClass", "/content/bodys/a.html");
        assert_eq!(
            descriptor.body_binding(),
            Some(("BodyClass", "/content/bodys/a.html"))
        );
    }

    #[test]
    fn selector_survives_serialization() {
        let mut descriptor = ControlDescriptor::new("/layouts/main", "LayoutClass")
            .with_element(BODY_ELEMENT, "BodyClass", "/content/bodys/a.html");
        descriptor.set_selector(BODY_ELEMENT, "intro");

        let json = serde_json::to_string(&descriptor).unwrap();
        let parsed: ControlDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.element_selector(BODY_ELEMENT), Some("intro"));
        assert_eq!(parsed, descriptor);
    }
}
