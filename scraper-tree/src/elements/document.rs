//! Document root and shared data
//!
//! The document wraps the body content together with `SharedData`, the
//! non-content part of the source: currently the style rules parsed from the
//! embedded stylesheet, which matchers consult when an element inherits style
//! through its `class` attribute.

use std::collections::BTreeMap;

use super::{Common, DocContent};

pub type StyleRules = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedData {
    pub style_rules: StyleRules,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub common: Common,
    pub shared_data: SharedData,
    pub content: DocContent,
}

impl Document {
    pub fn new(content: DocContent) -> Self {
        Self {
            common: Common::default(),
            shared_data: SharedData::default(),
            content,
        }
    }

    pub fn with_shared_data(mut self, shared_data: SharedData) -> Self {
        self.shared_data = shared_data;
        self
    }

    pub fn with_common(mut self, common: Common) -> Self {
        self.common = common;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{BlockElement, Paragraph};

    #[test]
    fn document_holds_content_and_rules() {
        let mut rules = StyleRules::new();
        rules.insert(
            "c1".to_string(),
            BTreeMap::from([("font-weight".to_string(), "700".to_string())]),
        );
        let doc = Document::new(DocContent::new(vec![BlockElement::Paragraph(
            Paragraph::from_text("body"),
        )]))
        .with_shared_data(SharedData { style_rules: rules });
        assert_eq!(doc.content.elements.len(), 1);
        assert!(doc.shared_data.style_rules.contains_key("c1"));
    }
}
