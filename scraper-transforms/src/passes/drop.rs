//! Removal of matched elements

use scraper_tree::walk::walk;
use scraper_tree::ElementRef;

use crate::editor::{self, is_droppable, Edits};
use crate::matching::MatchCriteria;
use crate::{Payload, Transform, TransformError};

/// Removes every element matched by the criteria, keeping sibling order
/// among survivors. A dropped parent takes its descendants with it. Table
/// cells are structural and stay in place even when matched.
#[derive(Debug, Clone)]
pub struct DropElements {
    criteria: MatchCriteria,
}

impl DropElements {
    pub fn new(criteria: MatchCriteria) -> Self {
        Self { criteria }
    }
}

impl Transform for DropElements {
    fn kind(&self) -> &'static str {
        "drop_elements"
    }

    fn apply(&self, payload: Payload) -> Result<Payload, TransformError> {
        let doc = payload.expect_tree(self.kind())?;
        let mut edits = Edits::default();
        for visit in walk(ElementRef::Document(&doc)) {
            if !is_droppable(&visit.path) {
                continue;
            }
            if self
                .criteria
                .matches(visit.entry, &visit.ancestors, &doc.shared_data)?
            {
                edits.drops.insert(visit.path);
            }
        }
        Ok(Payload::Tree(editor::apply(doc, &edits)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper_tree::{BlockElement, DocContent, Document, Paragraph};

    fn doc() -> Document {
        Document::new(DocContent::new(vec![
            BlockElement::Paragraph(Paragraph::from_text("keep")),
            BlockElement::Paragraph(Paragraph::from_text("   ")),
            BlockElement::Paragraph(Paragraph::from_text("also keep")),
        ]))
    }

    fn criteria(yaml: &str) -> MatchCriteria {
        serde_yaml::from_str(yaml).expect("criteria deserialize")
    }

    fn texts(doc: &Document) -> Vec<String> {
        doc.content
            .elements
            .iter()
            .map(|block| scraper_tree::text::aggregated_text(block.as_ref()))
            .collect()
    }

    #[test]
    fn drops_blank_paragraphs() {
        let pass = DropElements::new(criteria(
            r#"
match_element:
  element_types: [Paragraph]
  aggregated_text_regex: "\\s*"
"#,
        ));
        let result = pass.apply(Payload::Tree(doc())).expect("applies");
        let Payload::Tree(result) = result else {
            panic!("expected tree payload");
        };
        assert_eq!(texts(&result), vec!["keep", "also keep"]);
    }

    #[test]
    fn dropping_twice_equals_dropping_once() {
        let pass = DropElements::new(criteria(
            r#"
match_element:
  aggregated_text_regex: "\\s*"
  element_types: [TextRun]
"#,
        ));
        let once = pass.apply(Payload::Tree(doc())).expect("applies");
        let Payload::Tree(once) = once else {
            panic!("expected tree payload");
        };
        let twice = pass.apply(Payload::Tree(once.clone())).expect("applies");
        let Payload::Tree(twice) = twice else {
            panic!("expected tree payload");
        };
        assert_eq!(once, twice);
    }
}
