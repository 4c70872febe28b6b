//! Property tests for the structural passes
//!
//! The nesting passes must be idempotent for arbitrary flat inputs, and
//! dropping with fixed criteria must be idempotent as well.

use proptest::prelude::*;

use scraper_transforms::passes::{DropElements, NestBullets, NestSections};
use scraper_transforms::{MatchCriteria, Payload, Transform};
use scraper_tree::{BlockElement, BulletItem, DocContent, Document, Paragraph};

fn bullet_doc(levels: &[u8]) -> Document {
    let blocks = levels
        .iter()
        .enumerate()
        .map(|(index, level)| {
            BlockElement::BulletItem(BulletItem::from_text(*level, format!("item {}", index)))
        })
        .collect();
    Document::new(DocContent::new(blocks))
}

fn heading_doc(levels: &[Option<u8>]) -> Document {
    let blocks = levels
        .iter()
        .enumerate()
        .map(|(index, level)| match level {
            Some(level) => {
                BlockElement::Paragraph(Paragraph::heading(*level, format!("h {}", index)))
            }
            None => BlockElement::Paragraph(Paragraph::from_text(format!("p {}", index))),
        })
        .collect();
    Document::new(DocContent::new(blocks))
}

fn tree(payload: Payload) -> Document {
    match payload {
        Payload::Tree(doc) => doc,
        Payload::Json(_) => panic!("expected tree payload"),
    }
}

proptest! {
    #[test]
    fn nest_bullets_is_idempotent(levels in proptest::collection::vec(0u8..4, 0..12)) {
        let doc = bullet_doc(&levels);
        let once = tree(NestBullets.apply(Payload::Tree(doc)).expect("first application"));
        let twice = tree(NestBullets.apply(Payload::Tree(once.clone())).expect("second application"));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn nest_sections_is_idempotent(
        levels in proptest::collection::vec(proptest::option::of(1u8..5), 0..12)
    ) {
        let doc = heading_doc(&levels);
        let once = tree(NestSections.apply(Payload::Tree(doc)).expect("first application"));
        let twice = tree(NestSections.apply(Payload::Tree(once.clone())).expect("second application"));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn drop_elements_is_idempotent(
        texts in proptest::collection::vec("[a-c ]{0,4}", 0..10)
    ) {
        let blocks = texts
            .iter()
            .map(|text| BlockElement::Paragraph(Paragraph::from_text(text.clone())))
            .collect();
        let doc = Document::new(DocContent::new(blocks));
        let criteria: MatchCriteria = serde_yaml::from_str(
            r#"
match_element:
  element_types: [Paragraph]
  aggregated_text_regex: "\\s*"
"#,
        )
        .expect("criteria deserialize");
        let pass = DropElements::new(criteria);
        let once = tree(pass.apply(Payload::Tree(doc)).expect("first application"));
        let twice = tree(pass.apply(Payload::Tree(once.clone())).expect("second application"));
        prop_assert_eq!(once, twice);
    }
}
