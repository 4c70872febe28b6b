//! Bullet nesting
//!
//! Source parsers deliver bullet items flat, each carrying its indentation
//! level. This pass merges consecutive runs of bullet items (and parser
//! produced bullet lists) in every content list into a single list whose
//! items are nested by level: an item of level n+1 directly following a
//! level-n sibling moves into the latter's `nested` list. Gaps in levels are
//! bridged with synthesized empty items so nesting always matches indentation.

use scraper_tree::elements::{BlockElement, BulletItem, BulletList, Common, DocContent};

use crate::{Payload, Transform, TransformError};

#[derive(Debug, Clone, Default)]
pub struct NestBullets;

impl Transform for NestBullets {
    fn kind(&self) -> &'static str {
        "nest_bullets"
    }

    fn apply(&self, payload: Payload) -> Result<Payload, TransformError> {
        let mut doc = payload.expect_tree(self.kind())?;
        doc.content = nest_content(doc.content);
        Ok(Payload::Tree(doc))
    }
}

fn nest_content(mut content: DocContent) -> DocContent {
    content.elements = nest_blocks(content.elements);
    content
}

fn nest_blocks(blocks: Vec<BlockElement>) -> Vec<BlockElement> {
    let blocks: Vec<BlockElement> = blocks
        .into_iter()
        .map(|block| match block {
            BlockElement::Table(table) => BlockElement::Table(table.map_cells(nest_content)),
            BlockElement::Section(mut section) => {
                section.content = nest_blocks(section.content);
                BlockElement::Section(section)
            }
            other => other,
        })
        .collect();

    let mut result = Vec::with_capacity(blocks.len());
    let mut pending: Vec<BulletItem> = Vec::new();
    let mut pending_common: Option<Common> = None;
    for block in blocks {
        match block {
            BlockElement::BulletItem(item) => pending.push(item),
            BlockElement::BulletList(list) => {
                if pending_common.is_none() {
                    pending_common = Some(list.common);
                }
                pending.extend(list.items);
            }
            other => {
                flush(&mut result, &mut pending, &mut pending_common);
                result.push(other);
            }
        }
    }
    flush(&mut result, &mut pending, &mut pending_common);
    result
}

fn flush(
    result: &mut Vec<BlockElement>,
    pending: &mut Vec<BulletItem>,
    pending_common: &mut Option<Common>,
) {
    if pending.is_empty() {
        *pending_common = None;
        return;
    }
    let items = nest_items(0, pending);
    pending.clear();
    result.push(BlockElement::BulletList(BulletList {
        common: pending_common.take().unwrap_or_default(),
        items,
    }));
}

/// Nest a flat run of items by indentation level. Items at `level` divide
/// the list; everything between two of them nests below the left one.
fn nest_items(level: u8, items: &[BulletItem]) -> Vec<BulletItem> {
    let mut result: Vec<BulletItem> = Vec::new();
    let mut last_matched = items.len();
    for index in (0..items.len()).rev() {
        if items[index].level == level {
            let mut element = items[index].clone();
            let below = &items[index + 1..last_matched];
            if !below.is_empty() {
                element.nested = nest_items(level + 1, below);
            }
            result.push(element);
            last_matched = index;
        }
    }
    if last_matched != 0 {
        // The run starts deeper than `level`; wrap the prefix so the nested
        // structure still matches the indentation.
        let nested = nest_items(level + 1, &items[..last_matched]);
        result.push(BulletItem::empty_wrapper(level, nested));
    }
    result.reverse();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper_tree::{Document, Paragraph};

    fn item(level: u8, text: &str) -> BlockElement {
        BlockElement::BulletItem(BulletItem::from_text(level, text))
    }

    fn apply(doc: Document) -> Document {
        let Payload::Tree(doc) = NestBullets.apply(Payload::Tree(doc)).expect("applies") else {
            panic!("expected tree payload");
        };
        doc
    }

    #[test]
    fn consecutive_items_nest_by_level() {
        let doc = Document::new(DocContent::new(vec![
            item(0, "top"),
            item(1, "child a"),
            item(2, "grandchild"),
            item(1, "child b"),
            item(0, "second top"),
        ]));
        let doc = apply(doc);
        assert_eq!(doc.content.elements.len(), 1);
        let list = doc.content.elements[0].as_bullet_list().expect("list");
        assert_eq!(list.items.len(), 2);
        let top = &list.items[0];
        assert_eq!(top.nested.len(), 2);
        assert_eq!(top.nested[0].nested.len(), 1);
        assert!(list.items[1].nested.is_empty());
    }

    #[test]
    fn consecutive_lists_merge_before_nesting() {
        let first = BulletList::new(vec![
            BulletItem::from_text(0, "a"),
            BulletItem::from_text(1, "a1"),
        ]);
        let second = BulletList::new(vec![BulletItem::from_text(1, "a2")]);
        let doc = Document::new(DocContent::new(vec![
            BlockElement::BulletList(first),
            BlockElement::BulletList(second),
        ]));
        let doc = apply(doc);
        assert_eq!(doc.content.elements.len(), 1);
        let list = doc.content.elements[0].as_bullet_list().expect("list");
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].nested.len(), 2);
    }

    #[test]
    fn level_gaps_get_wrapper_items() {
        let doc = Document::new(DocContent::new(vec![item(2, "deep start")]));
        let doc = apply(doc);
        let list = doc.content.elements[0].as_bullet_list().expect("list");
        assert_eq!(list.items.len(), 1);
        let wrapper = &list.items[0];
        assert_eq!(wrapper.list_type, "empty");
        assert_eq!(wrapper.level, 0);
        assert_eq!(wrapper.nested[0].list_type, "empty");
        assert_eq!(wrapper.nested[0].nested[0].level, 2);
    }

    #[test]
    fn non_bullet_blocks_break_runs() {
        let doc = Document::new(DocContent::new(vec![
            item(0, "a"),
            BlockElement::Paragraph(Paragraph::from_text("break")),
            item(0, "b"),
        ]));
        let doc = apply(doc);
        assert_eq!(doc.content.elements.len(), 3);
        assert!(doc.content.elements[0].as_bullet_list().is_some());
        assert!(doc.content.elements[1].as_paragraph().is_some());
        assert!(doc.content.elements[2].as_bullet_list().is_some());
    }

    #[test]
    fn nesting_is_idempotent() {
        let doc = Document::new(DocContent::new(vec![
            item(0, "top"),
            item(1, "child"),
            item(3, "deep"),
        ]));
        let once = apply(doc);
        let twice = apply(once.clone());
        assert_eq!(once, twice);
    }
}
