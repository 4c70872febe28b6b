//! Section nesting
//!
//! Converts flat heading-marked content into nested sections: a heading
//! paragraph opens a section holding everything up to the next heading of
//! equal or shallower level; deeper headings nest inside it. Sections that
//! bridge a skipped level are synthesized without a heading. The pass
//! restructures every content container (document body and table cells)
//! and leaves existing section content lists alone, which makes it
//! idempotent.

use scraper_tree::elements::{BlockElement, DocContent, Paragraph, Section};

use crate::{Payload, Transform, TransformError};

#[derive(Debug, Clone, Default)]
pub struct NestSections;

impl Transform for NestSections {
    fn kind(&self) -> &'static str {
        "nest_sections"
    }

    fn apply(&self, payload: Payload) -> Result<Payload, TransformError> {
        let mut doc = payload.expect_tree(self.kind())?;
        doc.content = structure_content(doc.content)?;
        Ok(Payload::Tree(doc))
    }
}

fn structure_content(mut content: DocContent) -> Result<DocContent, TransformError> {
    let mut recursed = Vec::with_capacity(content.elements.len());
    for block in content.elements {
        recursed.push(recurse_block(block)?);
    }
    let top = structure(1, None, recursed)?;
    content.elements = top.content;
    Ok(content)
}

fn recurse_block(block: BlockElement) -> Result<BlockElement, TransformError> {
    match block {
        BlockElement::Table(table) => {
            let mut failure = None;
            let table = table.map_cells(|cell| match structure_content(cell) {
                Ok(cell) => cell,
                Err(err) => {
                    failure = Some(err);
                    DocContent::default()
                }
            });
            match failure {
                Some(err) => Err(err),
                None => Ok(BlockElement::Table(table)),
            }
        }
        BlockElement::Section(mut section) => {
            let mut recursed = Vec::with_capacity(section.content.len());
            for block in section.content {
                recursed.push(recurse_block(block)?);
            }
            section.content = recursed;
            Ok(BlockElement::Section(section))
        }
        other => Ok(other),
    }
}

fn heading_level(block: &BlockElement) -> Option<u8> {
    match block {
        BlockElement::Paragraph(paragraph) => paragraph.heading_level,
        _ => None,
    }
}

/// Build the section for `heading` out of `items`, which hold everything at
/// `level` or deeper. Returns a section at `level - 1`.
fn structure(
    level: u8,
    heading: Option<Paragraph>,
    items: Vec<BlockElement>,
) -> Result<Section, TransformError> {
    if let Some(h) = &heading {
        if h.heading_level.map(|l| level < l).unwrap_or(false) {
            // The heading skips a level; bridge the gap with a wrapper.
            let inner = structure(level + 1, heading, items)?;
            return Ok(Section::new(
                level.saturating_sub(1),
                None,
                vec![BlockElement::Section(inner)],
            ));
        }
    }

    let first_heading = items
        .iter()
        .position(|item| heading_level(item).is_some())
        .unwrap_or(items.len());

    let mut intro: Vec<BlockElement> = Vec::new();
    let mut level_sections: Vec<Section> = Vec::new();
    let mut tail: Vec<BlockElement> = Vec::new();
    let mut last_heading = items.len();

    for (index, item) in items.into_iter().enumerate().rev() {
        if index < first_heading {
            intro.insert(0, item);
            continue;
        }
        match heading_level(&item) {
            Some(found) if found < level => {
                return Err(TransformError::pass(
                    "nest_sections",
                    format!("heading level {} below current level {}", found, level),
                ));
            }
            Some(found) if found == level => {
                let heading_paragraph = match item {
                    BlockElement::Paragraph(paragraph) => paragraph,
                    _ => unreachable!("heading_level only matches paragraphs"),
                };
                let section_items = std::mem::take(&mut tail);
                level_sections.insert(0, structure(level + 1, Some(heading_paragraph), section_items)?);
                last_heading = index;
            }
            _ => tail.insert(0, item),
        }
    }

    if last_heading != first_heading && !tail.is_empty() {
        // Content between the intro and the first level heading consists of
        // deeper headings only; wrap it.
        level_sections.insert(0, structure(level + 1, None, tail)?);
    }

    let mut content = intro;
    content.extend(level_sections.into_iter().map(BlockElement::Section));
    Ok(Section::new(level.saturating_sub(1), heading, content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper_tree::{Document, Table};

    fn heading(level: u8, text: &str) -> BlockElement {
        BlockElement::Paragraph(Paragraph::heading(level, text))
    }

    fn para(text: &str) -> BlockElement {
        BlockElement::Paragraph(Paragraph::from_text(text))
    }

    fn apply(doc: Document) -> Document {
        let Payload::Tree(doc) = NestSections.apply(Payload::Tree(doc)).expect("applies") else {
            panic!("expected tree payload");
        };
        doc
    }

    fn section_of(block: &BlockElement) -> &Section {
        block.as_section().expect("section")
    }

    #[test]
    fn headings_open_sections_with_following_content() {
        let doc = Document::new(DocContent::new(vec![
            para("preamble"),
            heading(1, "One"),
            para("one body"),
            heading(2, "One.A"),
            para("a body"),
            heading(1, "Two"),
            para("two body"),
        ]));
        let doc = apply(doc);
        assert_eq!(doc.content.elements.len(), 3);
        assert!(doc.content.elements[0].as_paragraph().is_some());

        let one = section_of(&doc.content.elements[1]);
        assert_eq!(one.level, 1);
        let one_heading = one.heading.as_ref().expect("heading");
        assert_eq!(one_heading.heading_level, Some(1));
        assert_eq!(one.content.len(), 2);
        let one_a = section_of(&one.content[1]);
        assert_eq!(one_a.level, 2);
        assert_eq!(one_a.content.len(), 1);

        let two = section_of(&doc.content.elements[2]);
        assert_eq!(
            scraper_tree::text::heading_text(scraper_tree::ElementRef::Section(two)).as_deref(),
            Some("Two")
        );
    }

    #[test]
    fn skipped_levels_get_wrapper_sections() {
        let doc = Document::new(DocContent::new(vec![heading(3, "Deep"), para("body")]));
        let doc = apply(doc);
        let wrapper = section_of(&doc.content.elements[0]);
        assert!(wrapper.heading.is_none());
        assert_eq!(wrapper.level, 1);
        let inner_wrapper = section_of(&wrapper.content[0]);
        assert!(inner_wrapper.heading.is_none());
        let deep = section_of(&inner_wrapper.content[0]);
        assert_eq!(deep.level, 3);
        assert!(deep.heading.is_some());
        assert_eq!(deep.content.len(), 1);
    }

    #[test]
    fn table_cells_are_structured_independently() {
        let cell_content = DocContent::new(vec![heading(1, "Cell"), para("cell body")]);
        let table =
            Table::from_rows(vec![vec![cell_content]]).expect("valid geometry");
        let doc = Document::new(DocContent::new(vec![BlockElement::Table(table)]));
        let doc = apply(doc);
        let table = doc.content.elements[0].as_table().expect("table");
        let cell = table.cell(0, 0).expect("cell");
        let section = section_of(&cell.elements[0]);
        assert_eq!(section.content.len(), 1);
    }

    #[test]
    fn nesting_is_idempotent() {
        let doc = Document::new(DocContent::new(vec![
            heading(1, "One"),
            para("body"),
            heading(2, "Two"),
            para("deeper"),
        ]));
        let once = apply(doc);
        let twice = apply(once.clone());
        assert_eq!(once, twice);
    }
}
