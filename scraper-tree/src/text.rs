//! Aggregated-text rules
//!
//! The matcher and the variable engine compare elements by their aggregated
//! text: the depth-first concatenation of all descendant leaf text, with no
//! separator. Sections and bullet items additionally expose a heading-only
//! aggregation restricted to the heading paragraph (respectively the item's
//! own inline elements, excluding nested items).

use crate::elements::ElementRef;

/// Depth-first concatenation of descendant leaf text.
pub fn aggregated_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect(element, &mut out);
    out
}

fn collect(element: ElementRef<'_>, out: &mut String) {
    if let Some(text) = element.own_text() {
        out.push_str(text);
        return;
    }
    for (_, child) in element.children() {
        collect(child, out);
    }
}

/// Heading-only aggregation for elements that have one.
///
/// Returns `None` for element kinds without a heading notion.
pub fn heading_text(element: ElementRef<'_>) -> Option<String> {
    match element {
        ElementRef::Section(section) => Some(
            section
                .heading
                .as_ref()
                .map(|heading| aggregated_text(ElementRef::Paragraph(heading)))
                .unwrap_or_default(),
        ),
        ElementRef::BulletItem(item) => {
            let mut out = String::new();
            for inline in &item.elements {
                out.push_str(inline.text());
            }
            Some(out)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{
        BlockElement, BulletItem, DocContent, ElementRef, InlineElement, Paragraph, Section,
        Table, TextRun,
    };

    #[test]
    fn leaves_aggregate_to_their_text() {
        let run = TextRun::new("plain");
        assert_eq!(aggregated_text(ElementRef::TextRun(&run)), "plain");
    }

    #[test]
    fn paragraph_concatenates_without_separator() {
        let paragraph = Paragraph::new(vec![
            InlineElement::TextRun(TextRun::new("one ")),
            InlineElement::TextRun(TextRun::new("two")),
        ]);
        assert_eq!(
            aggregated_text(ElementRef::Paragraph(&paragraph)),
            "one two"
        );
    }

    #[test]
    fn table_aggregates_cells_row_major() {
        let table = Table::from_rows(vec![
            vec![
                DocContent::new(vec![BlockElement::Paragraph(Paragraph::from_text("a"))]),
                DocContent::new(vec![BlockElement::Paragraph(Paragraph::from_text("b"))]),
            ],
            vec![
                DocContent::new(vec![BlockElement::Paragraph(Paragraph::from_text("c"))]),
                DocContent::new(vec![BlockElement::Paragraph(Paragraph::from_text("d"))]),
            ],
        ])
        .expect("valid geometry");
        assert_eq!(aggregated_text(ElementRef::Table(&table)), "abcd");
    }

    #[test]
    fn bullet_item_heading_excludes_nested() {
        let mut item = BulletItem::from_text(0, "Name: value");
        item.nested.push(BulletItem::from_text(1, "Field1: v1"));
        let item_ref = ElementRef::BulletItem(&item);
        assert_eq!(aggregated_text(item_ref), "Name: valueField1: v1");
        assert_eq!(heading_text(item_ref).as_deref(), Some("Name: value"));
    }

    #[test]
    fn section_heading_text_uses_heading_paragraph() {
        let section = Section::new(
            1,
            Some(Paragraph::heading(1, "Table Grid")),
            vec![BlockElement::Paragraph(Paragraph::from_text("body"))],
        );
        let section_ref = ElementRef::Section(&section);
        assert_eq!(heading_text(section_ref).as_deref(), Some("Table Grid"));
        assert_eq!(aggregated_text(section_ref), "Table Gridbody");
    }

    #[test]
    fn heading_text_is_none_for_plain_paragraphs() {
        let paragraph = Paragraph::from_text("text");
        assert_eq!(heading_text(ElementRef::Paragraph(&paragraph)), None);
    }
}
