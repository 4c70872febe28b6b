//! Element variants of the document tree
//!
//! The tree is a tagged union: inline leaves (`TextRun`, `Chips`) live inside
//! paragraphs, block elements (`Paragraph`, `BulletItem`, `BulletList`,
//! `Table`, `Section`) live inside `DocContent` containers, and a `Document`
//! roots it all. `ElementRef` provides a borrowed view over any variant so
//! matchers and traversal can treat the tree uniformly.

mod document;
mod inline;
mod paragraph;
mod section;
mod table;

pub use document::{Document, SharedData};
pub use inline::{Chips, TextRun};
pub use paragraph::{BulletItem, BulletList, Paragraph};
pub use section::Section;
pub use table::{DocContent, Table};

use std::collections::BTreeMap;

/// Attribute record shared by every element variant.
///
/// `attribs` are structural attributes carried over from the source document,
/// `style` holds CSS-like presentation details, `tags` are free-form
/// annotations added by pipeline passes. All three are case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Common {
    pub attribs: BTreeMap<String, String>,
    pub style: BTreeMap<String, String>,
    pub tags: BTreeMap<String, String>,
}

impl Common {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_style(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.insert(key.into(), value.into());
        self
    }

    pub fn with_attrib(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attribs.insert(key.into(), value.into());
        self
    }
}

/// An element that can appear inline in a paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineElement {
    TextRun(TextRun),
    Chips(Chips),
}

impl InlineElement {
    pub fn common(&self) -> &Common {
        match self {
            InlineElement::TextRun(run) => &run.common,
            InlineElement::Chips(chips) => &chips.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut Common {
        match self {
            InlineElement::TextRun(run) => &mut run.common,
            InlineElement::Chips(chips) => &mut chips.common,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            InlineElement::TextRun(run) => &run.text,
            InlineElement::Chips(chips) => &chips.text,
        }
    }

    pub fn set_text(&mut self, text: String) {
        match self {
            InlineElement::TextRun(run) => run.text = text,
            InlineElement::Chips(chips) => chips.text = text,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            InlineElement::TextRun(run) => run.url.as_deref(),
            InlineElement::Chips(chips) => chips.url.as_deref(),
        }
    }

    pub fn as_ref(&self) -> ElementRef<'_> {
        match self {
            InlineElement::TextRun(run) => ElementRef::TextRun(run),
            InlineElement::Chips(chips) => ElementRef::Chips(chips),
        }
    }
}

/// An element that can appear in a content list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockElement {
    Paragraph(Paragraph),
    BulletItem(BulletItem),
    BulletList(BulletList),
    Table(Table),
    Section(Section),
}

impl BlockElement {
    pub fn common(&self) -> &Common {
        match self {
            BlockElement::Paragraph(p) => &p.common,
            BlockElement::BulletItem(b) => &b.common,
            BlockElement::BulletList(l) => &l.common,
            BlockElement::Table(t) => &t.common,
            BlockElement::Section(s) => &s.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut Common {
        match self {
            BlockElement::Paragraph(p) => &mut p.common,
            BlockElement::BulletItem(b) => &mut b.common,
            BlockElement::BulletList(l) => &mut l.common,
            BlockElement::Table(t) => &mut t.common,
            BlockElement::Section(s) => &mut s.common,
        }
    }

    pub fn as_ref(&self) -> ElementRef<'_> {
        match self {
            BlockElement::Paragraph(p) => ElementRef::Paragraph(p),
            BlockElement::BulletItem(b) => ElementRef::BulletItem(b),
            BlockElement::BulletList(l) => ElementRef::BulletList(l),
            BlockElement::Table(t) => ElementRef::Table(t),
            BlockElement::Section(s) => ElementRef::Section(s),
        }
    }

    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            BlockElement::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_section(&self) -> Option<&Section> {
        match self {
            BlockElement::Section(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            BlockElement::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_bullet_list(&self) -> Option<&BulletList> {
        match self {
            BlockElement::BulletList(l) => Some(l),
            _ => None,
        }
    }
}

/// Variant discriminator, used by type matchers and the JSON projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    TextRun,
    Chips,
    Paragraph,
    BulletItem,
    BulletList,
    Table,
    DocContent,
    Section,
    Document,
}

impl ElementKind {
    pub fn name(self) -> &'static str {
        match self {
            ElementKind::TextRun => "TextRun",
            ElementKind::Chips => "Chips",
            ElementKind::Paragraph => "Paragraph",
            ElementKind::BulletItem => "BulletItem",
            ElementKind::BulletList => "BulletList",
            ElementKind::Table => "Table",
            ElementKind::DocContent => "DocContent",
            ElementKind::Section => "Section",
            ElementKind::Document => "Document",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "TextRun" => ElementKind::TextRun,
            "Chips" => ElementKind::Chips,
            "Paragraph" => ElementKind::Paragraph,
            "BulletItem" => ElementKind::BulletItem,
            "BulletList" => ElementKind::BulletList,
            "Table" => ElementKind::Table,
            "DocContent" => ElementKind::DocContent,
            "Section" => ElementKind::Section,
            "Document" => ElementKind::Document,
            _ => return None,
        })
    }

    /// True for inline leaves covered by the abstract `ParagraphElement`.
    pub fn is_paragraph_element(self) -> bool {
        matches!(self, ElementKind::TextRun | ElementKind::Chips)
    }
}

/// One step from a parent element to one of its children.
///
/// Paths built from these steps are the positional identity of an element:
/// passes record match decisions keyed by path and apply them during rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// Document root to its content container.
    Content,
    /// Section to its heading paragraph.
    Heading,
    /// Ordinal position in a content, inline or item list.
    Child(usize),
    /// Position in a bullet item's nested list.
    Nested(usize),
    /// Table cell coordinates.
    Cell(usize, usize),
}

/// Borrowed, type-erased view of any element variant.
#[derive(Debug, Clone, Copy)]
pub enum ElementRef<'a> {
    TextRun(&'a TextRun),
    Chips(&'a Chips),
    Paragraph(&'a Paragraph),
    BulletItem(&'a BulletItem),
    BulletList(&'a BulletList),
    Table(&'a Table),
    DocContent(&'a DocContent),
    Section(&'a Section),
    Document(&'a Document),
}

impl<'a> ElementRef<'a> {
    pub fn kind(&self) -> ElementKind {
        match self {
            ElementRef::TextRun(_) => ElementKind::TextRun,
            ElementRef::Chips(_) => ElementKind::Chips,
            ElementRef::Paragraph(_) => ElementKind::Paragraph,
            ElementRef::BulletItem(_) => ElementKind::BulletItem,
            ElementRef::BulletList(_) => ElementKind::BulletList,
            ElementRef::Table(_) => ElementKind::Table,
            ElementRef::DocContent(_) => ElementKind::DocContent,
            ElementRef::Section(_) => ElementKind::Section,
            ElementRef::Document(_) => ElementKind::Document,
        }
    }

    pub fn common(&self) -> &'a Common {
        match self {
            ElementRef::TextRun(run) => &run.common,
            ElementRef::Chips(chips) => &chips.common,
            ElementRef::Paragraph(p) => &p.common,
            ElementRef::BulletItem(b) => &b.common,
            ElementRef::BulletList(l) => &l.common,
            ElementRef::Table(t) => &t.common,
            ElementRef::DocContent(c) => &c.common,
            ElementRef::Section(s) => &s.common,
            ElementRef::Document(d) => &d.common,
        }
    }

    pub fn tags(&self) -> &'a BTreeMap<String, String> {
        &self.common().tags
    }

    pub fn style(&self) -> &'a BTreeMap<String, String> {
        &self.common().style
    }

    pub fn attribs(&self) -> &'a BTreeMap<String, String> {
        &self.common().attribs
    }

    /// The `text` field of inline leaves; `None` for container elements.
    pub fn own_text(&self) -> Option<&'a str> {
        match self {
            ElementRef::TextRun(run) => Some(&run.text),
            ElementRef::Chips(chips) => Some(&chips.text),
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&'a str> {
        match self {
            ElementRef::TextRun(run) => run.url.as_deref(),
            ElementRef::Chips(chips) => chips.url.as_deref(),
            _ => None,
        }
    }

    /// Children in traversal order, each with the step that reaches it.
    pub fn children(&self) -> Vec<(PathStep, ElementRef<'a>)> {
        match self {
            ElementRef::TextRun(_) | ElementRef::Chips(_) => Vec::new(),
            ElementRef::Paragraph(p) => p
                .elements
                .iter()
                .enumerate()
                .map(|(i, el)| (PathStep::Child(i), el.as_ref()))
                .collect(),
            ElementRef::BulletItem(item) => {
                let mut children: Vec<(PathStep, ElementRef<'a>)> = item
                    .elements
                    .iter()
                    .enumerate()
                    .map(|(i, el)| (PathStep::Child(i), el.as_ref()))
                    .collect();
                children.extend(
                    item.nested
                        .iter()
                        .enumerate()
                        .map(|(i, nested)| (PathStep::Nested(i), ElementRef::BulletItem(nested))),
                );
                children
            }
            ElementRef::BulletList(list) => list
                .items
                .iter()
                .enumerate()
                .map(|(i, item)| (PathStep::Child(i), ElementRef::BulletItem(item)))
                .collect(),
            ElementRef::Table(table) => table
                .cells()
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    let (row, col) = table.coords_of(i);
                    (PathStep::Cell(row, col), ElementRef::DocContent(cell))
                })
                .collect(),
            ElementRef::DocContent(content) => content
                .elements
                .iter()
                .enumerate()
                .map(|(i, el)| (PathStep::Child(i), el.as_ref()))
                .collect(),
            ElementRef::Section(section) => {
                let mut children = Vec::new();
                if let Some(heading) = &section.heading {
                    children.push((PathStep::Heading, ElementRef::Paragraph(heading)));
                }
                children.extend(
                    section
                        .content
                        .iter()
                        .enumerate()
                        .map(|(i, el)| (PathStep::Child(i), el.as_ref())),
                );
                children
            }
            ElementRef::Document(doc) => {
                vec![(PathStep::Content, ElementRef::DocContent(&doc.content))]
            }
        }
    }
}
