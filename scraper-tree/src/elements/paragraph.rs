//! Paragraphs, bullet items and bullet lists
//!
//! A paragraph is an ordered run of inline elements. Headings are paragraphs
//! with `heading_level` set (1 for `h1` downwards); the section-nesting pass
//! consumes that marker. Bullet items extend paragraphs with an indentation
//! level and, after the bullet-nesting pass, a `nested` list of deeper items.

use super::{Common, InlineElement, TextRun};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub common: Common,
    /// `Some(1..=6)` when the paragraph is a heading.
    pub heading_level: Option<u8>,
    pub elements: Vec<InlineElement>,
}

impl Paragraph {
    pub fn new(elements: Vec<InlineElement>) -> Self {
        Self {
            common: Common::default(),
            heading_level: None,
            elements,
        }
    }

    /// Single-run paragraph, the common case in tests.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(vec![InlineElement::TextRun(TextRun::new(text))])
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        let mut paragraph = Self::from_text(text);
        paragraph.heading_level = Some(level);
        paragraph
    }

    pub fn with_common(mut self, common: Common) -> Self {
        self.common = common;
        self
    }

    pub fn is_heading(&self) -> bool {
        self.heading_level.is_some()
    }
}

/// A bullet item: a paragraph with indentation metadata and nested children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletItem {
    pub common: Common,
    pub elements: Vec<InlineElement>,
    /// Indentation level, 0 for top-level items.
    pub level: u8,
    /// Source list kind, e.g. `ul` or `ol`.
    pub list_type: String,
    /// Items indented below this one; populated by the nesting pass.
    pub nested: Vec<BulletItem>,
}

impl BulletItem {
    pub fn new(level: u8, list_type: impl Into<String>, elements: Vec<InlineElement>) -> Self {
        Self {
            common: Common::default(),
            elements,
            level,
            list_type: list_type.into(),
            nested: Vec::new(),
        }
    }

    pub fn from_text(level: u8, text: impl Into<String>) -> Self {
        Self::new(
            level,
            "ul",
            vec![InlineElement::TextRun(TextRun::new(text))],
        )
    }

    /// Placeholder item bridging a gap in indentation levels.
    pub fn empty_wrapper(level: u8, nested: Vec<BulletItem>) -> Self {
        Self {
            common: Common::default(),
            elements: Vec::new(),
            level,
            list_type: "empty".to_string(),
            nested,
        }
    }
}

/// A list of top-level bullet items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulletList {
    pub common: Common,
    pub items: Vec<BulletItem>,
}

impl BulletList {
    pub fn new(items: Vec<BulletItem>) -> Self {
        Self {
            common: Common::default(),
            items,
        }
    }
}
