//! Typed document tree for scraped word-processor documents
//!
//! This crate holds the data model that the whole workspace revolves around:
//! a tree of tagged elements produced by a document parser, rewritten by
//! transformation passes and finally projected to JSON for extraction.
//!
//! Architecture
//!
//! - elements: the element variants (text runs, chips, paragraphs, bullet
//!   items and lists, tables, doc content, sections, the document root)
//!   plus `ElementRef`, a borrowed, type-erased view used by matchers and
//!   traversal.
//! - text: aggregated-text rules (depth-first leaf concatenation, and the
//!   heading-only variants for sections and bullet items).
//! - walk: pre-order traversal yielding per-element contexts (ancestor
//!   path, table coordinates, sibling position, positional path).
//! - project: the JSON projection consumed by the query engine and the
//!   tree-exchange parser that rebuilds a document from it.
//!
//! Every element carries three string maps: `attribs` (structural attributes
//! from the source), `style` (CSS-like presentation details) and `tags`
//! (annotations added by pipeline passes). Elements are plain owned values;
//! transformations consume a tree and build a new one.

pub mod elements;
pub mod error;
pub mod project;
pub mod text;
pub mod walk;

pub use elements::{
    BlockElement, BulletItem, BulletList, Chips, Common, DocContent, Document, ElementKind,
    ElementRef, InlineElement, Paragraph, PathStep, Section, SharedData, Table, TextRun,
};
pub use error::StructuralError;
pub use project::{parse_document, project_document, project_element};
pub use walk::{walk, Entry, Visit, Walker};
