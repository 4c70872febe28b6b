//! Matching, tagging and structural rewrite passes over document trees
//!
//! This crate is the transformation engine of the workspace: a set of
//! declarative rewrite passes applied in sequence to a document tree. Each
//! pass evaluates its match criteria against the snapshot it receives and
//! rebuilds the tree with the recorded decisions applied, so mutations only
//! become visible to subsequent passes.
//!
//! Architecture
//!
//! - pattern / template: compiled regex and interpolation primitives
//! - matching: the element predicate language and criteria bundles
//! - variables: per-element named values used by tag interpolation
//! - editor: the decision-driven rebuild shared by the matching passes
//! - passes: the registered transformation kinds
//! - extract: the nested query stage producing structured output
//! - registry: kind-string based construction from configuration values
//!
//! Pipeline items flow through as a `Payload`: a document tree until the
//! extraction stage replaces it with the extracted JSON.

pub mod editor;
pub mod error;
pub mod extract;
pub mod matching;
pub mod passes;
pub mod pattern;
pub mod registry;
pub mod template;
pub mod variables;

pub use error::{ConfigError, MatchError, TransformError};
pub use matching::{ElementMatcher, MatchCriteria};
pub use pattern::Pattern;
pub use registry::TransformRegistry;

use scraper_tree::project::project_document;
use scraper_tree::Document;
use serde_json::Value;

/// One pipeline item: a document tree, or the JSON the extraction stage
/// turned it into.
#[derive(Debug, Clone)]
pub enum Payload {
    Tree(Document),
    Json(Value),
}

impl Payload {
    /// Unwrap the tree form; tree passes cannot run after extraction.
    pub fn expect_tree(self, kind: &'static str) -> Result<Document, TransformError> {
        match self {
            Payload::Tree(doc) => Ok(doc),
            Payload::Json(_) => Err(TransformError::pass(
                kind,
                "expects a document tree but the document was already extracted to JSON",
            )),
        }
    }

    /// The JSON view sinks serialize: trees are projected, extracted values
    /// pass through.
    pub fn to_output_json(&self) -> Value {
        match self {
            Payload::Tree(doc) => project_document(doc),
            Payload::Json(value) => value.clone(),
        }
    }
}

/// One transformation pass, constructed from configuration by the registry.
pub trait Transform {
    fn kind(&self) -> &'static str;
    fn apply(&self, payload: Payload) -> Result<Payload, TransformError>;
}
