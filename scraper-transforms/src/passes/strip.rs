//! Removal of unwanted attributes and styles

use serde::Deserialize;

use scraper_tree::elements::Common;

use crate::editor::for_each_common;
use crate::pattern::Pattern;
use crate::{Payload, Transform, TransformError};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StripElementsConfig {
    pub remove_attrs_re: Option<Vec<Pattern>>,
    pub remove_styles_re: Option<Vec<Pattern>>,
    pub remove_style_rules_re: Option<Vec<Pattern>>,
}

/// Removes keys whose names match any of the configured regexes from every
/// element's `attribs` and `style`, and from the document's shared style
/// rules. Defaults cover the presentation noise that never helps matching.
#[derive(Debug, Clone)]
pub struct StripElements {
    attrs: Vec<Pattern>,
    styles: Vec<Pattern>,
    style_rules: Vec<Pattern>,
}

const DEFAULT_ATTRS: &[&str] = &["style"];
const DEFAULT_STYLES: &[&str] = &[
    "padding.*",
    "font-family",
    "line-height",
    "orphans",
    "page-break-after",
    "widows",
    "vertical-align",
    "margin.*",
    "text-align",
];

impl StripElements {
    pub fn from_config(config: StripElementsConfig) -> Result<Self, String> {
        Ok(Self {
            attrs: match config.remove_attrs_re {
                Some(patterns) => patterns,
                None => compile_defaults(DEFAULT_ATTRS)?,
            },
            styles: match config.remove_styles_re {
                Some(patterns) => patterns,
                None => compile_defaults(DEFAULT_STYLES)?,
            },
            style_rules: config.remove_style_rules_re.unwrap_or_default(),
        })
    }
}

fn compile_defaults(sources: &[&str]) -> Result<Vec<Pattern>, String> {
    sources
        .iter()
        .map(|source| Pattern::new(source).map_err(|err| err.to_string()))
        .collect()
}

fn matches_any(patterns: &[Pattern], key: &str) -> bool {
    patterns.iter().any(|pattern| pattern.full_match(key))
}

impl Transform for StripElements {
    fn kind(&self) -> &'static str {
        "strip_elements"
    }

    fn apply(&self, payload: Payload) -> Result<Payload, TransformError> {
        let mut doc = payload.expect_tree(self.kind())?;
        let mut strip = |common: &mut Common| {
            common.attribs.retain(|key, _| !matches_any(&self.attrs, key));
            common.style.retain(|key, _| !matches_any(&self.styles, key));
        };
        for_each_common(&mut doc, &mut strip);
        doc.shared_data
            .style_rules
            .retain(|key, _| !matches_any(&self.style_rules, key));
        Ok(Payload::Tree(doc))
    }
}
