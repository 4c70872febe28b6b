//! Regex substitution on leaf text

use serde::Deserialize;

use scraper_tree::walk::walk;
use scraper_tree::ElementRef;

use crate::editor::{self, Edits};
use crate::matching::MatchCriteria;
use crate::variables::SubstRule;
use crate::{Payload, Transform, TransformError};

#[derive(Debug, Clone, Deserialize)]
pub struct RegexReplaceConfig {
    #[serde(rename = "match", default)]
    pub criteria: MatchCriteria,
    pub substitutions: Vec<SubstRule>,
}

/// Applies the substitution rules, in order, to the `text` of every matched
/// text run or chip. Structure and sibling order are untouched.
#[derive(Debug, Clone)]
pub struct RegexReplace {
    criteria: MatchCriteria,
    substitutions: Vec<SubstRule>,
}

impl RegexReplace {
    pub fn from_config(config: RegexReplaceConfig) -> Self {
        Self {
            criteria: config.criteria,
            substitutions: config.substitutions,
        }
    }
}

impl Transform for RegexReplace {
    fn kind(&self) -> &'static str {
        "regex_replace"
    }

    fn apply(&self, payload: Payload) -> Result<Payload, TransformError> {
        let doc = payload.expect_tree(self.kind())?;
        let mut edits = Edits::default();
        for visit in walk(ElementRef::Document(&doc)) {
            if !visit.element().kind().is_paragraph_element() {
                continue;
            }
            let Some(text) = visit.element().own_text() else {
                continue;
            };
            if !self
                .criteria
                .matches(visit.entry, &visit.ancestors, &doc.shared_data)?
            {
                continue;
            }
            let mut replaced = text.to_string();
            for rule in &self.substitutions {
                replaced = rule.apply(&replaced);
            }
            if replaced != text {
                edits.texts.insert(visit.path, replaced);
            }
        }
        Ok(Payload::Tree(editor::apply(doc, &edits)))
    }
}
