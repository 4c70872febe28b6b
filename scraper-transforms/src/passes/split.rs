//! Splitting text-bearing leaves on a regex

use serde::Deserialize;

use scraper_tree::elements::InlineElement;
use scraper_tree::walk::walk;
use scraper_tree::ElementRef;

use crate::editor::{self, Edits};
use crate::matching::MatchCriteria;
use crate::passes::tag::TagUpdateSpec;
use crate::pattern::Pattern;
use crate::template::RenderScope;
use crate::{Payload, Transform, TransformError};

#[derive(Debug, Clone, Deserialize)]
pub struct SplitTextConfig {
    #[serde(rename = "match", default)]
    pub criteria: MatchCriteria,
    pub text_regex: Pattern,
    #[serde(default)]
    pub element_tags: Vec<TagUpdateSpec>,
    #[serde(default)]
    pub all_tags: Option<TagUpdateSpec>,
    #[serde(default = "default_allow_no_matches")]
    pub allow_no_matches: bool,
}

fn default_allow_no_matches() -> bool {
    true
}

/// Replaces each matched text-bearing element by one new element per piece
/// the regex produced: one per capture group of every match, or one per full
/// match when the regex has no groups. `element_tags` assigns updates to the
/// first pieces positionally; `all_tags` applies to every piece.
#[derive(Debug, Clone)]
pub struct SplitText {
    config: SplitTextConfig,
}

impl SplitText {
    pub fn from_config(config: SplitTextConfig) -> Self {
        Self { config }
    }

    fn pieces(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        for captures in self.config.text_regex.regex().captures_iter(text) {
            if captures.len() > 1 {
                for group in 1..captures.len() {
                    if let Some(capture) = captures.get(group) {
                        pieces.push(capture.as_str().to_string());
                    }
                }
            } else if let Some(whole) = captures.get(0) {
                pieces.push(whole.as_str().to_string());
            }
        }
        pieces
    }
}

impl Transform for SplitText {
    fn kind(&self) -> &'static str {
        "split_text"
    }

    fn apply(&self, payload: Payload) -> Result<Payload, TransformError> {
        let doc = payload.expect_tree(self.kind())?;
        let mut edits = Edits::default();
        for visit in walk(ElementRef::Document(&doc)) {
            let Some(text) = visit.element().own_text() else {
                continue;
            };
            if !self
                .config
                .criteria
                .matches(visit.entry, &visit.ancestors, &doc.shared_data)?
            {
                continue;
            }
            let pieces = self.pieces(text);
            if pieces.is_empty() {
                if self.config.allow_no_matches {
                    continue;
                }
                return Err(TransformError::pass(
                    self.kind(),
                    format!("no match for {:?} in {:?}", self.config.text_regex, text),
                ));
            }
            let mut replacements = Vec::with_capacity(pieces.len());
            for (index, piece) in pieces.into_iter().enumerate() {
                let mut element = match visit.element() {
                    ElementRef::TextRun(run) => InlineElement::TextRun(run.clone()),
                    ElementRef::Chips(chips) => InlineElement::Chips(chips.clone()),
                    _ => continue,
                };
                element.set_text(piece);
                apply_update(&mut element, self.config.element_tags.get(index))?;
                apply_update(&mut element, self.config.all_tags.as_ref())?;
                replacements.push(element);
            }
            edits.splits.insert(visit.path, replacements);
        }
        Ok(Payload::Tree(editor::apply(doc, &edits)))
    }
}

fn apply_update(
    element: &mut InlineElement,
    update: Option<&TagUpdateSpec>,
) -> Result<(), TransformError> {
    let Some(update) = update else {
        return Ok(());
    };
    let variables = Default::default();
    let elements = [element.as_ref()];
    let scope = RenderScope {
        elements: &elements,
        variables: &variables,
    };
    let patch = update.render_patch(scope)?;
    if let Some(patch) = patch {
        patch.apply(&mut element.common_mut().tags);
    }
    Ok(())
}
