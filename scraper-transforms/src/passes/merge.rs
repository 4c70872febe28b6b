//! Coalescing of adjacent matched inline elements

use serde::Deserialize;

use scraper_tree::elements::{InlineElement, TextRun};
use scraper_tree::walk::{walk, Entry};
use scraper_tree::{ElementRef, SharedData};

use crate::editor::{self, Edits};
use crate::matching::ElementMatcher;
use crate::{Payload, Transform, TransformError};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MergeByTagConfig {
    pub match_element: ElementMatcher,
    pub merge_as_text_run: bool,
}

/// Within each paragraph or bullet item, coalesces adjacent inline elements
/// that both satisfy the predicate; `element_expressions` see the candidate
/// pair as subjects 0 and 1. Merging chains left to right.
#[derive(Debug, Clone)]
pub struct MergeByTag {
    config: MergeByTagConfig,
}

impl MergeByTag {
    pub fn from_config(config: MergeByTagConfig) -> Self {
        Self { config }
    }

    fn merge_list(
        &self,
        inlines: &[InlineElement],
        parent: Entry<'_>,
        ancestors: &[Entry<'_>],
        shared: &SharedData,
    ) -> Result<Option<Vec<InlineElement>>, TransformError> {
        let mut chain = ancestors.to_vec();
        chain.push(parent);
        let mut result: Vec<InlineElement> = Vec::new();
        let mut last = inlines[0].clone();
        let mut changed = false;
        for next in &inlines[1..] {
            if self.can_merge(&last, next, parent, &chain, shared)? {
                last = self.merged(&last, next);
                changed = true;
            } else {
                result.push(last);
                last = next.clone();
            }
        }
        result.push(last);
        Ok(changed.then_some(result))
    }

    fn can_merge(
        &self,
        first: &InlineElement,
        second: &InlineElement,
        parent: Entry<'_>,
        chain: &[Entry<'_>],
        shared: &SharedData,
    ) -> Result<bool, TransformError> {
        // Link-like elements with different targets never merge.
        if let (Some(first_url), Some(second_url)) = (first.url(), second.url()) {
            if first_url != second_url {
                return Ok(false);
            }
        }
        let first_entry = Entry {
            element: first.as_ref(),
            table_pos: parent.table_pos,
            index: 0,
            count: 2,
        };
        let second_entry = Entry {
            element: second.as_ref(),
            table_pos: parent.table_pos,
            index: 1,
            count: 2,
        };
        self.config
            .match_element
            .matches_pair(first_entry, second_entry, chain, shared)
            .map_err(Into::into)
    }

    fn merged(&self, first: &InlineElement, second: &InlineElement) -> InlineElement {
        let text = format!("{}{}", first.text(), second.text());
        if self.config.merge_as_text_run {
            let mut run = TextRun::new(text).with_common(first.common().clone());
            run.url = first.url().map(str::to_string);
            return InlineElement::TextRun(run);
        }
        match (first, second) {
            (InlineElement::Chips(first), InlineElement::Chips(_)) => {
                let mut chips = first.clone();
                chips.text = text;
                InlineElement::Chips(chips)
            }
            _ => {
                let mut run = TextRun::new(text).with_common(first.common().clone());
                run.url = first.url().map(str::to_string);
                InlineElement::TextRun(run)
            }
        }
    }
}

impl Transform for MergeByTag {
    fn kind(&self) -> &'static str {
        "merge_by_tag"
    }

    fn apply(&self, payload: Payload) -> Result<Payload, TransformError> {
        let doc = payload.expect_tree(self.kind())?;
        let mut edits = Edits::default();
        for visit in walk(ElementRef::Document(&doc)) {
            let inlines = match visit.element() {
                ElementRef::Paragraph(paragraph) => &paragraph.elements,
                ElementRef::BulletItem(item) => &item.elements,
                _ => continue,
            };
            if inlines.len() < 2 {
                continue;
            }
            if let Some(merged) = self.merge_list(
                inlines,
                visit.entry,
                &visit.ancestors,
                &doc.shared_data,
            )? {
                edits.inline_lists.insert(visit.path, merged);
            }
        }
        Ok(Payload::Tree(editor::apply(doc, &edits)))
    }
}
