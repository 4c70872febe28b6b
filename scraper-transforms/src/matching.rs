//! Element matching
//!
//! A match specification is a record of optional predicates over an element's
//! variant, tags, styles, aggregated text, interpolated expressions and table
//! position; omitted fields are wildcards. `MatchCriteria` bundles the
//! element predicate with an ancestor-path alignment and an any-descendant
//! predicate. Evaluation is side-effect free.

use std::collections::BTreeMap;

use serde::Deserialize;

use scraper_tree::elements::{ElementKind, ElementRef};
use scraper_tree::text::aggregated_text;
use scraper_tree::walk::{walk, Entry};
use scraper_tree::SharedData;

use crate::error::MatchError;
use crate::pattern::Pattern;
use crate::template::{RenderScope, Template};

/// A type name accepted by `element_types`: a concrete variant or the
/// abstract `ParagraphElement` covering the inline leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    Kind(ElementKind),
    ParagraphElement,
}

impl TypeName {
    pub fn matches(self, kind: ElementKind) -> bool {
        match self {
            TypeName::ParagraphElement => kind.is_paragraph_element(),
            TypeName::Kind(named) => named == kind,
        }
    }
}

impl<'de> Deserialize<'de> for TypeName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        if name == "ParagraphElement" {
            return Ok(TypeName::ParagraphElement);
        }
        ElementKind::from_name(&name)
            .map(TypeName::Kind)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown element type {:?}", name)))
    }
}

/// Tag rejection: the documented map form, or the bare-list compatibility
/// shim where a listed key being present rejects the element.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RejectedTags {
    Keys(Vec<String>),
    Map(BTreeMap<String, Pattern>),
}

impl Default for RejectedTags {
    fn default() -> Self {
        RejectedTags::Map(BTreeMap::new())
    }
}

impl RejectedTags {
    fn rejects(&self, tags: &BTreeMap<String, String>) -> bool {
        match self {
            RejectedTags::Keys(keys) => keys.iter().any(|key| tags.contains_key(key)),
            RejectedTags::Map(map) => match_any(map, tags),
        }
    }
}

/// An interpolated expression matched against a regex.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpressionMatch {
    pub expr: Template,
    pub regex_match: Pattern,
    #[serde(default)]
    pub ignore_key_errors: bool,
}

impl ExpressionMatch {
    fn matches(&self, subjects: &[ElementRef<'_>]) -> Result<bool, MatchError> {
        let variables = BTreeMap::new();
        let scope = RenderScope {
            elements: subjects,
            variables: &variables,
        };
        match self.expr.render(scope) {
            Ok(rendered) => Ok(self.regex_match.full_match(&rendered)),
            Err(_) if self.ignore_key_errors => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// The primary element predicate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ElementMatcher {
    pub element_types: Option<Vec<TypeName>>,
    pub required_tag_sets: Vec<BTreeMap<String, Pattern>>,
    pub rejected_tags: RejectedTags,
    pub required_style_sets: Vec<BTreeMap<String, Pattern>>,
    pub rejected_styles: BTreeMap<String, Pattern>,
    pub skip_style_quotes: Option<bool>,
    pub aggregated_text_regex: Option<Pattern>,
    pub element_expressions: Vec<ExpressionMatch>,
    pub start_col: Option<i64>,
    pub end_col: Option<i64>,
    pub start_row: Option<i64>,
    pub end_row: Option<i64>,
}

impl ElementMatcher {
    /// Full predicate, with the element itself as expression subject 0.
    pub fn matches(
        &self,
        entry: Entry<'_>,
        ancestors: &[Entry<'_>],
        shared: &SharedData,
    ) -> Result<bool, MatchError> {
        if !self.basic_matches(entry, ancestors, shared)? {
            return Ok(false);
        }
        self.expressions_match(&[entry.element])
    }

    /// Pairwise predicate used by `merge_by_tag`: both elements must satisfy
    /// the non-expression predicates, and expressions see the pair as
    /// subjects 0 and 1.
    pub fn matches_pair(
        &self,
        first: Entry<'_>,
        second: Entry<'_>,
        ancestors: &[Entry<'_>],
        shared: &SharedData,
    ) -> Result<bool, MatchError> {
        if !self.basic_matches(first, ancestors, shared)?
            || !self.basic_matches(second, ancestors, shared)?
        {
            return Ok(false);
        }
        self.expressions_match(&[first.element, second.element])
    }

    /// Everything except `element_expressions`.
    fn basic_matches(
        &self,
        entry: Entry<'_>,
        ancestors: &[Entry<'_>],
        shared: &SharedData,
    ) -> Result<bool, MatchError> {
        if let Some(types) = &self.element_types {
            let kind = entry.element.kind();
            if !types.iter().any(|name| name.matches(kind)) {
                return Ok(false);
            }
        }

        if !self.position_matches(entry, ancestors) {
            return Ok(false);
        }

        let tags = entry.element.tags();
        if self.rejected_tags.rejects(tags) {
            return Ok(false);
        }
        if !self.required_tag_sets.is_empty()
            && !self.required_tag_sets.iter().any(|set| match_all(set, tags))
        {
            return Ok(false);
        }

        let style = effective_style(
            entry.element,
            shared,
            self.skip_style_quotes.unwrap_or(true),
        );
        if match_any(&self.rejected_styles, &style) {
            return Ok(false);
        }
        if !self.required_style_sets.is_empty()
            && !self
                .required_style_sets
                .iter()
                .any(|set| match_all(set, &style))
        {
            return Ok(false);
        }

        if let Some(regex) = &self.aggregated_text_regex {
            if !regex.full_match(&aggregated_text(entry.element)) {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn expressions_match(&self, subjects: &[ElementRef<'_>]) -> Result<bool, MatchError> {
        for expression in &self.element_expressions {
            if !expression.matches(subjects)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn position_matches(&self, entry: Entry<'_>, ancestors: &[Entry<'_>]) -> bool {
        if self.start_col.is_none()
            && self.end_col.is_none()
            && self.start_row.is_none()
            && self.end_row.is_none()
        {
            return true;
        }
        let Some((row, col)) = entry.table_pos else {
            return false;
        };
        let Some(table) = ancestors.iter().rev().find_map(|entry| match entry.element {
            ElementRef::Table(table) => Some(table),
            _ => None,
        }) else {
            return false;
        };
        in_range(row, self.start_row, self.end_row, table.rows())
            && in_range(col, self.start_col, self.end_col, table.cols())
    }
}

/// Range check with Python slice conventions: negative bounds count from the
/// end, start inclusive, end exclusive, `None` unbounded.
pub fn in_range(coord: usize, start: Option<i64>, end: Option<i64>, length: usize) -> bool {
    if length == 0 {
        return false;
    }
    let length = length as i64;
    let mut start = start.unwrap_or(0);
    if start < 0 {
        start += length;
    }
    let mut end = end.unwrap_or(length);
    if end < 0 {
        end += length;
    }
    if end <= start {
        return false;
    }
    let coord = coord as i64;
    coord >= start && coord < end
}

fn match_all(set: &BTreeMap<String, Pattern>, map: &BTreeMap<String, String>) -> bool {
    set.iter().all(|(key, pattern)| {
        map.get(key)
            .map(|value| pattern.full_match(value))
            .unwrap_or(false)
    })
}

fn match_any(set: &BTreeMap<String, Pattern>, map: &BTreeMap<String, String>) -> bool {
    set.iter().any(|(key, pattern)| {
        map.get(key)
            .map(|value| pattern.full_match(value))
            .unwrap_or(false)
    })
}

/// The element's style, extended with shared style rules selected by its
/// `class` attribute tokens. The element's own entries win.
fn effective_style(
    element: ElementRef<'_>,
    shared: &SharedData,
    skip_quotes: bool,
) -> BTreeMap<String, String> {
    let mut style = BTreeMap::new();
    if let Some(classes) = element.attribs().get("class") {
        for token in classes.split_whitespace() {
            for key in [token.to_string(), format!(".{}", token)] {
                if let Some(rule) = shared.style_rules.get(&key) {
                    for (name, value) in rule {
                        style.insert(name.clone(), value.clone());
                    }
                }
            }
        }
    }
    for (name, value) in element.style() {
        style.insert(name.clone(), value.clone());
    }
    style
        .into_iter()
        .map(|(name, value)| (name, cleanup_style(&value, skip_quotes)))
        .collect()
}

fn cleanup_style(value: &str, skip_quotes: bool) -> String {
    let trimmed = value.trim();
    if skip_quotes {
        trimmed
            .trim_matches(|c| c == '"' || c == '\'')
            .trim()
            .to_string()
    } else {
        trimmed.to_string()
    }
}

/// One step of an ancestor-path alignment.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AncestorStep {
    Skip {
        skip_ancestors: SkipMode,
        #[serde(default = "default_skip_count")]
        skip_count: usize,
    },
    Match(Box<ElementMatcher>),
}

fn default_skip_count() -> usize {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipMode {
    Exactly,
    AtLeast,
    Any,
}

/// The full criteria bundle: element, ancestor path and descendant.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MatchCriteria {
    pub match_element: ElementMatcher,
    pub match_ancestor_list: Vec<AncestorStep>,
    pub match_descendent: Option<ElementMatcher>,
}

impl MatchCriteria {
    pub fn matches(
        &self,
        entry: Entry<'_>,
        ancestors: &[Entry<'_>],
        shared: &SharedData,
    ) -> Result<bool, MatchError> {
        if !self.match_ancestor_list.is_empty()
            && !align(&self.match_ancestor_list, ancestors, 0, 0, shared)?
        {
            return Ok(false);
        }
        if let Some(descendent) = &self.match_descendent {
            if !descendent_matches(descendent, entry.element, shared)? {
                return Ok(false);
            }
        }
        self.match_element.matches(entry, ancestors, shared)
    }
}

/// Align steps against the ancestor path, consuming it entirely. Predicates
/// consume one ancestor, skip steps a mode-dependent count; success on any
/// alignment.
fn align(
    steps: &[AncestorStep],
    ancestors: &[Entry<'_>],
    step_idx: usize,
    ancestor_idx: usize,
    shared: &SharedData,
) -> Result<bool, MatchError> {
    let Some(step) = steps.get(step_idx) else {
        return Ok(ancestor_idx == ancestors.len());
    };
    match step {
        AncestorStep::Skip {
            skip_ancestors: SkipMode::Exactly,
            skip_count,
        } => {
            if ancestor_idx + skip_count > ancestors.len() {
                return Ok(false);
            }
            align(steps, ancestors, step_idx + 1, ancestor_idx + skip_count, shared)
        }
        AncestorStep::Skip {
            skip_ancestors: SkipMode::AtLeast,
            skip_count,
        } => {
            for consumed in (ancestor_idx + skip_count)..=ancestors.len() {
                if align(steps, ancestors, step_idx + 1, consumed, shared)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        AncestorStep::Skip {
            skip_ancestors: SkipMode::Any,
            ..
        } => {
            for consumed in ancestor_idx..=ancestors.len() {
                if align(steps, ancestors, step_idx + 1, consumed, shared)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        AncestorStep::Match(matcher) => {
            let Some(entry) = ancestors.get(ancestor_idx) else {
                return Ok(false);
            };
            if !matcher.matches(*entry, &ancestors[..ancestor_idx], shared)? {
                return Ok(false);
            }
            align(steps, ancestors, step_idx + 1, ancestor_idx + 1, shared)
        }
    }
}

fn descendent_matches(
    matcher: &ElementMatcher,
    element: ElementRef<'_>,
    shared: &SharedData,
) -> Result<bool, MatchError> {
    for visit in walk(element).skip(1) {
        if matcher.matches(visit.entry, &visit.ancestors, shared)? {
            return Ok(true);
        }
    }
    Ok(false)
}
