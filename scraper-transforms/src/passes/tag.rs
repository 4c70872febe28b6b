//! Tagging of matched elements

use std::collections::BTreeMap;

use serde::Deserialize;

use scraper_tree::walk::walk;
use scraper_tree::ElementRef;

use crate::editor::{self, Edits, TagPatch};
use crate::matching::{AncestorStep, ElementMatcher, MatchCriteria};
use crate::template::{RenderScope, Template};
use crate::variables::{compile_variables, evaluate, CompiledVariable, VariableSpec};
use crate::{Payload, Transform, TransformError};

/// Declarative tag update: templated values to add, keys to remove (`*`
/// clears all tags before the adds apply).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TagUpdateSpec {
    pub add: BTreeMap<String, Template>,
    pub remove: Vec<String>,
    pub ignore_errors: bool,
}

impl TagUpdateSpec {
    /// Render the update for one element. `Ok(None)` means the whole update
    /// is skipped because a placeholder failed and errors are ignored.
    pub fn render_patch(
        &self,
        scope: RenderScope<'_, '_>,
    ) -> Result<Option<TagPatch>, TransformError> {
        let mut add = BTreeMap::new();
        for (key, template) in &self.add {
            match template.render(scope) {
                Ok(value) => {
                    add.insert(key.clone(), value);
                }
                Err(_) if self.ignore_errors => return Ok(None),
                Err(err) => return Err(err.into()),
            }
        }
        Ok(Some(TagPatch {
            add,
            remove: self.remove.clone(),
        }))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagMatchingConfig {
    #[serde(default)]
    pub match_element: ElementMatcher,
    #[serde(default)]
    pub match_ancestor_list: Vec<AncestorStep>,
    #[serde(default)]
    pub match_descendent: Option<ElementMatcher>,
    #[serde(default)]
    pub variables: BTreeMap<String, VariableSpec>,
    pub tags: TagUpdateSpec,
}

/// For every element matched by the criteria: compute the declared
/// variables, then apply the tag update with template interpolation.
#[derive(Debug, Clone)]
pub struct TagMatching {
    criteria: MatchCriteria,
    variables: BTreeMap<String, CompiledVariable>,
    tags: TagUpdateSpec,
}

impl TagMatching {
    pub fn from_config(config: TagMatchingConfig) -> Result<Self, String> {
        Ok(Self {
            criteria: MatchCriteria {
                match_element: config.match_element,
                match_ancestor_list: config.match_ancestor_list,
                match_descendent: config.match_descendent,
            },
            variables: compile_variables(&config.variables)?,
            tags: config.tags,
        })
    }
}

impl Transform for TagMatching {
    fn kind(&self) -> &'static str {
        "tag_matching"
    }

    fn apply(&self, payload: Payload) -> Result<Payload, TransformError> {
        let doc = payload.expect_tree(self.kind())?;
        let mut edits = Edits::default();
        for visit in walk(ElementRef::Document(&doc)) {
            if !self
                .criteria
                .matches(visit.entry, &visit.ancestors, &doc.shared_data)?
            {
                continue;
            }
            let values = match evaluate(&self.variables, visit.entry, &visit.ancestors) {
                Ok(values) => values,
                Err(_) if self.tags.ignore_errors => continue,
                Err(err) => return Err(err.into()),
            };
            let elements = [visit.element()];
            let scope = RenderScope {
                elements: &elements,
                variables: &values,
            };
            if let Some(patch) = self.tags.render_patch(scope)? {
                edits.tags.insert(visit.path, patch);
            }
        }
        Ok(Payload::Tree(editor::apply(doc, &edits)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper_tree::{
        BlockElement, DocContent, Document, ElementKind, Paragraph, Section, Table,
    };

    fn pass(yaml: &str) -> TagMatching {
        TagMatching::from_config(serde_yaml::from_str(yaml).expect("config deserializes"))
            .expect("pass builds")
    }

    fn apply(pass: &TagMatching, doc: Document) -> Document {
        let Payload::Tree(doc) = pass.apply(Payload::Tree(doc)).expect("applies") else {
            panic!("expected tree payload");
        };
        doc
    }

    fn cell(text: &str) -> DocContent {
        DocContent::new(vec![BlockElement::Paragraph(Paragraph::from_text(text))])
    }

    #[test]
    fn tags_sections_with_normalized_headings() {
        let doc = Document::new(DocContent::new(vec![BlockElement::Section(Section::new(
            1,
            Some(Paragraph::heading(1, "Table Grid")),
            vec![BlockElement::Paragraph(Paragraph::from_text("body"))],
        ))]));
        let pass = pass(
            r#"
match_element:
  element_types: [Section]
variables:
  section:
    heading_only: true
    substitutions:
      - {regex: "\\s+", substitute: "_", operation: lower}
tags:
  add: {section: "{section}"}
"#,
        );
        let result = apply(&pass, doc);
        let section = result.content.elements[0].as_section().expect("section");
        assert_eq!(
            section.common.tags.get("section").map(String::as_str),
            Some("table_grid")
        );
    }

    #[test]
    fn element_at_tags_cells_with_header_texts() {
        let table = Table::from_rows(vec![
            vec![cell(""), cell("Name")],
            vec![cell("row1"), cell("First")],
        ])
        .expect("valid geometry");
        let doc = Document::new(DocContent::new(vec![BlockElement::Table(table)]));
        let pass = pass(
            r#"
match_element:
  element_types: [DocContent]
  start_row: 1
  start_col: 1
variables:
  col_head: {element_at: {row: first}}
  row_head: {element_at: {col: first}}
tags:
  add:
    col_key: "{col_head.text}"
    row_key: "{row_head.text}"
    content: "{0.text}"
"#,
        );
        let result = apply(&pass, doc);
        let table = result.content.elements[0].as_table().expect("table");
        let tagged = table.cell(1, 1).expect("cell");
        assert_eq!(
            tagged.common.tags.get("col_key").map(String::as_str),
            Some("Name")
        );
        assert_eq!(
            tagged.common.tags.get("row_key").map(String::as_str),
            Some("row1")
        );
        assert_eq!(
            tagged.common.tags.get("content").map(String::as_str),
            Some("First")
        );
        assert!(table.cell(0, 1).expect("header cell").common.tags.is_empty());
    }

    #[test]
    fn ignore_errors_leaves_failing_elements_untouched() {
        let doc = Document::new(DocContent::new(vec![BlockElement::Paragraph(
            Paragraph::from_text("no table here"),
        )]));
        let pass = pass(
            r#"
match_element:
  element_types: [Paragraph]
variables:
  neighbour: {element_at: {col: next}}
tags:
  ignore_errors: true
  add: {n: "{neighbour.text}"}
"#,
        );
        let result = apply(&pass, doc);
        let paragraph = result.content.elements[0].as_paragraph().expect("paragraph");
        assert!(paragraph.common.tags.is_empty());
    }

    #[test]
    fn variable_failures_are_fatal_without_ignore() {
        let doc = Document::new(DocContent::new(vec![BlockElement::Paragraph(
            Paragraph::from_text("no table here"),
        )]));
        let pass = pass(
            r#"
match_element:
  element_types: [Paragraph]
variables:
  neighbour: {element_at: {col: next}}
tags:
  add: {n: "{neighbour.text}"}
"#,
        );
        assert!(pass.apply(Payload::Tree(doc)).is_err());
    }

    #[test]
    fn star_remove_clears_existing_tags() {
        let mut paragraph = Paragraph::from_text("x");
        paragraph.common.tags.insert("old".to_string(), "1".to_string());
        let doc = Document::new(DocContent::new(vec![BlockElement::Paragraph(paragraph)]));
        let pass = pass(
            r#"
match_element:
  element_types: [Paragraph]
tags:
  remove: ["*"]
  add: {fresh: "1"}
"#,
        );
        let result = apply(&pass, doc);
        let paragraph = result.content.elements[0].as_paragraph().expect("paragraph");
        assert_eq!(paragraph.common.tags.len(), 1);
        assert!(paragraph.common.tags.contains_key("fresh"));
    }

    #[test]
    fn ancestor_scoped_tagging_marks_descendants() {
        let mut in_scope = Section::new(
            1,
            Some(Paragraph::heading(1, "A")),
            vec![BlockElement::Paragraph(Paragraph::from_text("inside"))],
        );
        in_scope
            .common
            .tags
            .insert("section".to_string(), "a".to_string());
        let out_of_scope = Section::new(
            1,
            Some(Paragraph::heading(1, "B")),
            vec![BlockElement::Paragraph(Paragraph::from_text("outside"))],
        );
        let doc = Document::new(DocContent::new(vec![
            BlockElement::Section(in_scope),
            BlockElement::Section(out_of_scope),
        ]));
        let pass = pass(
            r#"
match_ancestor_list:
  - {skip_ancestors: any}
  - {element_types: [Section], required_tag_sets: [{section: "a"}]}
  - {skip_ancestors: any}
tags:
  add: {in_scope: "Y"}
"#,
        );
        let result = apply(&pass, doc);
        let walked: Vec<(ElementKind, bool)> = walk(ElementRef::Document(&result))
            .map(|visit| {
                (
                    visit.element().kind(),
                    visit.element().tags().contains_key("in_scope"),
                )
            })
            .collect();
        let tagged: Vec<ElementKind> = walked
            .iter()
            .filter(|(_, tagged)| *tagged)
            .map(|(kind, _)| *kind)
            .collect();
        // Heading paragraph + run, content paragraph + run of section A only.
        assert_eq!(
            tagged,
            vec![
                ElementKind::Paragraph,
                ElementKind::TextRun,
                ElementKind::Paragraph,
                ElementKind::TextRun,
            ]
        );
    }
}
