//! Variable evaluation for tag interpolation
//!
//! A tagging transform declares named variables; each is computed per matched
//! element before the tag templates render. Four variants exist: related-cell
//! lookup (`element_at`), text aggregation plus regex substitution
//! (`substitutions`), embedded queries (`json_query`) and ancestor-path
//! templating (`ancestor_path`). Variable specs compile once per pass so
//! regexes and queries are never rebuilt per element.

use std::collections::BTreeMap;

use serde::Deserialize;

use scraper_query::Query;
use scraper_tree::elements::ElementRef;
use scraper_tree::project::project_element;
use scraper_tree::text::{aggregated_text, heading_text};
use scraper_tree::walk::Entry;

use crate::error::MatchError;
use crate::pattern::Pattern;
use crate::template::{RenderScope, Template, VarValue};

/// A declared variable, as it appears in configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VariableSpec {
    ElementAt {
        element_at: ElementAtSpec,
    },
    Substitutions {
        substitutions: Vec<SubstRule>,
        #[serde(default, alias = "section_heading_only")]
        heading_only: bool,
    },
    JsonQuery {
        json_query: String,
    },
    AncestorPath {
        ancestor_path: AncestorPathSpec,
    },
}

/// Related-cell lookup within the nearest enclosing table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ElementAtSpec {
    pub col: Option<Anchor>,
    pub row: Option<Anchor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    First,
    Last,
    Prev,
    Next,
}

/// A single regex substitution rule.
#[derive(Debug, Clone, Deserialize)]
pub struct SubstRule {
    pub regex: Pattern,
    pub substitute: String,
    #[serde(default)]
    pub operation: Operation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[default]
    Unchanged,
    Lower,
    Upper,
}

impl SubstRule {
    pub fn apply(&self, text: &str) -> String {
        let replacement = convert_backrefs(&self.substitute);
        let replaced = self
            .regex
            .regex()
            .replace_all(text, replacement.as_str())
            .into_owned();
        match self.operation {
            Operation::Unchanged => replaced,
            Operation::Lower => replaced.to_lowercase(),
            Operation::Upper => replaced.to_uppercase(),
        }
    }
}

/// Translate `\1`..`\9` backreferences into the `${N}` form the regex crate
/// expands, escaping any literal `$`.
fn convert_backrefs(substitute: &str) -> String {
    let mut out = String::with_capacity(substitute.len());
    let mut chars = substitute.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '$' => out.push_str("$$"),
            '\\' => match chars.peek() {
                Some(digit) if digit.is_ascii_digit() => {
                    out.push_str("${");
                    out.push(*digit);
                    out.push('}');
                    chars.next();
                }
                Some('\\') => {
                    out.push('\\');
                    chars.next();
                }
                _ => out.push('\\'),
            },
            c => out.push(c),
        }
    }
    out
}

/// Ancestor-path templating.
#[derive(Debug, Clone, Deserialize)]
pub struct AncestorPathSpec {
    pub level_value: Template,
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default)]
    pub level_start: usize,
    #[serde(default)]
    pub level_end: Option<usize>,
}

fn default_separator() -> String {
    "/".to_string()
}

/// A variable with its compiled state, owned by a pass for its lifetime.
#[derive(Debug, Clone)]
pub enum CompiledVariable {
    ElementAt(ElementAtSpec),
    Substitutions {
        rules: Vec<SubstRule>,
        heading_only: bool,
    },
    JsonQuery(Query),
    AncestorPath(AncestorPathSpec),
}

/// Compile declared variables; query compilation errors are config errors.
pub fn compile_variables(
    specs: &BTreeMap<String, VariableSpec>,
) -> Result<BTreeMap<String, CompiledVariable>, String> {
    let mut compiled = BTreeMap::new();
    for (name, spec) in specs {
        let variable = match spec {
            VariableSpec::ElementAt { element_at } => {
                CompiledVariable::ElementAt(element_at.clone())
            }
            VariableSpec::Substitutions {
                substitutions,
                heading_only,
            } => CompiledVariable::Substitutions {
                rules: substitutions.clone(),
                heading_only: *heading_only,
            },
            VariableSpec::JsonQuery { json_query } => CompiledVariable::JsonQuery(
                Query::new(json_query)
                    .map_err(|err| format!("variable {:?}: {}", name, err))?,
            ),
            VariableSpec::AncestorPath { ancestor_path } => {
                CompiledVariable::AncestorPath(ancestor_path.clone())
            }
        };
        compiled.insert(name.clone(), variable);
    }
    Ok(compiled)
}

/// Evaluate every declared variable for one matched element.
pub fn evaluate<'a>(
    variables: &BTreeMap<String, CompiledVariable>,
    entry: Entry<'a>,
    ancestors: &[Entry<'a>],
) -> Result<BTreeMap<String, VarValue<'a>>, MatchError> {
    let mut values = BTreeMap::new();
    for (name, variable) in variables {
        let value = evaluate_one(variable, entry, ancestors)
            .map_err(|reason| MatchError::Variable {
                name: name.clone(),
                reason,
            })?;
        values.insert(name.clone(), value);
    }
    Ok(values)
}

fn evaluate_one<'a>(
    variable: &CompiledVariable,
    entry: Entry<'a>,
    ancestors: &[Entry<'a>],
) -> Result<VarValue<'a>, String> {
    match variable {
        CompiledVariable::ElementAt(spec) => {
            let (row, col) = entry
                .table_pos
                .ok_or_else(|| "element is not inside a table".to_string())?;
            let table = ancestors
                .iter()
                .rev()
                .find_map(|entry| match entry.element {
                    ElementRef::Table(table) => Some(table),
                    _ => None,
                })
                .ok_or_else(|| "element is not inside a table".to_string())?;
            let row = resolve_anchor(spec.row, row, table.rows())?;
            let col = resolve_anchor(spec.col, col, table.cols())?;
            let cell = table
                .cell(row, col)
                .ok_or_else(|| format!("no cell at ({}, {})", row, col))?;
            Ok(VarValue::Element(ElementRef::DocContent(cell)))
        }
        CompiledVariable::Substitutions {
            rules,
            heading_only,
        } => {
            let base = if *heading_only {
                heading_base(entry, ancestors)?
            } else {
                aggregated_text(entry.element)
            };
            let mut text = base;
            for rule in rules {
                text = rule.apply(&text);
            }
            Ok(VarValue::Text(text))
        }
        CompiledVariable::JsonQuery(query) => {
            let projection = project_element(entry.element);
            let output = query
                .get_first(&projection)
                .map_err(|err| err.to_string())?
                .ok_or_else(|| "query produced no output".to_string())?;
            Ok(VarValue::Json(output))
        }
        CompiledVariable::AncestorPath(spec) => {
            let end = spec.level_end.unwrap_or(ancestors.len()).min(ancestors.len());
            let mut parts = Vec::new();
            let empty = BTreeMap::new();
            for ancestor in ancestors.iter().take(end).skip(spec.level_start) {
                let elements = [ancestor.element];
                let scope = RenderScope {
                    elements: &elements,
                    variables: &empty,
                };
                parts.push(
                    spec.level_value
                        .render(scope)
                        .map_err(|err| err.to_string())?,
                );
            }
            Ok(VarValue::Text(parts.join(&spec.separator)))
        }
    }
}

fn resolve_anchor(anchor: Option<Anchor>, current: usize, length: usize) -> Result<usize, String> {
    let target = match anchor {
        None => return Ok(current),
        Some(Anchor::First) => 0,
        Some(Anchor::Last) => length.checked_sub(1).ok_or("empty axis")?,
        Some(Anchor::Prev) => current
            .checked_sub(1)
            .ok_or("no previous cell before the first")?,
        Some(Anchor::Next) => current + 1,
    };
    if target >= length {
        return Err(format!("cell index {} outside of 0..{}", target, length));
    }
    Ok(target)
}

/// The base string for heading-only substitutions: the element's own heading
/// aggregation when it has one, otherwise the heading of the nearest
/// enclosing section.
fn heading_base(entry: Entry<'_>, ancestors: &[Entry<'_>]) -> Result<String, String> {
    if let Some(own) = heading_text(entry.element) {
        return Ok(own);
    }
    ancestors
        .iter()
        .rev()
        .find_map(|ancestor| match ancestor.element {
            ElementRef::Section(_) => heading_text(ancestor.element),
            _ => None,
        })
        .ok_or_else(|| "no enclosing section heading".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper_tree::walk::walk;
    use scraper_tree::{
        BlockElement, BulletItem, DocContent, Document, ElementKind, Paragraph, Section, Table,
    };

    fn cell(text: &str) -> DocContent {
        DocContent::new(vec![BlockElement::Paragraph(Paragraph::from_text(text))])
    }

    fn table_doc() -> Document {
        let table = Table::from_rows(vec![
            vec![cell("h0"), cell("h1"), cell("h2")],
            vec![cell("r1"), cell("v11"), cell("v12")],
        ])
        .expect("valid geometry");
        Document::new(DocContent::new(vec![BlockElement::Table(table)]))
    }

    fn variables_from_yaml(yaml: &str) -> BTreeMap<String, CompiledVariable> {
        let specs: BTreeMap<String, VariableSpec> =
            serde_yaml::from_str(yaml).expect("variable specs deserialize");
        compile_variables(&specs).expect("variables compile")
    }

    fn text_of(value: &VarValue<'_>) -> String {
        match value {
            VarValue::Text(text) => text.clone(),
            VarValue::Element(element) => aggregated_text(*element),
            VarValue::Json(json) => json.to_string(),
        }
    }

    #[test]
    fn element_at_resolves_edges_and_neighbours() {
        let doc = table_doc();
        let variables = variables_from_yaml(
            r#"
col_head: {element_at: {row: first}}
row_head: {element_at: {col: first}}
left: {element_at: {col: prev}}
"#,
        );
        let visit = walk(ElementRef::Document(&doc))
            .find(|visit| visit.entry.table_pos == Some((1, 2))
                && visit.element().kind() == ElementKind::DocContent)
            .expect("cell (1,2)");
        let values = evaluate(&variables, visit.entry, &visit.ancestors).expect("evaluates");
        assert_eq!(text_of(&values["col_head"]), "h2");
        assert_eq!(text_of(&values["row_head"]), "r1");
        assert_eq!(text_of(&values["left"]), "v11");
    }

    #[test]
    fn element_at_fails_off_the_edge() {
        let doc = table_doc();
        let variables = variables_from_yaml("up: {element_at: {row: prev}}");
        let visit = walk(ElementRef::Document(&doc))
            .find(|visit| visit.entry.table_pos == Some((0, 0))
                && visit.element().kind() == ElementKind::DocContent)
            .expect("cell (0,0)");
        assert!(matches!(
            evaluate(&variables, visit.entry, &visit.ancestors),
            Err(MatchError::Variable { .. })
        ));
    }

    #[test]
    fn substitutions_normalize_section_headings() {
        let section = Section::new(
            1,
            Some(Paragraph::heading(1, "Table Grid")),
            vec![BlockElement::Paragraph(Paragraph::from_text("body"))],
        );
        let doc = Document::new(DocContent::new(vec![BlockElement::Section(section)]));
        let variables = variables_from_yaml(
            r#"
section:
  heading_only: true
  substitutions:
    - {regex: "\\s+", substitute: "_", operation: lower}
"#,
        );
        let visit = walk(ElementRef::Document(&doc))
            .find(|visit| visit.element().kind() == ElementKind::Section)
            .expect("section");
        let values = evaluate(&variables, visit.entry, &visit.ancestors).expect("evaluates");
        assert_eq!(text_of(&values["section"]), "table_grid");
    }

    #[test]
    fn heading_only_on_a_bullet_uses_its_own_prefix() {
        let mut bullet = BulletItem::from_text(0, "Name: First entry");
        bullet.nested.push(BulletItem::from_text(1, "Field1: v1"));
        let doc = Document::new(DocContent::new(vec![BlockElement::BulletItem(bullet)]));
        let variables = variables_from_yaml(
            r#"
label:
  heading_only: true
  substitutions:
    - {regex: "^\\s*([^:]+):.*$", substitute: "\\1", operation: lower}
value:
  heading_only: true
  substitutions:
    - {regex: "^\\s*[^:]+:\\s*", substitute: ""}
"#,
        );
        let visit = walk(ElementRef::Document(&doc))
            .find(|visit| visit.element().kind() == ElementKind::BulletItem)
            .expect("bullet");
        let values = evaluate(&variables, visit.entry, &visit.ancestors).expect("evaluates");
        assert_eq!(text_of(&values["label"]), "name");
        assert_eq!(text_of(&values["value"]), "First entry");
    }

    #[test]
    fn leaf_heading_only_falls_back_to_enclosing_section() {
        let section = Section::new(
            1,
            Some(Paragraph::heading(1, "Owner")),
            vec![BlockElement::Paragraph(Paragraph::from_text("content"))],
        );
        let doc = Document::new(DocContent::new(vec![BlockElement::Section(section)]));
        let variables = variables_from_yaml(
            r#"
where:
  heading_only: true
  substitutions: []
"#,
        );
        let visit = walk(ElementRef::Document(&doc))
            .find(|visit| visit.element().kind() == ElementKind::TextRun
                && aggregated_text(visit.element()) == "content")
            .expect("content run");
        let values = evaluate(&variables, visit.entry, &visit.ancestors).expect("evaluates");
        assert_eq!(text_of(&values["where"]), "Owner");
    }

    #[test]
    fn json_query_runs_on_the_subtree_projection() {
        let doc = table_doc();
        let variables = variables_from_yaml(
            r#"kind: {json_query: ".type"}"#,
        );
        let visit = walk(ElementRef::Document(&doc))
            .find(|visit| visit.element().kind() == ElementKind::Table)
            .expect("table");
        let values = evaluate(&variables, visit.entry, &visit.ancestors).expect("evaluates");
        assert!(matches!(&values["kind"], VarValue::Json(v) if v == "Table"));
    }

    #[test]
    fn ancestor_path_joins_rendered_levels() {
        let inner = Section::new(
            2,
            Some(Paragraph::heading(2, "Inner")),
            vec![BlockElement::Paragraph(Paragraph::from_text("x"))],
        );
        let outer = Section::new(
            1,
            Some(Paragraph::heading(1, "Outer")),
            vec![BlockElement::Section(inner)],
        );
        let doc = Document::new(DocContent::new(vec![BlockElement::Section(outer)]));
        let variables = variables_from_yaml(
            r#"
trail:
  ancestor_path:
    level_value: "{0}"
    separator: ">"
    level_start: 2
"#,
        );
        let visit = walk(ElementRef::Document(&doc))
            .find(|visit| visit.element().kind() == ElementKind::TextRun
                && aggregated_text(visit.element()) == "x")
            .expect("deep run");
        let values = evaluate(&variables, visit.entry, &visit.ancestors).expect("evaluates");
        // Ancestors: Document, DocContent, outer Section, inner Section, Paragraph.
        assert_eq!(text_of(&values["trail"]), "OuterInnerx>Innerx>x");
    }

    #[test]
    fn backref_conversion() {
        assert_eq!(convert_backrefs(r"\1-\2"), "${1}-${2}");
        assert_eq!(convert_backrefs(r"a$b"), "a$$b");
        assert_eq!(convert_backrefs(r"\\1"), r"\1");
    }

    #[test]
    fn substitution_operations_apply_to_the_result() {
        let rule = SubstRule {
            regex: Pattern::new(r"\s+").expect("compiles"),
            substitute: "_".to_string(),
            operation: Operation::Lower,
        };
        assert_eq!(rule.apply("Table Grid"), "table_grid");
    }
}
