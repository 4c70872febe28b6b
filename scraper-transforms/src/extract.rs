//! The extraction stage
//!
//! Converts the final tree into structured output by evaluating a nested
//! query specification: `extract_all` yields candidate items, filters drop
//! non-matches silently, validators drop with a logged warning, nested specs
//! compute per-item values bound as `$name` in the render query, and the
//! rendered values are collected (or just the first, with
//! `first_item_only`).

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use serde_json::Value;

use scraper_query::{Filter, Query};

use crate::{Payload, Transform, TransformError};

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractSpec {
    #[serde(default)]
    pub preamble: String,
    pub extract_all: String,
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default)]
    pub validators: Vec<String>,
    #[serde(default)]
    pub first_item_only: bool,
    #[serde(default = "default_render")]
    pub render: String,
    #[serde(default)]
    pub nested: BTreeMap<String, ExtractSpec>,
}

fn default_render() -> String {
    ".".to_string()
}

/// An extraction spec with its queries compiled.
#[derive(Debug, Clone)]
pub struct CompiledExtract {
    extract_all: Query,
    filters: Filter,
    validators: Filter,
    render: Query,
    first_item_only: bool,
    nested: BTreeMap<String, CompiledExtract>,
}

impl CompiledExtract {
    pub fn compile(spec: &ExtractSpec) -> Result<Self, String> {
        let with_preamble = |query: &str| format!("{}\n{}", spec.preamble, query);
        let mut nested = BTreeMap::new();
        for (name, nested_spec) in &spec.nested {
            nested.insert(
                name.clone(),
                CompiledExtract::compile(nested_spec)
                    .map_err(|err| format!("nested {:?}: {}", name, err))?,
            );
        }
        Ok(Self {
            extract_all: Query::new(&with_preamble(&spec.extract_all))
                .map_err(|err| err.to_string())?,
            filters: Filter::new(spec.filters.iter().map(|f| with_preamble(f)))
                .map_err(|err| err.to_string())?,
            validators: Filter::new(spec.validators.iter().map(|v| with_preamble(v)))
                .map_err(|err| err.to_string())?,
            render: Query::new(&with_preamble(&spec.render)).map_err(|err| err.to_string())?,
            first_item_only: spec.first_item_only,
            nested,
        })
    }

    /// Evaluate against one parent item.
    pub fn transform(&self, input: &Value) -> Result<Value, TransformError> {
        let candidates = self.extract_all.get_all(input)?;
        let candidates = self.filters.retain(candidates)?;
        let mut rendered = Vec::new();
        for item in candidates {
            let failed = self.validators.unmatched(&item)?;
            if !failed.is_empty() {
                for program in failed {
                    log::warn!(
                        "extracted item failed validator {:?}: {}",
                        program,
                        item
                    );
                }
                continue;
            }
            let mut bindings = HashMap::new();
            for (name, nested) in &self.nested {
                bindings.insert(name.clone(), nested.transform(&item)?);
            }
            let mut render = self.render.clone();
            render.set_vars(bindings);
            match render.get_first(&item)? {
                Some(value) => rendered.push(value),
                None => {
                    log::warn!("render query produced no output for item: {}", item);
                    rendered.push(Value::Null);
                }
            }
        }
        if self.first_item_only {
            Ok(rendered.into_iter().next().unwrap_or(Value::Null))
        } else {
            Ok(Value::Array(rendered))
        }
    }
}

/// The `extract_json` transformation: projects the document tree and
/// replaces the pipeline payload with the extracted JSON.
#[derive(Debug, Clone)]
pub struct ExtractJson {
    extract: CompiledExtract,
}

impl ExtractJson {
    pub fn from_config(spec: ExtractSpec) -> Result<Self, String> {
        Ok(Self {
            extract: CompiledExtract::compile(&spec)?,
        })
    }
}

impl Transform for ExtractJson {
    fn kind(&self) -> &'static str {
        "extract_json"
    }

    fn apply(&self, payload: Payload) -> Result<Payload, TransformError> {
        let input = payload.to_output_json();
        Ok(Payload::Json(self.extract.transform(&input)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compiled(yaml: &str) -> CompiledExtract {
        let spec: ExtractSpec = serde_yaml::from_str(yaml).expect("spec deserializes");
        CompiledExtract::compile(&spec).expect("spec compiles")
    }

    #[test]
    fn extracts_filters_and_renders() {
        let extract = compiled(
            r#"
extract_all: ".[]"
filters:
  - ".keep"
render: "{out: .name}"
"#,
        );
        let input = json!([
            {"name": "a", "keep": true},
            {"name": "b", "keep": false},
            {"name": "c", "keep": true}
        ]);
        assert_eq!(
            extract.transform(&input).expect("transforms"),
            json!([{"out": "a"}, {"out": "c"}])
        );
    }

    #[test]
    fn validators_drop_with_warning_but_do_not_fail() {
        let extract = compiled(
            r#"
extract_all: ".[]"
validators:
  - ".valid"
"#,
        );
        let input = json!([{"valid": true, "n": 1}, {"valid": false, "n": 2}]);
        assert_eq!(
            extract.transform(&input).expect("transforms"),
            json!([{"valid": true, "n": 1}])
        );
    }

    #[test]
    fn nested_results_bind_as_variables() {
        let extract = compiled(
            r#"
extract_all: "."
first_item_only: true
nested:
  names:
    extract_all: ".items[]"
    render: ".name"
render: "{all: $names}"
"#,
        );
        let input = json!({"items": [{"name": "x"}, {"name": "y"}]});
        assert_eq!(
            extract.transform(&input).expect("transforms"),
            json!({"all": ["x", "y"]})
        );
    }

    #[test]
    fn first_item_only_returns_null_when_empty() {
        let extract = compiled(
            r#"
extract_all: ".[]"
first_item_only: true
"#,
        );
        assert_eq!(
            extract.transform(&json!([])).expect("transforms"),
            Value::Null
        );
    }

    #[test]
    fn preamble_functions_are_available_everywhere() {
        let extract = compiled(
            r#"
preamble: "def tagged: .tags;"
extract_all: ".. | select(.type? == \"Section\")"
render: "tagged"
"#,
        );
        let input = json!({
            "type": "DocContent",
            "elements": [{"type": "Section", "tags": {"s": "1"}}]
        });
        assert_eq!(
            extract.transform(&input).expect("transforms"),
            json!([{"s": "1"}])
        );
    }
}
