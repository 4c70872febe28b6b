//! Interpolation templates
//!
//! Tag values, match expressions and ancestor-path renderings share one
//! placeholder syntax: `{subject}` or `{subject.field}`, where the subject is
//! a variable name or a 0-based index into a contextual element list, and the
//! field dereferences into the subject (`text`, `url`, `tags[key]`,
//! `style[key]`, `attribs[key]`). `{{` and `}}` escape literal braces.
//!
//! Templates parse once at configuration-binding time; rendering resolves
//! subjects against a `RenderScope` and fails with a `MatchError` on missing
//! keys, which callers suppress or propagate per their `ignore_*` settings.

use std::collections::BTreeMap;

use serde::de::{Deserialize, Deserializer, Error as DeError};
use serde_json::Value;

use scraper_tree::text::aggregated_text;
use scraper_tree::ElementRef;

use crate::error::MatchError;

#[derive(Debug, Clone, PartialEq)]
enum Subject {
    Positional(usize),
    Named(String),
}

#[derive(Debug, Clone, PartialEq)]
enum FieldRef {
    Whole,
    Text,
    Url,
    Tag(String),
    Style(String),
    Attrib(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Placeholder {
        raw: String,
        subject: Subject,
        field: FieldRef,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

/// A value bound to a variable name during rendering.
#[derive(Debug, Clone)]
pub enum VarValue<'a> {
    Element(ElementRef<'a>),
    Text(String),
    Json(Value),
}

/// Resolution context for rendering a template.
#[derive(Debug, Clone, Copy)]
pub struct RenderScope<'a, 'v> {
    /// Contextual elements addressed by positional subjects; index 0 is the
    /// element under consideration.
    pub elements: &'v [ElementRef<'a>],
    pub variables: &'v BTreeMap<String, VarValue<'a>>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut inner = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => inner.push(c),
                            None => return Err(format!("unclosed placeholder in {:?}", source)),
                        }
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut literal)));
                    }
                    segments.push(parse_placeholder(&inner)?);
                }
                '}' => return Err(format!("stray '}}' in {:?}", source)),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Text(literal));
        }
        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn render(&self, scope: RenderScope<'_, '_>) -> Result<String, MatchError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder { raw, subject, field } => {
                    out.push_str(&resolve(raw, subject, field, scope)?);
                }
            }
        }
        Ok(out)
    }
}

fn parse_placeholder(inner: &str) -> Result<Segment, String> {
    let (subject_text, field_text) = match inner.find('.') {
        Some(dot) => (&inner[..dot], Some(&inner[dot + 1..])),
        None => (inner, None),
    };
    let subject_text = subject_text.trim();
    if subject_text.is_empty() {
        return Err(format!("placeholder {:?} has no subject", inner));
    }
    let subject = if subject_text.chars().all(|c| c.is_ascii_digit()) {
        Subject::Positional(
            subject_text
                .parse()
                .map_err(|_| format!("bad index in placeholder {:?}", inner))?,
        )
    } else {
        Subject::Named(subject_text.to_string())
    };
    let field = match field_text {
        None => FieldRef::Whole,
        Some("text") => FieldRef::Text,
        Some("url") => FieldRef::Url,
        Some(rest) => parse_keyed_field(rest)
            .ok_or_else(|| format!("unknown field in placeholder {:?}", inner))?,
    };
    Ok(Segment::Placeholder {
        raw: inner.to_string(),
        subject,
        field,
    })
}

fn parse_keyed_field(rest: &str) -> Option<FieldRef> {
    let open = rest.find('[')?;
    if !rest.ends_with(']') {
        return None;
    }
    let key = rest[open + 1..rest.len() - 1].to_string();
    match &rest[..open] {
        "tags" => Some(FieldRef::Tag(key)),
        "style" => Some(FieldRef::Style(key)),
        "attribs" => Some(FieldRef::Attrib(key)),
        _ => None,
    }
}

fn resolve(
    raw: &str,
    subject: &Subject,
    field: &FieldRef,
    scope: RenderScope<'_, '_>,
) -> Result<String, MatchError> {
    let missing = || MatchError::MissingKey {
        placeholder: raw.to_string(),
    };
    match subject {
        Subject::Positional(index) => {
            let element = scope
                .elements
                .get(*index)
                .copied()
                .ok_or_else(|| MatchError::UnknownSubject {
                    placeholder: raw.to_string(),
                })?;
            element_field(element, field).ok_or_else(missing)
        }
        Subject::Named(name) => {
            let value = scope
                .variables
                .get(name)
                .ok_or_else(|| MatchError::UnknownSubject {
                    placeholder: raw.to_string(),
                })?;
            match value {
                VarValue::Element(element) => element_field(*element, field).ok_or_else(missing),
                VarValue::Text(text) => match field {
                    FieldRef::Whole | FieldRef::Text => Ok(text.clone()),
                    _ => Err(missing()),
                },
                VarValue::Json(json) => json_field(json, field).ok_or_else(missing),
            }
        }
    }
}

fn element_field(element: ElementRef<'_>, field: &FieldRef) -> Option<String> {
    match field {
        FieldRef::Whole | FieldRef::Text => Some(aggregated_text(element)),
        FieldRef::Url => element.url().map(str::to_string),
        FieldRef::Tag(key) => element.tags().get(key).cloned(),
        FieldRef::Style(key) => element.style().get(key).cloned(),
        FieldRef::Attrib(key) => element.attribs().get(key).cloned(),
    }
}

fn json_field(json: &Value, field: &FieldRef) -> Option<String> {
    let value = match field {
        FieldRef::Whole => json,
        FieldRef::Text => json.get("text")?,
        FieldRef::Url => json.get("url")?,
        FieldRef::Tag(key) => json.get("tags")?.get(key)?,
        FieldRef::Style(key) => json.get("style")?.get(key)?,
        FieldRef::Attrib(key) => json.get("attribs")?.get(key)?,
    };
    Some(match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    })
}

impl<'de> Deserialize<'de> for Template {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let source = String::deserialize(deserializer)?;
        Template::parse(&source).map_err(D::Error::custom)
    }
}
