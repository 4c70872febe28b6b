//! Output sinks
//!
//! Sinks serialize the final payload of each document: pretty-printed JSON to
//! stdout or files (single, or one per document with a templated filename),
//! or CSV rows built from declared fields. Sinks keep a per-run document
//! counter for separators and filename templates.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use scraper_transforms::{ConfigError, Payload};

use crate::error::PipelineError;

/// Attributes of the document as it entered the pipeline; kept available to
/// sinks even after extraction replaced the tree.
pub type DocAttribs = BTreeMap<String, String>;

pub trait OutputSink {
    fn kind(&self) -> &'static str;
    fn emit(&mut self, payload: &Payload, attribs: &DocAttribs) -> Result<(), PipelineError>;
}

fn render_json(payload: &Payload) -> String {
    let value = payload.to_output_json();
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

/// Writes each document's JSON to stdout, newline separated.
#[derive(Debug, Clone, Default)]
pub struct StdoutSink {
    index: usize,
}

impl OutputSink for StdoutSink {
    fn kind(&self) -> &'static str {
        "stdout"
    }

    fn emit(&mut self, payload: &Payload, _attribs: &DocAttribs) -> Result<(), PipelineError> {
        let mut stdout = std::io::stdout().lock();
        if self.index > 0 {
            writeln!(stdout)?;
        }
        write!(stdout, "{}", render_json(payload))?;
        writeln!(stdout)?;
        self.index += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SingleFileConfig {
    pub output_file: String,
}

/// Concatenates all documents into one file, newline separated.
#[derive(Debug, Clone)]
pub struct SingleFileSink {
    path: PathBuf,
    index: usize,
}

impl SingleFileSink {
    pub fn from_config(config: SingleFileConfig) -> Self {
        Self {
            path: PathBuf::from(config.output_file),
            index: 0,
        }
    }
}

impl OutputSink for SingleFileSink {
    fn kind(&self) -> &'static str {
        "single_file"
    }

    fn emit(&mut self, payload: &Payload, _attribs: &DocAttribs) -> Result<(), PipelineError> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(self.index == 0)
            .append(self.index > 0)
            .open(&self.path)?;
        if self.index > 0 {
            writeln!(file)?;
        }
        write!(file, "{}", render_json(payload))?;
        self.index += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplatePathConfig {
    pub output_path_template: String,
}

/// One file per document; `{i}` expands to a running counter, `{name}` to
/// the document attribute of that name.
#[derive(Debug, Clone)]
pub struct TemplatePathSink {
    template: String,
    index: usize,
}

impl TemplatePathSink {
    pub fn from_config(config: TemplatePathConfig) -> Self {
        Self {
            template: config.output_path_template,
            index: 0,
        }
    }

    fn filename(&self, attribs: &DocAttribs) -> Result<String, PipelineError> {
        let mut out = String::new();
        let mut chars = self.template.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '{' {
                out.push(c);
                continue;
            }
            let mut key = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => key.push(c),
                    None => {
                        return Err(PipelineError::Config(ConfigError::invalid(
                            "template_path",
                            format!("unclosed placeholder in {:?}", self.template),
                        )))
                    }
                }
            }
            if key == "i" {
                out.push_str(&self.index.to_string());
            } else if let Some(value) = attribs.get(&key) {
                out.push_str(value);
            } else {
                return Err(PipelineError::Config(ConfigError::invalid(
                    "template_path",
                    format!("document has no attribute {:?}", key),
                )));
            }
        }
        Ok(out)
    }
}

impl OutputSink for TemplatePathSink {
    fn kind(&self) -> &'static str {
        "template_path"
    }

    fn emit(&mut self, payload: &Payload, attribs: &DocAttribs) -> Result<(), PipelineError> {
        let filename = self.filename(attribs)?;
        log::debug!("writing document {} to {}", self.index, filename);
        std::fs::write(&filename, render_json(payload))?;
        self.index += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quoting {
    #[default]
    Minimal,
    All,
    NonNumeric,
    None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsvFileConfig {
    pub output_file: String,
    pub fields: Vec<String>,
    #[serde(default)]
    pub flatten_list: bool,
    #[serde(default)]
    pub delimiter: Option<char>,
    #[serde(default)]
    pub quotechar: Option<char>,
    #[serde(default)]
    pub escapechar: Option<char>,
    #[serde(default)]
    pub doublequote: Option<bool>,
    #[serde(default)]
    pub lineterminator: Option<String>,
    #[serde(default)]
    pub quoting: Quoting,
}

/// Writes declared fields as CSV columns, one row per extracted item.
pub struct CsvSink {
    config: CsvFileConfig,
    writer: Option<csv::Writer<std::fs::File>>,
}

impl CsvSink {
    pub fn from_config(config: CsvFileConfig) -> Self {
        Self {
            config,
            writer: None,
        }
    }

    fn writer(&mut self) -> Result<&mut csv::Writer<std::fs::File>, PipelineError> {
        if self.writer.is_none() {
            let mut builder = csv::WriterBuilder::new();
            if let Some(delimiter) = self.config.delimiter {
                builder.delimiter(delimiter as u8);
            }
            if let Some(quote) = self.config.quotechar {
                builder.quote(quote as u8);
            }
            if let Some(escape) = self.config.escapechar {
                builder.escape(escape as u8);
            }
            if let Some(double) = self.config.doublequote {
                builder.double_quote(double);
            }
            if let Some(terminator) = &self.config.lineterminator {
                let terminator = match terminator.as_str() {
                    "\r\n" => csv::Terminator::CRLF,
                    other => csv::Terminator::Any(other.as_bytes().first().copied().unwrap_or(b'\n')),
                };
                builder.terminator(terminator);
            }
            builder.quote_style(match self.config.quoting {
                Quoting::Minimal => csv::QuoteStyle::Necessary,
                Quoting::All => csv::QuoteStyle::Always,
                Quoting::NonNumeric => csv::QuoteStyle::NonNumeric,
                Quoting::None => csv::QuoteStyle::Never,
            });
            let file = std::fs::File::create(&self.config.output_file)?;
            let mut writer = builder.from_writer(file);
            writer.write_record(&self.config.fields)?;
            self.writer = Some(writer);
        }
        Ok(self.writer.as_mut().expect("writer was just created"))
    }

    fn rows_for(&self, item: &Value) -> Vec<Vec<String>> {
        let cells: Vec<Vec<String>> = self
            .config
            .fields
            .iter()
            .map(|field| {
                let value = item.get(field).cloned().unwrap_or(Value::Null);
                match value {
                    Value::Array(items) if self.config.flatten_list => {
                        if items.is_empty() {
                            vec![String::new()]
                        } else {
                            items.iter().map(cell_text).collect()
                        }
                    }
                    other => vec![cell_text(&other)],
                }
            })
            .collect();
        cartesian(&cells)
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Rows as the cartesian product of per-field cell alternatives; fields with
/// a single alternative repeat across the expanded rows.
fn cartesian(cells: &[Vec<String>]) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = vec![Vec::new()];
    for alternatives in cells {
        let mut expanded = Vec::with_capacity(rows.len() * alternatives.len());
        for row in &rows {
            for alternative in alternatives {
                let mut next = row.clone();
                next.push(alternative.clone());
                expanded.push(next);
            }
        }
        rows = expanded;
    }
    rows
}

impl OutputSink for CsvSink {
    fn kind(&self) -> &'static str {
        "csv_file"
    }

    fn emit(&mut self, payload: &Payload, _attribs: &DocAttribs) -> Result<(), PipelineError> {
        let value = payload.to_output_json();
        let items: Vec<Value> = match value {
            Value::Array(items) => items,
            other => vec![other],
        };
        let rows: Vec<Vec<String>> = items.iter().flat_map(|item| self.rows_for(item)).collect();
        let writer = self.writer()?;
        for row in rows {
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

type SinkBuilderFn = Box<dyn Fn(serde_yaml::Value) -> Result<Box<dyn OutputSink>, ConfigError>>;

pub struct SinkRegistry {
    builders: BTreeMap<String, SinkBuilderFn>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("stdout", |_| Ok(Box::new(StdoutSink::default())));
        registry.register("single_file", |value| {
            let config: SingleFileConfig = bind("single_file", value)?;
            Ok(Box::new(SingleFileSink::from_config(config)))
        });
        registry.register("template_path", |value| {
            let config: TemplatePathConfig = bind("template_path", value)?;
            Ok(Box::new(TemplatePathSink::from_config(config)))
        });
        registry.register("csv_file", |value| {
            let config: CsvFileConfig = bind("csv_file", value)?;
            Ok(Box::new(CsvSink::from_config(config)))
        });
        registry
    }

    pub fn register(
        &mut self,
        kind: &str,
        builder: impl Fn(serde_yaml::Value) -> Result<Box<dyn OutputSink>, ConfigError> + 'static,
    ) {
        self.builders.insert(kind.to_string(), Box::new(builder));
    }

    pub fn kinds(&self) -> Vec<String> {
        self.builders.keys().cloned().collect()
    }

    pub fn build(
        &self,
        kind: &str,
        config: serde_yaml::Value,
    ) -> Result<Box<dyn OutputSink>, ConfigError> {
        let builder = self.builders.get(kind).ok_or_else(|| ConfigError::UnknownKind {
            kind: kind.to_string(),
            available: self.kinds(),
        })?;
        builder(config)
    }
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn bind<C: serde::de::DeserializeOwned>(
    kind: &str,
    value: serde_yaml::Value,
) -> Result<C, ConfigError> {
    let value = if value.is_null() {
        serde_yaml::Value::Mapping(Default::default())
    } else {
        value
    };
    serde_yaml::from_value(value).map_err(|err| ConfigError::invalid(kind, err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("scraper-sink-{}-{}", std::process::id(), name))
    }

    #[test]
    fn single_file_concatenates_with_newline() {
        let path = temp_path("single.json");
        let mut sink = SingleFileSink::from_config(SingleFileConfig {
            output_file: path.to_string_lossy().to_string(),
        });
        sink.emit(&Payload::Json(json!({"n": 1})), &DocAttribs::new())
            .expect("first emit");
        sink.emit(&Payload::Json(json!({"n": 2})), &DocAttribs::new())
            .expect("second emit");
        let written = std::fs::read_to_string(&path).expect("file exists");
        assert_eq!(written.matches("\"n\"").count(), 2);
        assert!(written.contains("}\n{"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn template_path_expands_counter_and_attribs() {
        let sink = TemplatePathSink::from_config(TemplatePathConfig {
            output_path_template: "/out/{name}-{i}.json".to_string(),
        });
        let attribs = DocAttribs::from([("name".to_string(), "report".to_string())]);
        assert_eq!(
            sink.filename(&attribs).expect("expands"),
            "/out/report-0.json"
        );
        assert!(sink.filename(&DocAttribs::new()).is_err());
    }

    #[test]
    fn csv_rows_flatten_lists() {
        let config = CsvFileConfig {
            output_file: String::new(),
            fields: vec!["name".to_string(), "values".to_string()],
            flatten_list: true,
            delimiter: None,
            quotechar: None,
            escapechar: None,
            doublequote: None,
            lineterminator: None,
            quoting: Quoting::Minimal,
        };
        let sink = CsvSink::from_config(config);
        let rows = sink.rows_for(&json!({"name": "a", "values": [1, 2]}));
        assert_eq!(
            rows,
            vec![
                vec!["a".to_string(), "1".to_string()],
                vec!["a".to_string(), "2".to_string()],
            ]
        );
    }

    #[test]
    fn csv_sink_writes_header_and_rows() {
        let path = temp_path("rows.csv");
        let mut sink = CsvSink::from_config(CsvFileConfig {
            output_file: path.to_string_lossy().to_string(),
            fields: vec!["name".to_string(), "n".to_string()],
            flatten_list: false,
            delimiter: Some(';'),
            quotechar: None,
            escapechar: None,
            doublequote: None,
            lineterminator: None,
            quoting: Quoting::Minimal,
        });
        sink.emit(
            &Payload::Json(json!([{"name": "a", "n": 1}, {"name": "b", "n": 2}])),
            &DocAttribs::new(),
        )
        .expect("emits");
        let written = std::fs::read_to_string(&path).expect("file exists");
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "name;n");
        assert_eq!(lines[1], "a;1");
        assert_eq!(lines[2], "b;2");
        std::fs::remove_file(&path).ok();
    }
}
