//! Document sources
//!
//! Sources produce the document trees the pipeline consumes. Network
//! acquisition lives outside this workspace; the built-in source reads
//! tree-exchange JSON files as produced by a document parser (or by the
//! projection itself).

use std::collections::BTreeMap;
use std::fs;

use serde::Deserialize;

use scraper_tree::{parse_document, Document};

use crate::error::PipelineError;
use scraper_transforms::ConfigError;

/// A source yields documents; failures are reported per document so one bad
/// input does not poison the stream.
pub trait Source {
    fn kind(&self) -> &'static str;
    fn load(&self) -> Vec<Result<Document, PipelineError>>;
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileSourceConfig {
    pub doc_filenames: Vec<String>,
}

/// Reads one tree-exchange JSON document per file.
#[derive(Debug, Clone)]
pub struct FileSource {
    doc_filenames: Vec<String>,
}

impl FileSource {
    pub fn from_config(config: FileSourceConfig) -> Self {
        Self {
            doc_filenames: config.doc_filenames,
        }
    }

    fn load_one(&self, filename: &str) -> Result<Document, PipelineError> {
        let text = fs::read_to_string(filename)?;
        let value: serde_json::Value = serde_json::from_str(&text).map_err(|err| {
            PipelineError::Structural(scraper_tree::StructuralError::exchange(format!(
                "{}: {}",
                filename, err
            )))
        })?;
        Ok(parse_document(&value)?)
    }
}

impl Source for FileSource {
    fn kind(&self) -> &'static str {
        "doc_files"
    }

    fn load(&self) -> Vec<Result<Document, PipelineError>> {
        self.doc_filenames
            .iter()
            .map(|filename| {
                let loaded = self.load_one(filename);
                if let Err(err) = &loaded {
                    log::error!("failed to load {}: {}", filename, err);
                }
                loaded
            })
            .collect()
    }
}

/// In-memory source for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    docs: Vec<Document>,
}

impl StaticSource {
    pub fn new(docs: Vec<Document>) -> Self {
        Self { docs }
    }
}

impl Source for StaticSource {
    fn kind(&self) -> &'static str {
        "static"
    }

    fn load(&self) -> Vec<Result<Document, PipelineError>> {
        self.docs.iter().cloned().map(Ok).collect()
    }
}

type SourceBuilderFn = Box<dyn Fn(serde_yaml::Value) -> Result<Box<dyn Source>, ConfigError>>;

pub struct SourceRegistry {
    builders: BTreeMap<String, SourceBuilderFn>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("doc_files", |value| {
            let config: FileSourceConfig = bind("doc_files", value)?;
            Ok(Box::new(FileSource::from_config(config)))
        });
        registry
    }

    pub fn register(
        &mut self,
        kind: &str,
        builder: impl Fn(serde_yaml::Value) -> Result<Box<dyn Source>, ConfigError> + 'static,
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
    ) -> Result<Box<dyn Source>, ConfigError> {
        let builder = self.builders.get(kind).ok_or_else(|| ConfigError::UnknownKind {
            kind: kind.to_string(),
            available: self.kinds(),
        })?;
        builder(config)
    }
}

impl Default for SourceRegistry {
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
    use scraper_tree::project_document;
    use scraper_tree::{BlockElement, DocContent, Paragraph};

    #[test]
    fn file_source_round_trips_exchange_files() {
        let doc = Document::new(DocContent::new(vec![BlockElement::Paragraph(
            Paragraph::from_text("from file"),
        )]));
        let path = std::env::temp_dir().join("scraper-source-test.json");
        std::fs::write(
            &path,
            serde_json::to_string(&project_document(&doc)).expect("serializes"),
        )
        .expect("writes");

        let source = FileSource::from_config(FileSourceConfig {
            doc_filenames: vec![path.to_string_lossy().to_string()],
        });
        let loaded = source.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(*loaded[0].as_ref().expect("loads"), doc);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_files_fail_per_document() {
        let source = FileSource::from_config(FileSourceConfig {
            doc_filenames: vec![
                "/nonexistent/a.json".to_string(),
                "/nonexistent/b.json".to_string(),
            ],
        });
        let loaded = source.load();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().all(Result::is_err));
    }

    #[test]
    fn unknown_source_kind_is_rejected() {
        let registry = SourceRegistry::with_defaults();
        assert!(registry
            .build("google_doc_html", serde_yaml::Value::Null)
            .is_err());
        assert!(registry.build("doc_files", serde_yaml::Value::Null).is_ok());
    }
}
