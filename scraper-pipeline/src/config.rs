//! Configuration binding
//!
//! A pipeline configuration is a YAML document with three ordered stage
//! lists (`sources`, `transformations`, `outputs`), each entry a `kind`
//! string plus a kind-specific `config` value. Binding resolves every kind
//! against the registries and fails before the pipeline starts on unknown
//! kinds or malformed configs.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use scraper_transforms::TransformRegistry;

use crate::driver::Pipeline;
use crate::error::PipelineError;
use crate::sinks::SinkRegistry;
use crate::sources::SourceRegistry;

#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    pub kind: String,
    #[serde(default)]
    pub config: serde_yaml::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sources: Vec<StageConfig>,
    pub transformations: Vec<StageConfig>,
    pub outputs: Vec<StageConfig>,
    /// Abort the whole run on the first failing document.
    pub fail_fast: bool,
}

/// Builds pipelines from configuration using pluggable registries.
pub struct PipelineBuilder {
    pub sources: SourceRegistry,
    pub transforms: TransformRegistry,
    pub sinks: SinkRegistry,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            sources: SourceRegistry::with_defaults(),
            transforms: TransformRegistry::with_defaults(),
            sinks: SinkRegistry::with_defaults(),
        }
    }

    pub fn from_file(&self, path: impl AsRef<Path>) -> Result<Pipeline, PipelineError> {
        let text = fs::read_to_string(path)?;
        self.from_yaml_str(&text)
    }

    pub fn from_yaml_str(&self, text: &str) -> Result<Pipeline, PipelineError> {
        let config: PipelineConfig = serde_yaml::from_str(text)
            .map_err(|err| PipelineError::ConfigFormat(err.to_string()))?;
        self.from_config(config)
    }

    pub fn from_config(&self, config: PipelineConfig) -> Result<Pipeline, PipelineError> {
        let mut sources = Vec::with_capacity(config.sources.len());
        for stage in config.sources {
            sources.push(self.sources.build(&stage.kind, stage.config)?);
        }
        let mut transforms = Vec::with_capacity(config.transformations.len());
        for stage in config.transformations {
            transforms.push(self.transforms.build(&stage.kind, stage.config)?);
        }
        let mut sinks = Vec::with_capacity(config.outputs.len());
        for stage in config.outputs {
            sinks.push(self.sinks.build(&stage.kind, stage.config)?);
        }
        Ok(Pipeline::new(sources, transforms, sinks, config.fail_fast))
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
