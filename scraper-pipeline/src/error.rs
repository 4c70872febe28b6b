//! Pipeline-level errors

use std::fmt;

use scraper_transforms::{ConfigError, TransformError};
use scraper_tree::StructuralError;

/// Errors raised while assembling or running a pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// Configuration problems; fatal before the pipeline starts.
    Config(ConfigError),
    /// YAML that could not be parsed at all.
    ConfigFormat(String),
    /// A document failed a structural invariant.
    Structural(StructuralError),
    /// A transformation failed for one document.
    Transform(TransformError),
    /// I/O failure in a source or sink.
    Io(std::io::Error),
    /// CSV serialization failure.
    Csv(csv::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Config(err) => err.fmt(f),
            PipelineError::ConfigFormat(reason) => {
                write!(f, "could not parse pipeline config: {}", reason)
            }
            PipelineError::Structural(err) => err.fmt(f),
            PipelineError::Transform(err) => err.fmt(f),
            PipelineError::Io(err) => write!(f, "i/o error: {}", err),
            PipelineError::Csv(err) => write!(f, "csv error: {}", err),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        PipelineError::Config(err)
    }
}

impl From<StructuralError> for PipelineError {
    fn from(err: StructuralError) -> Self {
        PipelineError::Structural(err)
    }
}

impl From<TransformError> for PipelineError {
    fn from(err: TransformError) -> Self {
        PipelineError::Transform(err)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err)
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        PipelineError::Csv(err)
    }
}
