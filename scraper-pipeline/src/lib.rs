//! Pipeline driver wiring sources, transforms and output sinks
//!
//! A pipeline is declared in a YAML document with three ordered lists:
//! sources produce document trees, transformations rewrite them in sequence,
//! outputs serialize the result. This crate binds that configuration to the
//! registered implementations and runs the resulting pipeline, reporting
//! per-document failures without stopping the stream (unless `fail_fast`).
//!
//! ```text
//! sources:
//!   - kind: doc_files
//!     config: {doc_filenames: [export.json]}
//! transformations:
//!   - kind: nest_bullets
//!   - kind: nest_sections
//!   - kind: extract_json
//!     config: {extract_all: "..", first_item_only: true}
//! outputs:
//!   - kind: stdout
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod sinks;
pub mod sources;

pub use config::{PipelineBuilder, PipelineConfig, StageConfig};
pub use driver::{Pipeline, RunSummary};
pub use error::PipelineError;
pub use sinks::{OutputSink, SinkRegistry};
pub use sources::{FileSource, Source, SourceRegistry, StaticSource};
