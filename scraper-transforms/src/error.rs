//! Error types for matching and transformation passes

use std::fmt;

use scraper_query::QueryError;

/// Errors raised while evaluating match criteria or variables.
///
/// These are fatal for the affected element unless the configuration sets
/// `ignore_key_errors` / `ignore_errors`, in which case the element is
/// silently unmatched or the tag update skipped.
#[derive(Debug, Clone)]
pub enum MatchError {
    /// A template placeholder referenced a key that does not exist.
    MissingKey { placeholder: String },
    /// A template placeholder referenced an unknown variable or index.
    UnknownSubject { placeholder: String },
    /// A declared variable could not be evaluated.
    Variable { name: String, reason: String },
    /// An embedded query failed.
    Query(QueryError),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::MissingKey { placeholder } => {
                write!(f, "missing key for placeholder {{{}}}", placeholder)
            }
            MatchError::UnknownSubject { placeholder } => {
                write!(f, "unknown subject in placeholder {{{}}}", placeholder)
            }
            MatchError::Variable { name, reason } => {
                write!(f, "variable {:?} failed to evaluate: {}", name, reason)
            }
            MatchError::Query(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for MatchError {}

impl From<QueryError> for MatchError {
    fn from(err: QueryError) -> Self {
        MatchError::Query(err)
    }
}

/// Errors raised while applying a transformation pass to one document.
#[derive(Debug, Clone)]
pub enum TransformError {
    Match(MatchError),
    Query(QueryError),
    /// A pass-level failure, e.g. `split_text` with no match allowed.
    Pass { kind: &'static str, reason: String },
}

impl TransformError {
    pub fn pass(kind: &'static str, reason: impl Into<String>) -> Self {
        TransformError::Pass {
            kind,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformError::Match(err) => err.fmt(f),
            TransformError::Query(err) => err.fmt(f),
            TransformError::Pass { kind, reason } => {
                write!(f, "transform {:?} failed: {}", kind, reason)
            }
        }
    }
}

impl std::error::Error for TransformError {}

impl From<MatchError> for TransformError {
    fn from(err: MatchError) -> Self {
        TransformError::Match(err)
    }
}

impl From<QueryError> for TransformError {
    fn from(err: QueryError) -> Self {
        TransformError::Query(err)
    }
}

/// Errors raised while binding a configuration document to transforms.
///
/// These are fatal before the pipeline starts.
#[derive(Debug, Clone)]
pub enum ConfigError {
    UnknownKind {
        kind: String,
        available: Vec<String>,
    },
    Invalid {
        kind: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownKind { kind, available } => {
                write!(
                    f,
                    "unknown kind {:?}, available: {}",
                    kind,
                    available.join(", ")
                )
            }
            ConfigError::Invalid { kind, reason } => {
                write!(f, "invalid config for kind {:?}: {}", kind, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
