//! Query engine errors

use std::fmt;

/// Raised when a query fails to compile or evaluate.
#[derive(Debug, Clone)]
pub enum QueryError {
    Compile { reason: String, prog: String },
    Eval { reason: String, prog: String },
}

impl QueryError {
    pub fn compile(reason: impl Into<String>, prog: impl Into<String>) -> Self {
        QueryError::Compile {
            reason: reason.into(),
            prog: prog.into(),
        }
    }

    pub fn eval(reason: impl Into<String>, prog: impl Into<String>) -> Self {
        QueryError::Eval {
            reason: reason.into(),
            prog: prog.into(),
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Compile { reason, prog } => {
                write!(
                    f,
                    "query failed to compile: {} (program: {:?})",
                    reason, prog
                )
            }
            QueryError::Eval { reason, prog } => {
                write!(f, "query failed: {} (program: {:?})", reason, prog)
            }
        }
    }
}

impl std::error::Error for QueryError {}
