//! Error types for tree construction and exchange parsing

use std::fmt;

/// Errors raised when a tree violates structural invariants.
#[derive(Debug, Clone)]
pub enum StructuralError {
    /// A table's cell count does not match its declared geometry.
    CellCountMismatch {
        rows: usize,
        cols: usize,
        cells: usize,
    },
    /// A tree-exchange document could not be interpreted.
    Exchange { reason: String },
}

impl StructuralError {
    pub fn exchange(reason: impl Into<String>) -> Self {
        StructuralError::Exchange {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuralError::CellCountMismatch { rows, cols, cells } => {
                write!(
                    f,
                    "table declares {}x{} = {} cells but holds {}",
                    rows,
                    cols,
                    rows * cols,
                    cells
                )
            }
            StructuralError::Exchange { reason } => {
                write!(f, "malformed tree-exchange document: {}", reason)
            }
        }
    }
}

impl std::error::Error for StructuralError {}
