//! Tables and content containers
//!
//! A `DocContent` is a document-in-miniature: an ordered list of block
//! elements. It appears as the document body and as every table cell, which
//! is what lets cells hold paragraphs, lists and even nested tables.

use super::{BlockElement, Common};
use crate::error::StructuralError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocContent {
    pub common: Common,
    pub elements: Vec<BlockElement>,
}

impl DocContent {
    pub fn new(elements: Vec<BlockElement>) -> Self {
        Self {
            common: Common::default(),
            elements,
        }
    }

    pub fn with_common(mut self, common: Common) -> Self {
        self.common = common;
        self
    }
}

/// A 2-D grid of `DocContent` cells, stored row-major.
///
/// Geometry is validated at construction and preserved by every accessor, so
/// a cell's `(row, col)` can always be derived from its index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub common: Common,
    rows: usize,
    cols: usize,
    cells: Vec<DocContent>,
}

impl Table {
    pub fn new(
        common: Common,
        rows: usize,
        cols: usize,
        cells: Vec<DocContent>,
    ) -> Result<Self, StructuralError> {
        if rows * cols != cells.len() {
            return Err(StructuralError::CellCountMismatch {
                rows,
                cols,
                cells: cells.len(),
            });
        }
        Ok(Self {
            common,
            rows,
            cols,
            cells,
        })
    }

    /// Build from rows of cells; all rows must have equal length.
    pub fn from_rows(rows: Vec<Vec<DocContent>>) -> Result<Self, StructuralError> {
        let row_count = rows.len();
        let col_count = rows.first().map(Vec::len).unwrap_or(0);
        let mut cells = Vec::with_capacity(row_count * col_count);
        for row in rows {
            if row.len() != col_count {
                return Err(StructuralError::CellCountMismatch {
                    rows: row_count,
                    cols: col_count,
                    cells: row.len(),
                });
            }
            cells.extend(row);
        }
        Self::new(Common::default(), row_count, col_count, cells)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cells(&self) -> &[DocContent] {
        &self.cells
    }

    /// Mutable access to the cells; the geometry itself stays fixed.
    pub fn cells_mut(&mut self) -> &mut [DocContent] {
        &mut self.cells
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&DocContent> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn coords_of(&self, cell_index: usize) -> (usize, usize) {
        (cell_index / self.cols.max(1), cell_index % self.cols.max(1))
    }

    /// Rebuild every cell while keeping the geometry.
    pub fn map_cells(self, f: impl FnMut(DocContent) -> DocContent) -> Self {
        let Table {
            common,
            rows,
            cols,
            cells,
        } = self;
        let cells = cells.into_iter().map(f).collect();
        Self {
            common,
            rows,
            cols,
            cells,
        }
    }
}
