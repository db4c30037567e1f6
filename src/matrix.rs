//! Matrix Reducer - fold a pairwise inconsistency-type matrix into counts
//!
//! The matrix is `N x N`, row-major, symmetric by construction. Diagonal
//! cells compare a parser with itself and are never counted; totals are
//! taken over the upper triangle so each unordered pair counts once.

use crate::config::IntensityScale;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// `N x N` grid of inconsistency-type label sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairwiseMatrix {
    dimension: usize,
    cells: Vec<BTreeSet<String>>,
}

impl PairwiseMatrix {
    /// Create a matrix from row-major cells (`index = i * dimension + j`).
    ///
    /// # Errors
    ///
    /// Returns `EmptyInput` for a zero dimension and `MalformedInput` if the
    /// cell count is not `dimension * dimension`.
    pub fn new(dimension: usize, cells: Vec<BTreeSet<String>>) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::EmptyInput("matrix dimension is zero".to_string()));
        }
        let expected = dimension.checked_mul(dimension).ok_or_else(|| {
            Error::MalformedInput(format!("matrix dimension {dimension} overflows"))
        })?;
        if cells.len() != expected {
            return Err(Error::MalformedInput(format!(
                "{dimension}x{dimension} matrix needs {expected} cells, got {}",
                cells.len()
            )));
        }
        Ok(Self { dimension, cells })
    }

    /// Build a matrix by evaluating `f(i, j)` for every cell.
    ///
    /// # Errors
    ///
    /// Returns `EmptyInput` for a zero dimension.
    pub fn from_fn<F>(dimension: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> BTreeSet<String>,
    {
        let cells = (0..dimension)
            .flat_map(|i| (0..dimension).map(move |j| (i, j)))
            .map(|(i, j)| f(i, j))
            .collect();
        Self::new(dimension, cells)
    }

    /// Number of parsers per side.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Labels observed between parsers `i` and `j`, `None` if out of range.
    #[must_use]
    pub fn cell(&self, i: usize, j: usize) -> Option<&BTreeSet<String>> {
        if i >= self.dimension || j >= self.dimension {
            return None;
        }
        self.cells.get(i * self.dimension + j)
    }

    /// The matrix with rows and columns swapped.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let n = self.dimension;
        let cells = (0..n * n)
            .map(|k| self.cells[(k % n) * n + k / n].clone())
            .collect();
        Self { dimension: n, cells }
    }

    /// Whether `cell(i, j) == cell(j, i)` for every pair.
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        let n = self.dimension;
        (0..n).all(|i| (i + 1..n).all(|j| self.cells[i * n + j] == self.cells[j * n + i]))
    }
}

/// Per-cell count, with the diagonal marked as not applicable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellCount {
    /// Diagonal cell (a parser compared with itself).
    NotApplicable,
    /// Number of distinct inconsistency types.
    Count(usize),
}

impl CellCount {
    /// The count, `None` on the diagonal.
    #[must_use]
    pub const fn count(self) -> Option<usize> {
        match self {
            Self::NotApplicable => None,
            Self::Count(c) => Some(c),
        }
    }
}

/// Count and rendering intensity of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReducedCell {
    /// Type count or not-applicable marker.
    pub count: CellCount,
    /// Color intensity derived from the count.
    pub intensity: u32,
}

/// Reduced matrix with grid-wide totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixSummary {
    dimension: usize,
    cells: Vec<ReducedCell>,
    total_types: usize,
    total_pairs: usize,
}

impl MatrixSummary {
    /// Number of parsers per side.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Reduced cell `(i, j)`, `None` if out of range.
    #[must_use]
    pub fn cell(&self, i: usize, j: usize) -> Option<ReducedCell> {
        if i >= self.dimension || j >= self.dimension {
            return None;
        }
        self.cells.get(i * self.dimension + j).copied()
    }

    /// Rows of reduced cells.
    pub fn rows(&self) -> impl Iterator<Item = &[ReducedCell]> {
        self.cells.chunks(self.dimension)
    }

    /// Sum of type counts over the upper triangle.
    #[must_use]
    pub const fn total_types(&self) -> usize {
        self.total_types
    }

    /// Number of upper-triangle cells with at least one type.
    #[must_use]
    pub const fn total_pairs(&self) -> usize {
        self.total_pairs
    }
}

/// Reduce `matrix` to per-cell counts, intensities and upper-triangle totals.
#[must_use]
pub fn reduce(matrix: &PairwiseMatrix, scale: &IntensityScale) -> MatrixSummary {
    let n = matrix.dimension;
    if !matrix.is_symmetric() {
        warn!(dimension = n, "pairwise matrix is not symmetric; totals use the upper triangle");
    }

    let mut total_types = 0;
    let mut total_pairs = 0;
    let mut cells = Vec::with_capacity(n * n);

    for i in 0..n {
        for j in 0..n {
            if i == j {
                cells.push(ReducedCell {
                    count: CellCount::NotApplicable,
                    intensity: 0,
                });
                continue;
            }
            let count = matrix.cells[i * n + j].len();
            if i < j {
                total_types += count;
                if count > 0 {
                    total_pairs += 1;
                }
            }
            cells.push(ReducedCell {
                count: CellCount::Count(count),
                intensity: scale.intensity(count),
            });
        }
    }

    info!(dimension = n, total_types, total_pairs, "reduced pairwise matrix");

    MatrixSummary {
        dimension: n,
        cells,
        total_types,
        total_pairs,
    }
}
