//! Minimal tensor value type
//!
//! The reranking pipeline shuttles feature values between the query, the
//! per-hit match-feature maps, and the external evaluator. It never does
//! tensor math itself, so this type is deliberately small: a flat cell
//! buffer with a scalar fast path. The external evaluation engine owns the
//! real tensor semantics.

use serde::{Deserialize, Serialize};

/// A dense, flat feature value
///
/// Scalars are tensors with exactly one cell. `as_scalar()` is the only
/// accessor the pipeline itself depends on; everything else exists so
/// values can be passed through to the evaluator unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    cells: Vec<f64>,
}

impl Tensor {
    /// Create a single-cell (scalar) tensor
    pub fn scalar(value: f64) -> Self {
        Tensor { cells: vec![value] }
    }

    /// Create a dense tensor from a flat cell buffer
    pub fn dense(cells: Vec<f64>) -> Self {
        Tensor { cells }
    }

    /// The scalar value, if this tensor has exactly one cell
    pub fn as_scalar(&self) -> Option<f64> {
        match self.cells.as_slice() {
            [v] => Some(*v),
            _ => None,
        }
    }

    /// Flat cell buffer
    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the tensor has no cells
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl From<f64> for Tensor {
    fn from(value: f64) -> Self {
        Tensor::scalar(value)
    }
}
