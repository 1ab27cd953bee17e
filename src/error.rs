//! Error types for the kernel dispatch and batch layers.
//!
//! Kernels themselves never fail: numerical edge cases (zero norms, empty
//! unions, zero probabilities) are defined values. Everything here is a
//! precondition violation caught before any kernel runs.

use crate::dispatch::{Datatype, MetricKind};
use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("row count mismatch: left has {left}, right has {right}")]
    RowCountMismatch { left: usize, right: usize },

    #[error("output length mismatch: expected {expected}, got {got}")]
    OutputLengthMismatch { expected: usize, got: usize },

    #[error("no kernel for metric {metric:?} over {datatype:?}")]
    UnsupportedCombination {
        metric: MetricKind,
        datatype: Datatype,
    },

    #[error("complex vector length must be even, got {0}")]
    OddComplexLength(usize),

    #[error("row stride {stride} is smaller than row length {dim}")]
    InvalidStride { stride: usize, dim: usize },

    #[error("buffer too small: need {needed} elements, got {got}")]
    BufferTooSmall { needed: usize, got: usize },

    #[error("element width {got} does not match {datatype:?} (expected {expected} bytes)")]
    ElementWidthMismatch {
        datatype: Datatype,
        expected: usize,
        got: usize,
    },

    #[error("input vectors must hold at least one element")]
    EmptyInput,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
