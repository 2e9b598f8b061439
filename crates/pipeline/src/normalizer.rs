//! Per-query score normalizers
//!
//! This module provides:
//! - NormalizerKind: closed set of normalization algorithms
//! - Normalizer: a fixed-capacity per-query accumulator
//!
//! Lifecycle of an instance: created at the start of a query's rerank pass,
//! fed once per hit in the rerank window, normalized exactly once after all
//! hits are fed, read once per hit, then discarded. Instances are never
//! shared between queries.

use rescore_core::profile::{NormalizerAlgo, NormalizerDecl};

// ============================================================================
// NormalizerKind
// ============================================================================

/// Normalization algorithm with its parameters
///
/// A closed tagged variant; `Normalizer::normalize` dispatches on it with a
/// match rather than trait objects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizerKind {
    /// Linear min-max into [0, 1]; all-equal inputs map to 0.5
    Linear,
    /// Reciprocal rank: the value at descending rank r becomes 1/(k + 1 + r)
    ReciprocalRank {
        /// Configured non-negative k parameter
        k: f64,
    },
}

impl From<&NormalizerDecl> for NormalizerKind {
    fn from(decl: &NormalizerDecl) -> Self {
        match decl.algo {
            NormalizerAlgo::Linear => NormalizerKind::Linear,
            NormalizerAlgo::ReciprocalRank => NormalizerKind::ReciprocalRank { k: decl.k },
        }
    }
}

// ============================================================================
// Normalizer
// ============================================================================

/// Fixed-capacity buffer of raw values, transformed in place once
#[derive(Debug, Clone)]
pub struct Normalizer {
    kind: NormalizerKind,
    data: Vec<f64>,
    capacity: usize,
    normalized: bool,
}

impl Normalizer {
    /// Create an empty normalizer sized to the rerank window
    pub fn new(kind: NormalizerKind, capacity: usize) -> Self {
        Normalizer {
            kind,
            data: Vec::with_capacity(capacity),
            capacity,
            normalized: false,
        }
    }

    /// Number of values fed so far
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether no values have been fed
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Feed one raw value, returning its index
    ///
    /// Must not be called more than `capacity` times, nor after
    /// [`Self::normalize`].
    pub fn add_input(&mut self, value: f64) -> usize {
        debug_assert!(!self.normalized, "add_input after normalize");
        debug_assert!(self.data.len() < self.capacity, "normalizer over capacity");
        self.data.push(value);
        self.data.len() - 1
    }

    /// Transform the whole buffer in place
    ///
    /// Must be called exactly once, after all inputs are fed and before any
    /// output is read. Calling it twice corrupts the results.
    pub fn normalize(&mut self) {
        debug_assert!(!self.normalized, "normalize called twice");
        self.normalized = true;
        match self.kind {
            NormalizerKind::Linear => linear_in_place(&mut self.data),
            NormalizerKind::ReciprocalRank { k } => reciprocal_rank_in_place(&mut self.data, k),
        }
    }

    /// Read the transformed value at an index returned by [`Self::add_input`]
    pub fn output(&self, index: usize) -> f64 {
        debug_assert!(self.normalized, "output before normalize");
        self.data[index]
    }
}

/// Min-max transform: v -> 0.5 + scale * (v - midpoint)
///
/// Infinite endpoints are clamped to the finite range first so a stray
/// infinity cannot poison the scale. All-equal input maps every value to 0.5.
fn linear_in_place(data: &mut [f64]) {
    if data.is_empty() {
        return;
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in data.iter() {
        min = min.min(v);
        max = max.max(v);
    }
    let min = min.clamp(-f64::MAX, f64::MAX);
    let max = max.clamp(-f64::MAX, f64::MAX);
    let midpoint = (min + max) / 2.0;
    let scale = if max > min { 1.0 / (max - min) } else { 0.0 };
    for v in data.iter_mut() {
        *v = 0.5 + scale * (*v - midpoint);
    }
}

/// Reciprocal-rank transform over descending value order
///
/// Ties keep their original relative order (the index sort is stable).
fn reciprocal_rank_in_place(data: &mut [f64], k: f64) {
    let mut order: Vec<usize> = (0..data.len()).collect();
    order.sort_by(|&a, &b| {
        data[b]
            .partial_cmp(&data[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for (rank, &index) in order.iter().enumerate() {
        data[index] = 1.0 / (k + 1.0 + rank as f64);
    }
}

// ============================================================================
// Tests
// ============================================================================
