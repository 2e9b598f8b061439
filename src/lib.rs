//! Rescore - global-phase hit reranking for search serving
//!
//! Rescore re-evaluates an expensive scoring function over the top-K window
//! of an already-ranked result and reconciles the rescored window with the
//! untouched tail, so the final order stays consistent without paying the
//! expensive function for every hit.
//!
//! # Quick Start
//!
//! ```ignore
//! use rescore::{GlobalPhaseRanker, ProfileRegistry, EvaluatorRegistry, Query};
//!
//! let ranker = GlobalPhaseRanker::new(profiles, evaluators);
//! let stats = ranker.rerank(&query, &mut result, "music");
//! ```
//!
//! # Architecture
//!
//! Configuration compiles once per (schema, rank-profile) into an
//! [`EvaluationPlan`] cached process-wide; each query then resolves its
//! shared inputs once, normalizes per-hit values over the rerank window,
//! rescores each window hit with a fresh evaluator, and affinely remaps the
//! tail into the rescored range's neighborhood.

// Re-export the public API from the member crates
pub use rescore_core::*;
pub use rescore_pipeline::*;
