//! Global-phase reranking pipeline
//!
//! This crate provides:
//! - Evaluator / EvaluatorFactory capability traits and the factory registry
//! - Normalizer: per-query linear and reciprocal-rank normalization
//! - EvaluationPlan: the per-(schema, rank-profile) input classification
//! - PlanCache: lazy, insert-once plan publication across query threads
//! - QueryInputs / HitRescorer: per-query and per-hit input binding
//! - GlobalPhaseRanker: the end-to-end orchestrator
//!
//! # Usage
//!
//! ```ignore
//! use rescore_pipeline::GlobalPhaseRanker;
//!
//! let ranker = GlobalPhaseRanker::new(profiles, evaluators);
//! let stats = ranker.rerank(&query, &mut result, "music");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod evaluator;
pub mod inputs;
pub mod normalizer;
pub mod plan;
pub mod reranker;
pub mod rescorer;

pub use cache::PlanCache;
pub use evaluator::{
    Evaluator, EvaluatorFactory, EvaluatorRegistry, LinearEvaluator, LinearEvaluatorFactory,
};
pub use inputs::QueryInputs;
pub use normalizer::{Normalizer, NormalizerKind};
pub use plan::{alternate, EvaluationPlan, NormalizerSetup, ScalarSource, DEFAULT_RERANK_COUNT};
pub use reranker::{GlobalPhaseRanker, RerankStats, ScoreRanges};
pub use rescorer::HitRescorer;
