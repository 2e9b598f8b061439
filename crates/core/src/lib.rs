//! Core types for the rescore global-phase reranking pipeline
//!
//! This crate provides:
//! - Tensor: minimal dense feature value
//! - ScoredHit / ResultSet: hits and the hierarchical result collection
//! - Query: the query-side inputs to reranking
//! - RankProfile / ProfileRegistry: rank-profile configuration surface
//! - Error / Result: the shared error taxonomy
//!
//! The pipeline itself lives in `rescore-pipeline`; this crate carries only
//! the data model shared between the pipeline and its collaborators.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod hit;
pub mod profile;
pub mod query;
pub mod tensor;

pub use error::{Error, Result};
pub use hit::{ResultNode, ResultSet, ScoredHit};
pub use profile::{
    NormalizerAlgo, NormalizerDecl, ProfileRegistry, RankProfile, PROP_FEATURE_RENAME,
    PROP_GLOBAL_EXPRESSION, PROP_HIDE_MATCH_FEATURE, PROP_MATCH_FEATURE, PROP_RERANK_COUNT,
};
pub use query::Query;
pub use tensor::Tensor;
