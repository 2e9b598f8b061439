//! Per-query input resolution
//!
//! Query-sourced inputs are shared by every hit in the rerank window, so
//! they resolve exactly once per query: first against the query's ranking
//! features, then against a single-valued ranking property of the same name.
//! A miss is a per-query degradation — the caller skips the whole rerank —
//! not a per-hit one, because a missing query input would fail every hit the
//! same way.

use crate::plan::{EvaluationPlan, ScalarSource, CONSTANT_INPUT};
use rescore_core::error::{Error, Result};
use rescore_core::{Query, Tensor};
use std::collections::{HashMap, HashSet};

/// Query-sourced bindings resolved once per query
///
/// Keys are the inner names (without the `query(...)` wrap). Inputs named
/// `constant` resolve inside the evaluator; they are recorded as skipped so
/// the rescorer leaves them unbound without treating them as missing.
#[derive(Debug, Clone, Default)]
pub struct QueryInputs {
    bindings: HashMap<String, Tensor>,
    skipped: HashSet<String>,
}

impl QueryInputs {
    /// Resolve every query-sourced input of a plan, plan-level and
    /// per-normalizer alike
    pub fn resolve(plan: &EvaluationPlan, query: &Query) -> Result<QueryInputs> {
        let mut inputs = QueryInputs::default();
        for name in plan.from_query() {
            inputs.resolve_one(name, query)?;
        }
        for setup in plan.normalizers() {
            if let ScalarSource::Query(name) = setup.source() {
                inputs.resolve_one(name, query)?;
            }
        }
        Ok(inputs)
    }

    fn resolve_one(&mut self, name: &str, query: &Query) -> Result<()> {
        if name == CONSTANT_INPUT {
            self.skipped.insert(name.to_string());
            return Ok(());
        }
        if self.bindings.contains_key(name) {
            return Ok(());
        }
        let value = query
            .feature(name)
            .or_else(|| query.single_property(name))
            .ok_or_else(|| Error::MissingQueryInput(name.to_string()))?;
        self.bindings.insert(name.to_string(), value.clone());
        Ok(())
    }

    /// The resolved value for an inner name
    pub fn value(&self, name: &str) -> Option<&Tensor> {
        self.bindings.get(name)
    }

    /// Whether the name is present-but-unbound (the `constant` special case)
    pub fn is_skipped(&self, name: &str) -> bool {
        self.skipped.contains(name)
    }
}
