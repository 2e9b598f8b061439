//! Process-wide evaluation plan cache
//!
//! Plans are built lazily on first use per (schema, rank-profile) key and
//! read by every concurrent query thread afterwards. DashMap's entry API
//! gives the insert-once-per-key publication; a key is never rewritten once
//! populated. Build failures are cached too, as the `Inactive` sentinel, so
//! a misconfigured profile costs one warning and then degrades every query
//! against it to a no-op rerank.

use crate::evaluator::EvaluatorRegistry;
use crate::plan::EvaluationPlan;
use dashmap::DashMap;
use rescore_core::profile::RankProfile;
use std::sync::Arc;
use tracing::{debug, warn};

/// Cached outcome of building a plan for one (schema, rank-profile) key
#[derive(Debug, Clone)]
enum CachedPlan {
    /// A usable plan
    Active(Arc<EvaluationPlan>),
    /// No global phase for this profile: either none is configured, or
    /// configuration was invalid and the profile is degraded
    Inactive,
}

/// Insert-once cache of evaluation plans keyed by (schema, rank-profile)
#[derive(Debug, Default)]
pub struct PlanCache {
    plans: DashMap<(String, String), CachedPlan>,
}

impl PlanCache {
    /// Create an empty cache
    pub fn new() -> Self {
        PlanCache {
            plans: DashMap::new(),
        }
    }

    /// Get the plan for a profile, building it on first use
    ///
    /// Returns `None` when the profile has no usable global phase. Concurrent
    /// first lookups of the same key may race to build; the entry API
    /// publishes exactly one winner and plans are behaviorally identical, so
    /// the losing build is discarded harmlessly.
    pub fn get_or_build(
        &self,
        schema: &str,
        profile: &RankProfile,
        registry: &EvaluatorRegistry,
    ) -> Option<Arc<EvaluationPlan>> {
        let key = (schema.to_string(), profile.name().to_string());
        let entry = self
            .plans
            .entry(key)
            .or_insert_with(|| build_entry(schema, profile, registry));
        match entry.value() {
            CachedPlan::Active(plan) => Some(Arc::clone(plan)),
            CachedPlan::Inactive => None,
        }
    }

    /// Number of cached keys (active and inactive)
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Whether no key has been cached yet
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

fn build_entry(schema: &str, profile: &RankProfile, registry: &EvaluatorRegistry) -> CachedPlan {
    match EvaluationPlan::build(schema, profile, registry) {
        Ok(Some(plan)) => {
            debug!(
                target: "rescore::plan",
                schema,
                profile = profile.name(),
                rerank_count = plan.rerank_count(),
                normalizers = plan.normalizers().len(),
                "Built global-phase evaluation plan"
            );
            CachedPlan::Active(Arc::new(plan))
        }
        Ok(None) => CachedPlan::Inactive,
        Err(e) => {
            warn!(
                target: "rescore::plan",
                schema,
                profile = profile.name(),
                error = %e,
                "Global-phase configuration invalid; profile degrades to no-op rerank"
            );
            CachedPlan::Inactive
        }
    }
}
