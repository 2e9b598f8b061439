//! Global-phase reranking orchestrator
//!
//! This module provides:
//! - GlobalPhaseRanker: drives the end-to-end rerank of one query's result
//! - ScoreRanges: the rescored-vs-pending score reconciliation accumulator
//! - RerankStats: per-invocation counters for debugging and logging
//!
//! # Flow
//!
//! 1. Plan lookup in the insert-once cache; no plan means no-op
//! 2. Resolve query-sourced inputs once; a miss skips the whole rerank
//! 3. Collect scorable hits, defensively stable-sort by relevance descending
//! 4. Feed and normalize each normalizer over the rerank window
//! 5. Rescore each window hit with a fresh evaluator
//! 6. Affinely remap every pending score into the rescored range's
//!    neighborhood
//! 7. Stable-sort the result by final relevance
//!
//! GlobalPhaseRanker is stateless apart from the read-only plan cache. All
//! per-query state (evaluators, normalizer buffers, resolved inputs) lives
//! on the query's own stack. No error escapes `rerank`; the worst observable
//! outcome is an unchanged ranking.

use crate::cache::PlanCache;
use crate::evaluator::EvaluatorRegistry;
use crate::inputs::QueryInputs;
use crate::normalizer::Normalizer;
use crate::plan::ScalarSource;
use crate::rescorer::HitRescorer;
use rescore_core::profile::ProfileRegistry;
use rescore_core::{Query, ResultSet, Tensor};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

// ============================================================================
// RerankStats
// ============================================================================

/// Counters from one rerank invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RerankStats {
    /// Scorable hits found in the result
    pub hits_seen: usize,
    /// Size of the rerank window actually used
    pub window: usize,
    /// Hits rescored by the global-phase function
    pub rescored: usize,
    /// Window hits that failed to bind and fell into the tail
    pub failed: usize,
    /// Pending hits remapped by tail rescaling
    pub rescaled: usize,
    /// Whether cancellation cut the window short
    pub cancelled: bool,
}

// ============================================================================
// ScoreRanges
// ============================================================================

/// Tracks the old and new score ranges of successfully rescored hits
///
/// Pending hits (the tail, plus window hits that failed to rescore) are
/// remapped affinely so they land at or below the numeric neighborhood of
/// the rescored window. This preserves "rescored hits rank at least as high
/// as the best non-rescored hit" without evaluating the expensive function
/// for every hit.
#[derive(Debug, Clone, Copy)]
pub struct ScoreRanges {
    count: usize,
    initial_lo: f64,
    initial_hi: f64,
    final_lo: f64,
    final_hi: f64,
}

impl Default for ScoreRanges {
    fn default() -> Self {
        ScoreRanges {
            count: 0,
            initial_lo: f64::INFINITY,
            initial_hi: f64::NEG_INFINITY,
            final_lo: f64::INFINITY,
            final_hi: f64::NEG_INFINITY,
        }
    }
}

impl ScoreRanges {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful rescoring as an (old, new) score pair
    pub fn observe(&mut self, old: f64, new: f64) {
        self.count += 1;
        self.initial_lo = self.initial_lo.min(old);
        self.initial_hi = self.initial_hi.max(old);
        self.final_lo = self.final_lo.min(new);
        self.final_hi = self.final_hi.max(new);
    }

    /// Whether rescaling is usable: at least one observation and both ranges
    /// well-formed
    pub fn is_valid(&self) -> bool {
        self.count > 0 && self.initial_hi >= self.initial_lo && self.final_hi >= self.final_lo
    }

    /// Remap a pending hit's old score into the rescored neighborhood
    ///
    /// Both ranges are floored at 1.0, which prevents division by zero and
    /// keeps the scale stable when all rescored scores are (nearly) equal.
    pub fn rescale(&self, old: f64) -> f64 {
        let initial_range = (self.initial_hi - self.initial_lo).max(1.0);
        let final_range = (self.final_hi - self.final_lo).max(1.0);
        let scale = final_range / initial_range;
        let bias = self.final_lo - self.initial_lo * scale;
        old * scale + bias
    }
}

// ============================================================================
// GlobalPhaseRanker
// ============================================================================

/// Orchestrates the global-phase rerank of one query's result
///
/// Holds the injected read-only registries plus the shared plan cache;
/// everything per-query is ephemeral. Safe to share across query threads.
pub struct GlobalPhaseRanker {
    profiles: Arc<ProfileRegistry>,
    evaluators: Arc<EvaluatorRegistry>,
    cache: PlanCache,
}

impl GlobalPhaseRanker {
    /// Create a ranker over the given configuration registries
    pub fn new(profiles: Arc<ProfileRegistry>, evaluators: Arc<EvaluatorRegistry>) -> Self {
        GlobalPhaseRanker {
            profiles,
            evaluators,
            cache: PlanCache::new(),
        }
    }

    /// Rerank a result in place
    pub fn rerank(&self, query: &Query, result: &mut ResultSet, schema: &str) -> RerankStats {
        let never = AtomicBool::new(false);
        self.rerank_with_cancel(query, result, schema, &never)
    }

    /// Rerank a result in place, checking `cancel` between window hits
    ///
    /// On cancellation the remaining window hits stay un-rescored and are
    /// reconciled with the tail, so the result's total order stays as
    /// consistent as tail rescaling allows.
    pub fn rerank_with_cancel(
        &self,
        query: &Query,
        result: &mut ResultSet,
        schema: &str,
        cancel: &AtomicBool,
    ) -> RerankStats {
        let mut stats = RerankStats::default();

        // 1. Plan lookup; the sentinel means this profile never reranks
        let profile = match self.profiles.get(schema, query.rank_profile()) {
            Some(profile) => profile,
            None => return stats,
        };
        let plan = match self.cache.get_or_build(schema, profile, &self.evaluators) {
            Some(plan) => plan,
            None => return stats,
        };

        // 2. Query-sourced inputs resolve once; a miss degrades the whole
        //    query, not individual hits, since these bindings are shared
        let inputs = match QueryInputs::resolve(&plan, query) {
            Ok(inputs) => inputs,
            Err(e) => {
                warn!(
                    target: "rescore::rerank",
                    schema,
                    profile = query.rank_profile(),
                    error = %e,
                    "Query input unresolved; skipping global phase for this query"
                );
                return stats;
            }
        };

        // 3. Collect and defensively order; upstream order is not guaranteed
        let mut hits = result.scorable_hits_mut();
        hits.sort_by(|a, b| {
            b.relevance()
                .partial_cmp(&a.relevance())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        stats.hits_seen = hits.len();
        let window = plan.rerank_count().min(hits.len());
        stats.window = window;

        // 4. Feed normalizers over the window, then transform each once
        let mut normalizers: Vec<(&str, Normalizer)> = plan
            .normalizers()
            .iter()
            .map(|setup| (setup.name(), setup.instantiate()))
            .collect();
        for (setup, (_, normalizer)) in plan.normalizers().iter().zip(normalizers.iter_mut()) {
            for (i, hit) in hits[..window].iter().enumerate() {
                let raw = match setup.source() {
                    ScalarSource::Query(name) => {
                        inputs.value(name).and_then(Tensor::as_scalar)
                    }
                    ScalarSource::MatchFeature(name) => {
                        hit.feature(name).and_then(Tensor::as_scalar)
                    }
                };
                let raw = raw.unwrap_or_else(|| {
                    debug!(
                        target: "rescore::rerank",
                        hit = hit.id(),
                        normalizer = setup.name(),
                        "Normalizer input missing; feeding 0.0"
                    );
                    0.0
                });
                let index = normalizer.add_input(raw);
                debug_assert_eq!(index, i);
            }
            normalizer.normalize();
        }

        // 5. Rescore the window; failures stay pending for step 6
        let rescorer = HitRescorer::new(&plan, &inputs);
        let mut ranges = ScoreRanges::new();
        let mut finalized = vec![false; hits.len()];
        for i in 0..window {
            if cancel.load(Ordering::Relaxed) {
                stats.cancelled = true;
                break;
            }
            let outputs: HashMap<String, f64> = normalizers
                .iter()
                .map(|(name, normalizer)| ((*name).to_string(), normalizer.output(i)))
                .collect();
            let old = hits[i].relevance();
            match rescorer.rescore(&*hits[i], &outputs) {
                Some(new) => {
                    ranges.observe(old, new);
                    hits[i].set_relevance(new);
                    finalized[i] = true;
                    stats.rescored += 1;
                }
                None => stats.failed += 1,
            }
        }

        // 6. Reconcile every pending hit with the rescored range
        if ranges.is_valid() {
            for (i, hit) in hits.iter_mut().enumerate() {
                if !finalized[i] {
                    let remapped = ranges.rescale(hit.relevance());
                    hit.set_relevance(remapped);
                    stats.rescaled += 1;
                }
            }
        }

        // Strip features configured as hidden before the result moves on
        if !plan.hidden_features().is_empty() {
            for hit in hits.iter_mut() {
                for name in plan.hidden_features() {
                    hit.remove_feature(name);
                }
            }
        }
        drop(hits);

        // 7. Final order
        result.sort_by_relevance();

        debug!(
            target: "rescore::rerank",
            schema,
            profile = query.rank_profile(),
            hits = stats.hits_seen,
            window = stats.window,
            rescored = stats.rescored,
            failed = stats.failed,
            rescaled = stats.rescaled,
            cancelled = stats.cancelled,
            "Global phase complete"
        );
        stats
    }
}

// ============================================================================
// Tests
// ============================================================================
