//! Per-hit rescoring
//!
//! Binds one hit's inputs into a fresh evaluator and produces its new score.
//! Binding order per required input: normalizer output, query binding,
//! match-feature — the match-feature lookup retries under the alternate
//! (`rankingExpression(...)`-wrapped or unwrapped) name. A hit that cannot
//! bind every input is simply not rescored; the orchestrator folds it into
//! the tail instead.

use crate::inputs::QueryInputs;
use crate::plan::{alternate, query_reference, EvaluationPlan, CONSTANT_INPUT};
use rescore_core::{ScoredHit, Tensor};
use std::collections::HashMap;
use tracing::debug;

/// Rescores hits against one plan with one query's resolved inputs
///
/// Cheap to construct; holds only borrows. A fresh evaluator instance is
/// created per hit, so rescoring calls are independent and safe to fan out
/// if the caller parallelizes the window.
#[derive(Debug)]
pub struct HitRescorer<'a> {
    plan: &'a EvaluationPlan,
    inputs: &'a QueryInputs,
}

impl<'a> HitRescorer<'a> {
    /// Create a rescorer for one (plan, resolved query inputs) pair
    pub fn new(plan: &'a EvaluationPlan, inputs: &'a QueryInputs) -> Self {
        HitRescorer { plan, inputs }
    }

    /// Compute the hit's new score, or `None` if it cannot be rescored
    ///
    /// `normalizer_outputs` maps normalizer names to this hit's transformed
    /// values; empty for hits carrying no normalizer inputs. Failure here is
    /// never fatal: the hit keeps its score and is rescaled with the tail.
    pub fn rescore(
        &self,
        hit: &ScoredHit,
        normalizer_outputs: &HashMap<String, f64>,
    ) -> Option<f64> {
        let mut evaluator = self.plan.factory().create();

        for name in evaluator.required_inputs() {
            if let Some(&output) = normalizer_outputs.get(name.as_str()) {
                if let Err(e) = evaluator.bind(&name, Tensor::scalar(output)) {
                    debug!(target: "rescore::rerank", hit = hit.id(), error = %e, "Bind failed");
                    return None;
                }
                continue;
            }

            if let Some(inner) = query_inner(&name) {
                if self.inputs.is_skipped(inner) {
                    continue;
                }
                match self.inputs.value(inner) {
                    Some(value) => {
                        if let Err(e) = evaluator.bind(&name, value.clone()) {
                            debug!(target: "rescore::rerank", hit = hit.id(), error = %e, "Bind failed");
                            return None;
                        }
                    }
                    // Resolution happens before any hit is rescored, so this
                    // only triggers for inputs outside the plan's buckets
                    None => {
                        debug!(
                            target: "rescore::rerank",
                            hit = hit.id(),
                            input = inner,
                            "Query input unresolved; hit not rescored"
                        );
                        return None;
                    }
                }
                continue;
            }

            let value = hit
                .feature(&name)
                .or_else(|| hit.feature(&alternate(&name)));
            match value {
                Some(value) => {
                    if let Err(e) = evaluator.bind(&name, value.clone()) {
                        debug!(target: "rescore::rerank", hit = hit.id(), error = %e, "Bind failed");
                        return None;
                    }
                }
                None => {
                    debug!(
                        target: "rescore::rerank",
                        hit = hit.id(),
                        feature = name.as_str(),
                        "Match-feature missing under both names; hit not rescored"
                    );
                    return None;
                }
            }
        }

        match evaluator.evaluate() {
            Ok(score) => Some(score),
            Err(e) => {
                debug!(target: "rescore::rerank", hit = hit.id(), error = %e, "Evaluation failed");
                None
            }
        }
    }
}

/// The query-binding key for a required input name, if it is query-sourced
fn query_inner(name: &str) -> Option<&str> {
    if name == CONSTANT_INPUT {
        Some(name)
    } else {
        query_reference(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{EvaluatorRegistry, LinearEvaluatorFactory};
    use rescore_core::profile::{NormalizerDecl, RankProfile, PROP_GLOBAL_EXPRESSION, PROP_MATCH_FEATURE};
    use rescore_core::Query;
    use std::sync::Arc;

    fn build_plan(profile: RankProfile, weights: Vec<(String, f64)>) -> EvaluationPlan {
        let registry = EvaluatorRegistry::new().register(
            "music",
            "expr",
            Arc::new(LinearEvaluatorFactory::new(weights)),
        );
        EvaluationPlan::build("music", &profile, &registry)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_rescore_binds_all_three_sources() {
        let profile = RankProfile::new("default")
            .with_property(PROP_GLOBAL_EXPRESSION, "expr")
            .with_property(PROP_MATCH_FEATURE, "bm25")
            .with_normalizer(NormalizerDecl::linear("norm", "query(freshness)"));
        let plan = build_plan(
            profile,
            vec![
                ("query(weight)".to_string(), 1.0),
                ("norm".to_string(), 10.0),
                ("bm25".to_string(), 2.0),
            ],
        );
        let query = Query::new("default")
            .with_feature("weight", 5.0)
            .with_feature("freshness", 0.5);
        let inputs = QueryInputs::resolve(&plan, &query).unwrap();

        let hit = ScoredHit::new("doc", 1.0).with_feature("bm25", 3.0);
        let outputs = HashMap::from([("norm".to_string(), 0.5)]);

        let score = HitRescorer::new(&plan, &inputs).rescore(&hit, &outputs);
        // 1*5 + 10*0.5 + 2*3
        assert_eq!(score, Some(16.0));
    }

    #[test]
    fn test_rescore_uses_aliased_feature_name() {
        let profile = RankProfile::new("default")
            .with_property(PROP_GLOBAL_EXPRESSION, "expr")
            .with_property(PROP_MATCH_FEATURE, "rankingExpression(mlscore)");
        let plan = build_plan(
            profile,
            vec![("rankingExpression(mlscore)".to_string(), 1.0)],
        );
        let query = Query::new("default");
        let inputs = QueryInputs::resolve(&plan, &query).unwrap();

        // The hit carries the feature under the unwrapped name
        let hit = ScoredHit::new("doc", 1.0).with_feature("mlscore", 4.0);
        let score = HitRescorer::new(&plan, &inputs).rescore(&hit, &HashMap::new());
        assert_eq!(score, Some(4.0));
    }

    #[test]
    fn test_missing_feature_is_not_rescored() {
        let profile = RankProfile::new("default")
            .with_property(PROP_GLOBAL_EXPRESSION, "expr")
            .with_property(PROP_MATCH_FEATURE, "bm25");
        let plan = build_plan(profile, vec![("bm25".to_string(), 1.0)]);
        let inputs = QueryInputs::resolve(&plan, &Query::new("default")).unwrap();

        let hit = ScoredHit::new("doc", 1.0);
        let score = HitRescorer::new(&plan, &inputs).rescore(&hit, &HashMap::new());
        assert_eq!(score, None);
    }
}
