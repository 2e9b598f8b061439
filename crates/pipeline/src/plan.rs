//! Evaluation plan construction
//!
//! This module provides:
//! - EvaluationPlan: the immutable per-(schema, rank-profile) compilation of
//!   a global-phase function's inputs
//! - NormalizerSetup / ScalarSource: per-normalizer configuration
//! - The input classification algorithm
//! - alternate(): the match-feature alias helper
//!
//! Building a plan happens once per (schema, rank-profile) key at first use;
//! queries only ever read the result. Classification is total: every required
//! argument of the global-phase function lands in exactly one of the three
//! provenance buckets (query, normalizer, match-feature) or the build fails
//! with a configuration error before any query uses the plan.

use crate::evaluator::{EvaluatorFactory, EvaluatorRegistry};
use crate::normalizer::{Normalizer, NormalizerKind};
use rescore_core::error::{Error, Result};
use rescore_core::profile::{
    NormalizerDecl, RankProfile, PROP_FEATURE_RENAME, PROP_GLOBAL_EXPRESSION,
    PROP_HIDE_MATCH_FEATURE, PROP_MATCH_FEATURE, PROP_RERANK_COUNT,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Rerank window size used when the property is absent or non-positive
pub const DEFAULT_RERANK_COUNT: usize = 100;

const EXPRESSION_WRAPPER: &str = "rankingExpression(";

// ============================================================================
// Name helpers
// ============================================================================

/// The alternate form of a match-feature name
///
/// Features computed from ranking expressions appear under a wrapped name.
/// `alternate("rankingExpression(foo)")` is `"foo"`; `alternate("foo")` is
/// `"rankingExpression(foo)"`. Applying it twice to a simple name returns
/// the original.
pub fn alternate(name: &str) -> String {
    match name
        .strip_prefix(EXPRESSION_WRAPPER)
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => inner.to_string(),
        None => format!("{EXPRESSION_WRAPPER}{name})"),
    }
}

/// The inner name of a simple `query(X)` reference, if `name` is one
pub(crate) fn query_reference(name: &str) -> Option<&str> {
    name.strip_prefix("query(")?.strip_suffix(')')
}

/// Inputs literally named `constant` resolve inside the evaluator; they are
/// recorded as query-sourced but never bound and never treated as missing.
pub(crate) const CONSTANT_INPUT: &str = "constant";

// ============================================================================
// ScalarSource / NormalizerSetup
// ============================================================================

/// Where a normalizer's raw per-hit value comes from
///
/// Deliberately smaller than the full three-way input classification:
/// normalizer inputs cannot reference other normalizers, and this enum makes
/// that a structural fact instead of a runtime check.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarSource {
    /// A query ranking feature, resolved once per query
    Query(String),
    /// A per-hit match-feature
    MatchFeature(String),
}

/// Configuration of one normalizer referenced by the global-phase function
#[derive(Debug, Clone)]
pub struct NormalizerSetup {
    name: String,
    source: ScalarSource,
    kind: NormalizerKind,
    capacity: usize,
}

impl NormalizerSetup {
    /// Name the function refers to this normalizer by
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw input source
    pub fn source(&self) -> &ScalarSource {
        &self.source
    }

    /// Algorithm and parameters
    pub fn kind(&self) -> NormalizerKind {
        self.kind
    }

    /// Create a fresh per-query instance sized to the rerank window
    pub fn instantiate(&self) -> Normalizer {
        Normalizer::new(self.kind, self.capacity)
    }
}

// ============================================================================
// EvaluationPlan
// ============================================================================

/// Immutable evaluation plan for one (schema, rank-profile) pair
///
/// Holds everything a query needs to run the global phase: the evaluator
/// factory, the rerank window size, the classified input lists, the
/// normalizer setups, and the match-features to hide from output.
pub struct EvaluationPlan {
    factory: Arc<dyn EvaluatorFactory>,
    rerank_count: usize,
    from_query: Vec<String>,
    from_match_features: Vec<String>,
    normalizers: Vec<NormalizerSetup>,
    hidden_features: HashSet<String>,
}

impl EvaluationPlan {
    /// Build the plan for a profile, or `None` when the profile configures
    /// no global-phase function
    ///
    /// Any `Err` is a configuration error fatal to this profile only; the
    /// caller caches a "no plan" sentinel so queries degrade to a no-op.
    pub fn build(
        schema: &str,
        profile: &RankProfile,
        registry: &EvaluatorRegistry,
    ) -> Result<Option<EvaluationPlan>> {
        let expression = match profile.property(PROP_GLOBAL_EXPRESSION) {
            Some(expr) => expr,
            None => return Ok(None),
        };

        let rerank_count = parse_rerank_count(profile)?;
        let match_features = collect_match_features(profile);
        let hidden_features: HashSet<String> = profile
            .property_values(PROP_HIDE_MATCH_FEATURE)
            .into_iter()
            .map(str::to_string)
            .collect();

        let factory = registry.get(schema, expression).ok_or_else(|| {
            Error::UnknownExpression {
                schema: schema.to_string(),
                expression: expression.to_string(),
            }
        })?;

        // Instantiate the function once to learn its required arguments
        let required = factory.create().required_inputs();

        let mut from_query = Vec::new();
        let mut from_match_features = Vec::new();
        let mut normalizers = Vec::new();

        for arg in &required {
            if arg == CONSTANT_INPUT {
                from_query.push(arg.clone());
            } else if let Some(inner) = query_reference(arg) {
                from_query.push(inner.to_string());
            } else if let Some(decl) = profile.normalizer(arg) {
                let source = classify_normalizer_input(decl, &match_features)?;
                normalizers.push(NormalizerSetup {
                    name: arg.clone(),
                    source,
                    kind: NormalizerKind::from(decl),
                    capacity: rerank_count,
                });
            } else if match_features.contains(arg.as_str()) {
                from_match_features.push(arg.clone());
            } else {
                return Err(Error::UnclassifiableInput(arg.clone()));
            }
        }

        Ok(Some(EvaluationPlan {
            factory,
            rerank_count,
            from_query,
            from_match_features,
            normalizers,
            hidden_features,
        }))
    }

    /// The evaluator factory for the compiled global-phase function
    pub fn factory(&self) -> &Arc<dyn EvaluatorFactory> {
        &self.factory
    }

    /// Rerank window size; always positive
    pub fn rerank_count(&self) -> usize {
        self.rerank_count
    }

    /// Query-sourced input names (inner names, without the `query(...)` wrap)
    pub fn from_query(&self) -> &[String] {
        &self.from_query
    }

    /// Match-feature-sourced input names
    pub fn from_match_features(&self) -> &[String] {
        &self.from_match_features
    }

    /// Normalizer setups, in function-argument order
    pub fn normalizers(&self) -> &[NormalizerSetup] {
        &self.normalizers
    }

    /// Match-features to strip from hits before the result leaves serving
    pub fn hidden_features(&self) -> &HashSet<String> {
        &self.hidden_features
    }
}

impl std::fmt::Debug for EvaluationPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationPlan")
            .field("factory", &self.factory.name())
            .field("rerank_count", &self.rerank_count)
            .field("from_query", &self.from_query)
            .field("from_match_features", &self.from_match_features)
            .field("normalizers", &self.normalizers)
            .field("hidden_features", &self.hidden_features)
            .finish()
    }
}

// ============================================================================
// Builder internals
// ============================================================================

fn parse_rerank_count(profile: &RankProfile) -> Result<usize> {
    match profile.property(PROP_RERANK_COUNT) {
        None => Ok(DEFAULT_RERANK_COUNT),
        Some(raw) => {
            let parsed: i64 = raw
                .trim()
                .parse()
                .map_err(|_| Error::MalformedRerankCount(raw.to_string()))?;
            if parsed > 0 {
                Ok(parsed as usize)
            } else {
                Ok(DEFAULT_RERANK_COUNT)
            }
        }
    }
}

/// Collect the declared match-features and apply the rename pairs
fn collect_match_features(profile: &RankProfile) -> HashSet<String> {
    let mut features: HashSet<String> = profile
        .property_values(PROP_MATCH_FEATURE)
        .into_iter()
        .map(str::to_string)
        .collect();

    let renames = profile.property_values(PROP_FEATURE_RENAME);
    for pair in renames.chunks(2) {
        match pair {
            [old, new] => {
                if features.remove(*old) {
                    features.insert((*new).to_string());
                }
            }
            [dangling] => {
                warn!(
                    target: "rescore::plan",
                    profile = profile.name(),
                    value = *dangling,
                    "Ignoring dangling feature-rename value without a partner"
                );
            }
            _ => unreachable!(),
        }
    }
    features
}

/// Classify a normalizer's single declared input
///
/// Restricted to the two non-recursive cases: a query reference or a known
/// match-feature. Anything else is a configuration error.
fn classify_normalizer_input(
    decl: &NormalizerDecl,
    match_features: &HashSet<String>,
) -> Result<ScalarSource> {
    if let Some(inner) = query_reference(&decl.input) {
        Ok(ScalarSource::Query(inner.to_string()))
    } else if match_features.contains(decl.input.as_str()) {
        Ok(ScalarSource::MatchFeature(decl.input.clone()))
    } else {
        Err(Error::NormalizerInput {
            name: decl.name.clone(),
            input: decl.input.clone(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::LinearEvaluatorFactory;
    use rescore_core::profile::NormalizerDecl;

    fn registry_for(inputs: &[&str]) -> EvaluatorRegistry {
        let weights = inputs.iter().map(|n| (n.to_string(), 1.0)).collect();
        EvaluatorRegistry::new().register(
            "music",
            "expr",
            Arc::new(LinearEvaluatorFactory::new(weights)),
        )
    }

    fn base_profile() -> RankProfile {
        RankProfile::new("default").with_property(PROP_GLOBAL_EXPRESSION, "expr")
    }

    #[test]
    fn test_alternate_unwraps_and_wraps() {
        assert_eq!(alternate("rankingExpression(foo)"), "foo");
        assert_eq!(alternate("foo"), "rankingExpression(foo)");
        assert_eq!(alternate(&alternate("foo")), "foo");
        assert_eq!(alternate(&alternate("bar_baz")), "bar_baz");
    }

    #[test]
    fn test_query_reference() {
        assert_eq!(query_reference("query(weight)"), Some("weight"));
        assert_eq!(query_reference("weight"), None);
        assert_eq!(query_reference("query(weight"), None);
    }

    #[test]
    fn test_no_expression_means_no_plan() {
        let profile = RankProfile::new("default");
        let plan = EvaluationPlan::build("music", &profile, &registry_for(&[])).unwrap();
        assert!(plan.is_none());
    }

    #[test]
    fn test_classification_buckets() {
        let profile = base_profile()
            .with_property(PROP_MATCH_FEATURE, "bm25")
            .with_normalizer(NormalizerDecl::linear("norm_fresh", "query(freshness)"));
        let registry = registry_for(&["query(weight)", "norm_fresh", "bm25"]);

        let plan = EvaluationPlan::build("music", &profile, &registry)
            .unwrap()
            .unwrap();

        assert_eq!(plan.from_query(), ["weight"]);
        assert_eq!(plan.from_match_features(), ["bm25"]);
        assert_eq!(plan.normalizers().len(), 1);
        assert_eq!(plan.normalizers()[0].name(), "norm_fresh");
        assert_eq!(
            plan.normalizers()[0].source(),
            &ScalarSource::Query("freshness".to_string())
        );
    }

    #[test]
    fn test_constant_is_query_sourced() {
        let plan = EvaluationPlan::build("music", &base_profile(), &registry_for(&["constant"]))
            .unwrap()
            .unwrap();
        assert_eq!(plan.from_query(), ["constant"]);
    }

    #[test]
    fn test_unclassifiable_input_fails_setup() {
        let result = EvaluationPlan::build("music", &base_profile(), &registry_for(&["mystery"]));
        assert!(matches!(result, Err(Error::UnclassifiableInput(name)) if name == "mystery"));
    }

    #[test]
    fn test_normalizer_over_match_feature() {
        let profile = base_profile()
            .with_property(PROP_MATCH_FEATURE, "closeness")
            .with_normalizer(NormalizerDecl::reciprocal_rank("rr", "closeness", 60.0));
        let plan = EvaluationPlan::build("music", &profile, &registry_for(&["rr"]))
            .unwrap()
            .unwrap();
        assert_eq!(
            plan.normalizers()[0].source(),
            &ScalarSource::MatchFeature("closeness".to_string())
        );
        assert_eq!(
            plan.normalizers()[0].kind(),
            NormalizerKind::ReciprocalRank { k: 60.0 }
        );
    }

    #[test]
    fn test_normalizer_with_unresolvable_input_fails_setup() {
        let profile =
            base_profile().with_normalizer(NormalizerDecl::linear("norm", "unknown_feature"));
        let result = EvaluationPlan::build("music", &profile, &registry_for(&["norm"]));
        assert!(matches!(result, Err(Error::NormalizerInput { .. })));
    }

    #[test]
    fn test_normalizer_name_shadows_match_feature() {
        // Classification checks normalizers before the match-feature set
        let profile = base_profile()
            .with_property(PROP_MATCH_FEATURE, "norm")
            .with_property(PROP_MATCH_FEATURE, "raw")
            .with_normalizer(NormalizerDecl::linear("norm", "raw"));
        let plan = EvaluationPlan::build("music", &profile, &registry_for(&["norm"]))
            .unwrap()
            .unwrap();
        assert_eq!(plan.normalizers().len(), 1);
        assert!(plan.from_match_features().is_empty());
    }

    #[test]
    fn test_rerank_count_default_and_negative() {
        let plan = EvaluationPlan::build("music", &base_profile(), &registry_for(&[]))
            .unwrap()
            .unwrap();
        assert_eq!(plan.rerank_count(), DEFAULT_RERANK_COUNT);

        let profile = base_profile().with_property(PROP_RERANK_COUNT, "-5");
        let plan = EvaluationPlan::build("music", &profile, &registry_for(&[]))
            .unwrap()
            .unwrap();
        assert_eq!(plan.rerank_count(), DEFAULT_RERANK_COUNT);
    }

    #[test]
    fn test_rerank_count_configured() {
        let profile = base_profile().with_property(PROP_RERANK_COUNT, "7");
        let plan = EvaluationPlan::build("music", &profile, &registry_for(&[]))
            .unwrap()
            .unwrap();
        assert_eq!(plan.rerank_count(), 7);
    }

    #[test]
    fn test_rerank_count_malformed_fails_setup() {
        let profile = base_profile().with_property(PROP_RERANK_COUNT, "lots");
        let result = EvaluationPlan::build("music", &profile, &registry_for(&[]));
        assert!(matches!(result, Err(Error::MalformedRerankCount(_))));
    }

    #[test]
    fn test_feature_rename_applies_to_match_feature_set() {
        let profile = base_profile()
            .with_property(PROP_MATCH_FEATURE, "old_name")
            .with_property(PROP_FEATURE_RENAME, "old_name")
            .with_property(PROP_FEATURE_RENAME, "new_name");
        let plan = EvaluationPlan::build("music", &profile, &registry_for(&["new_name"]))
            .unwrap()
            .unwrap();
        assert_eq!(plan.from_match_features(), ["new_name"]);

        // The old name is no longer classifiable
        let result = EvaluationPlan::build("music", &profile, &registry_for(&["old_name"]));
        assert!(matches!(result, Err(Error::UnclassifiableInput(_))));
    }

    #[test]
    fn test_hidden_features_collected() {
        let profile = base_profile()
            .with_property(PROP_HIDE_MATCH_FEATURE, "internal_a")
            .with_property(PROP_HIDE_MATCH_FEATURE, "internal_b");
        let plan = EvaluationPlan::build("music", &profile, &registry_for(&[]))
            .unwrap()
            .unwrap();
        assert_eq!(plan.hidden_features().len(), 2);
        assert!(plan.hidden_features().contains("internal_a"));
    }

    #[test]
    fn test_unknown_expression_fails_setup() {
        let profile = RankProfile::new("default").with_property(PROP_GLOBAL_EXPRESSION, "missing");
        let result = EvaluationPlan::build("music", &profile, &registry_for(&[]));
        assert!(matches!(result, Err(Error::UnknownExpression { .. })));
    }
}
