//! Error types for the rescore pipeline
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Two taxonomies live in the same enum:
//! - Configuration errors: fatal to one rank profile at setup time. The plan
//!   cache stores a "no plan" sentinel for the affected profile, so queries
//!   against it degrade to a no-op rerank instead of failing.
//! - Runtime degradations: per-query or per-hit, never fatal. The orchestrator
//!   catches them internally; nothing propagates to the caller.

use thiserror::Error;

/// Result type alias for rescore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the rescore pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// A global-phase function argument could not be classified as
    /// query-sourced, normalizer-sourced, or match-feature-sourced (setup time)
    #[error("unclassifiable global-phase input: {0}")]
    UnclassifiableInput(String),

    /// The rerank-count property was present but not an integer (setup time)
    #[error("malformed rerank-count property: {0:?}")]
    MalformedRerankCount(String),

    /// A normalizer's declared input feature is neither a query reference
    /// nor a known match-feature (setup time)
    #[error("normalizer {name}: unresolvable input {input:?}")]
    NormalizerInput {
        /// Normalizer name as configured
        name: String,
        /// The input feature name that failed to resolve
        input: String,
    },

    /// Unknown normalizer algorithm tag in the configuration (setup time)
    #[error("unknown normalizer algorithm: {0:?}")]
    UnknownAlgorithm(String),

    /// The profile names a global-phase expression no evaluator factory was
    /// registered for (setup time)
    #[error("no evaluator registered for expression {expression:?} in schema {schema:?}")]
    UnknownExpression {
        /// Schema the profile belongs to
        schema: String,
        /// Expression id from the global-phase marker property
        expression: String,
    },

    /// A query-sourced input was present in neither the query's ranking
    /// features nor (as a single value) its ranking properties (per query)
    #[error("missing query input: {0}")]
    MissingQueryInput(String),

    /// An input name was bound that the evaluator does not require,
    /// or was bound twice (per hit)
    #[error("invalid binding for input: {0}")]
    InvalidBinding(String),

    /// The scoring function was invoked before all required inputs were bound
    /// (per hit)
    #[error("evaluation attempted with unbound inputs: {0:?}")]
    UnboundInputs(Vec<String>),

    /// The external evaluator failed to produce a score (per hit)
    #[error("evaluator error: {0}")]
    Evaluator(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unclassifiable() {
        let err = Error::UnclassifiableInput("mystery(x)".to_string());
        let msg = err.to_string();
        assert!(msg.contains("unclassifiable"));
        assert!(msg.contains("mystery(x)"));
    }

    #[test]
    fn test_error_display_malformed_rerank_count() {
        let err = Error::MalformedRerankCount("lots".to_string());
        assert!(err.to_string().contains("rerank-count"));
        assert!(err.to_string().contains("lots"));
    }

    #[test]
    fn test_error_display_normalizer_input() {
        let err = Error::NormalizerInput {
            name: "norm".to_string(),
            input: "ghost_feature".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("norm"));
        assert!(msg.contains("ghost_feature"));
    }

    #[test]
    fn test_error_display_missing_query_input() {
        let err = Error::MissingQueryInput("weight".to_string());
        assert!(err.to_string().contains("weight"));
    }

    #[test]
    fn test_error_display_unbound_inputs() {
        let err = Error::UnboundInputs(vec!["a".to_string(), "b".to_string()]);
        let msg = err.to_string();
        assert!(msg.contains("a"));
        assert!(msg.contains("b"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(7)
        }
        assert_eq!(returns_result().unwrap(), 7);
    }

    #[test]
    fn test_error_pattern_matching() {
        let err = Error::NormalizerInput {
            name: "n".to_string(),
            input: "i".to_string(),
        };
        match err {
            Error::NormalizerInput { name, input } => {
                assert_eq!(name, "n");
                assert_eq!(input, "i");
            }
            _ => panic!("Wrong error variant"),
        }
    }
}
