//! Query-side inputs to reranking
//!
//! A query arrives with the name of the rank profile it runs under, a map of
//! tensor-valued ranking features, and a map of ranking properties. Properties
//! are multi-valued; only entries holding exactly one value can stand in for
//! a missing ranking feature.

use crate::tensor::Tensor;
use std::collections::HashMap;

/// The slice of a query the reranking pipeline reads
#[derive(Debug, Clone)]
pub struct Query {
    /// Active rank profile name
    rank_profile: String,
    /// Tensor-valued ranking features, set by the client or query processing
    ranking_features: HashMap<String, Tensor>,
    /// Ranking properties; possibly multi-valued per name
    ranking_properties: HashMap<String, Vec<Tensor>>,
}

impl Query {
    /// Create a query running under the given rank profile
    pub fn new(rank_profile: impl Into<String>) -> Self {
        Query {
            rank_profile: rank_profile.into(),
            ranking_features: HashMap::new(),
            ranking_properties: HashMap::new(),
        }
    }

    /// Builder: set a ranking feature
    pub fn with_feature(mut self, name: impl Into<String>, value: impl Into<Tensor>) -> Self {
        self.ranking_features.insert(name.into(), value.into());
        self
    }

    /// Builder: append a ranking property value
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Tensor>) -> Self {
        self.ranking_properties
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Active rank profile name
    pub fn rank_profile(&self) -> &str {
        &self.rank_profile
    }

    /// Look up a ranking feature
    pub fn feature(&self, name: &str) -> Option<&Tensor> {
        self.ranking_features.get(name)
    }

    /// All values of a ranking property
    pub fn property(&self, name: &str) -> Option<&[Tensor]> {
        self.ranking_properties.get(name).map(Vec::as_slice)
    }

    /// A ranking property usable as a feature fallback
    ///
    /// Returns the value only when the property holds exactly one value;
    /// multi-valued entries are ambiguous and never used as fallbacks.
    pub fn single_property(&self, name: &str) -> Option<&Tensor> {
        match self.ranking_properties.get(name).map(Vec::as_slice) {
            Some([value]) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_feature_lookup() {
        let query = Query::new("profile").with_feature("weight", 2.0);
        assert_eq!(query.rank_profile(), "profile");
        assert_eq!(query.feature("weight").and_then(Tensor::as_scalar), Some(2.0));
        assert!(query.feature("missing").is_none());
    }

    #[test]
    fn test_single_property_fallback() {
        let query = Query::new("profile").with_property("bias", 0.3);
        assert_eq!(
            query.single_property("bias").and_then(Tensor::as_scalar),
            Some(0.3)
        );
    }

    #[test]
    fn test_multi_valued_property_is_not_a_fallback() {
        let query = Query::new("profile")
            .with_property("bias", 0.3)
            .with_property("bias", 0.4);
        assert_eq!(query.property("bias").map(<[Tensor]>::len), Some(2));
        assert!(query.single_property("bias").is_none());
    }
}
