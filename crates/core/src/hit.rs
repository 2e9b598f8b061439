//! Scored hits and the hierarchical result set
//!
//! This module provides:
//! - ScoredHit: one result with a mutable relevance and read-only
//!   match-features
//! - ResultNode / ResultSet: the possibly-hierarchical hit collection with a
//!   flat, meta/group-skipping walk over the scorable hits
//!
//! The reranking pipeline does not own hits; it mutates their relevance in
//! place and strips hidden match-features before the result leaves the
//! serving path.

use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// ScoredHit
// ============================================================================

/// A single search result carrying a relevance score and match-features
///
/// Match-features are named values precomputed by first-phase ranking and
/// attached to the hit; the global phase reads them without recomputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredHit {
    /// Opaque hit identity (document id, URI, ...)
    id: String,
    /// Current relevance; mutated in place by reranking
    relevance: f64,
    /// Named feature values from first-phase ranking
    features: HashMap<String, Tensor>,
}

impl ScoredHit {
    /// Create a new hit with no match-features
    pub fn new(id: impl Into<String>, relevance: f64) -> Self {
        ScoredHit {
            id: id.into(),
            relevance,
            features: HashMap::new(),
        }
    }

    /// Builder: attach a match-feature
    pub fn with_feature(mut self, name: impl Into<String>, value: impl Into<Tensor>) -> Self {
        self.features.insert(name.into(), value.into());
        self
    }

    /// Hit identity
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current relevance score
    pub fn relevance(&self) -> f64 {
        self.relevance
    }

    /// Overwrite the relevance score
    pub fn set_relevance(&mut self, relevance: f64) {
        self.relevance = relevance;
    }

    /// Look up a match-feature by exact name
    pub fn feature(&self, name: &str) -> Option<&Tensor> {
        self.features.get(name)
    }

    /// All match-features
    pub fn features(&self) -> &HashMap<String, Tensor> {
        &self.features
    }

    /// Remove a match-feature, returning it if present
    ///
    /// Used to strip features configured as hidden before the result leaves
    /// the serving path.
    pub fn remove_feature(&mut self, name: &str) -> Option<Tensor> {
        self.features.remove(name)
    }
}

// ============================================================================
// ResultNode / ResultSet
// ============================================================================

/// One node of a result tree
#[derive(Debug, Clone)]
pub enum ResultNode {
    /// A concrete, scorable hit
    Hit(ScoredHit),
    /// A meta hit (error reports, continuations); never rescored
    Meta {
        /// Opaque meta-hit identity
        id: String,
    },
    /// A nested group of result nodes
    ///
    /// Groups produced by a grouping request (`grouping == true`) are opaque
    /// to reranking: nothing inside them is rescored. This mirrors a known
    /// limitation of the serving system rather than fixing it.
    Group {
        /// Whether this group is a grouping sub-result
        grouping: bool,
        /// Child nodes
        children: Vec<ResultNode>,
    },
}

impl ResultNode {
    /// Sort key used by [`ResultSet::sort_by_relevance`]
    ///
    /// Non-hit nodes sort ahead of every hit and keep their relative order
    /// (the sort is stable).
    fn sort_key(&self) -> f64 {
        match self {
            ResultNode::Hit(hit) => hit.relevance(),
            _ => f64::INFINITY,
        }
    }
}

/// An ordered, possibly hierarchical collection of result nodes
///
/// The upstream search chain produces this; reranking mutates hit scores in
/// place and re-sorts. Iteration order of `scorable_hits_mut` is the node
/// order of a depth-first walk.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    nodes: Vec<ResultNode>,
}

impl ResultSet {
    /// Create an empty result set
    pub fn new() -> Self {
        ResultSet { nodes: Vec::new() }
    }

    /// Create a result set from nodes
    pub fn from_nodes(nodes: Vec<ResultNode>) -> Self {
        ResultSet { nodes }
    }

    /// Append a node
    pub fn push(&mut self, node: ResultNode) {
        self.nodes.push(node);
    }

    /// All nodes, in order
    pub fn nodes(&self) -> &[ResultNode] {
        &self.nodes
    }

    /// Collect mutable references to every scorable hit
    ///
    /// Depth-first walk that yields hits, descends into plain groups, and
    /// skips meta hits and the entire contents of grouping sub-results.
    pub fn scorable_hits_mut(&mut self) -> Vec<&mut ScoredHit> {
        let mut out = Vec::new();
        collect_scorable(&mut self.nodes, &mut out);
        out
    }

    /// Read-only counterpart of [`Self::scorable_hits_mut`]
    pub fn scorable_hits(&self) -> Vec<&ScoredHit> {
        let mut out = Vec::new();
        collect_scorable_ref(&self.nodes, &mut out);
        out
    }

    /// Stable-sort hits by relevance, descending, at every non-grouping level
    ///
    /// Non-hit nodes stay ahead of hits and keep their relative order.
    /// Grouping sub-results are left untouched.
    pub fn sort_by_relevance(&mut self) {
        sort_nodes(&mut self.nodes);
    }
}

fn collect_scorable<'a>(nodes: &'a mut [ResultNode], out: &mut Vec<&'a mut ScoredHit>) {
    for node in nodes {
        match node {
            ResultNode::Hit(hit) => out.push(hit),
            ResultNode::Group {
                grouping: false,
                children,
            } => collect_scorable(children, out),
            _ => {}
        }
    }
}

fn collect_scorable_ref<'a>(nodes: &'a [ResultNode], out: &mut Vec<&'a ScoredHit>) {
    for node in nodes {
        match node {
            ResultNode::Hit(hit) => out.push(hit),
            ResultNode::Group {
                grouping: false,
                children,
            } => collect_scorable_ref(children, out),
            _ => {}
        }
    }
}

fn sort_nodes(nodes: &mut [ResultNode]) {
    for node in nodes.iter_mut() {
        if let ResultNode::Group {
            grouping: false,
            children,
        } = node
        {
            sort_nodes(children);
        }
    }
    // Vec::sort_by is stable; ties and non-hit nodes keep upstream order
    nodes.sort_by(|a, b| {
        b.sort_key()
            .partial_cmp(&a.sort_key())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, relevance: f64) -> ResultNode {
        ResultNode::Hit(ScoredHit::new(id, relevance))
    }

    #[test]
    fn test_hit_accessors() {
        let mut h = ScoredHit::new("doc1", 0.5).with_feature("bm25", 12.0);
        assert_eq!(h.id(), "doc1");
        assert_eq!(h.relevance(), 0.5);
        assert_eq!(h.feature("bm25").and_then(Tensor::as_scalar), Some(12.0));
        h.set_relevance(0.9);
        assert_eq!(h.relevance(), 0.9);
        assert!(h.remove_feature("bm25").is_some());
        assert!(h.feature("bm25").is_none());
    }

    #[test]
    fn test_scorable_walk_skips_meta() {
        let mut result = ResultSet::from_nodes(vec![
            hit("a", 1.0),
            ResultNode::Meta {
                id: "error".to_string(),
            },
            hit("b", 2.0),
        ]);
        assert_eq!(result.scorable_hits_mut().len(), 2);
        let names: Vec<&str> = result.scorable_hits().iter().map(|h| h.id()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_scorable_walk_descends_plain_groups() {
        let mut result = ResultSet::from_nodes(vec![
            hit("a", 1.0),
            ResultNode::Group {
                grouping: false,
                children: vec![hit("b", 2.0), hit("c", 3.0)],
            },
        ]);
        assert_eq!(result.scorable_hits_mut().len(), 3);
    }

    #[test]
    fn test_scorable_walk_skips_grouping_subresults() {
        let mut result = ResultSet::from_nodes(vec![
            hit("a", 1.0),
            ResultNode::Group {
                grouping: true,
                children: vec![hit("grouped", 9.0)],
            },
        ]);
        let hits = result.scorable_hits_mut();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id(), "a");
    }

    #[test]
    fn test_sort_by_relevance_descending() {
        let mut result = ResultSet::from_nodes(vec![hit("low", 0.1), hit("high", 0.9)]);
        result.sort_by_relevance();
        let names: Vec<&str> = result.scorable_hits().iter().map(|h| h.id()).collect();
        assert_eq!(names, vec!["high", "low"]);
    }

    #[test]
    fn test_sort_keeps_meta_first() {
        let mut result = ResultSet::from_nodes(vec![
            hit("low", 0.1),
            ResultNode::Meta {
                id: "meta".to_string(),
            },
            hit("high", 0.9),
        ]);
        result.sort_by_relevance();
        assert!(matches!(result.nodes()[0], ResultNode::Meta { .. }));
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let mut result = ResultSet::from_nodes(vec![hit("first", 0.5), hit("second", 0.5)]);
        result.sort_by_relevance();
        let names: Vec<&str> = result.scorable_hits().iter().map(|h| h.id()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_sort_leaves_grouping_subresults_untouched() {
        let mut result = ResultSet::from_nodes(vec![ResultNode::Group {
            grouping: true,
            children: vec![hit("z", 0.1), hit("y", 0.9)],
        }]);
        result.sort_by_relevance();
        match &result.nodes()[0] {
            ResultNode::Group { children, .. } => match &children[0] {
                ResultNode::Hit(h) => assert_eq!(h.id(), "z"),
                _ => panic!("expected hit"),
            },
            _ => panic!("expected group"),
        }
    }
}
