//! Rank-profile configuration surface
//!
//! This module provides:
//! - Property-key constants consumed by the evaluation plan builder
//! - RankProfile: the opaque property list plus normalizer declarations
//! - NormalizerDecl / NormalizerAlgo: per-normalizer configuration
//! - ProfileRegistry: read-only (schema, profile) lookup, built once at
//!   config load and injected into the orchestrator
//!
//! Properties are opaque name/value string pairs produced by the surrounding
//! configuration system; keys may repeat. The builder only interprets the
//! keys named here.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

// ============================================================================
// Property keys
// ============================================================================

/// Size of the rerank window; negative or absent means the default of 100
pub const PROP_RERANK_COUNT: &str = "global-phase.rerank-count";

/// Marker that a global-phase function exists; the value identifies the
/// compiled expression handed to the evaluator registry
pub const PROP_GLOBAL_EXPRESSION: &str = "global-phase.expression";

/// Match-feature to hide from downstream output (repeatable)
pub const PROP_HIDE_MATCH_FEATURE: &str = "global-phase.hide-match-feature";

/// A match-feature available on every hit (repeatable)
pub const PROP_MATCH_FEATURE: &str = "match-feature";

/// Feature rename, emitted as sequential (old, new) value pairs (repeatable)
pub const PROP_FEATURE_RENAME: &str = "feature-rename";

// ============================================================================
// NormalizerAlgo / NormalizerDecl
// ============================================================================

/// Normalizer algorithm tag, as it appears in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizerAlgo {
    /// Linear min-max into [0, 1]
    Linear,
    /// Reciprocal rank with a configured k parameter
    ReciprocalRank,
}

impl FromStr for NormalizerAlgo {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "LINEAR" => Ok(NormalizerAlgo::Linear),
            "RRANK" => Ok(NormalizerAlgo::ReciprocalRank),
            other => Err(Error::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// One configured normalizer on a rank profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerDecl {
    /// Name the global-phase function refers to this normalizer by
    pub name: String,
    /// The single input feature feeding the normalizer
    pub input: String,
    /// Algorithm tag
    pub algo: NormalizerAlgo,
    /// k parameter; only meaningful for ReciprocalRank, non-negative
    pub k: f64,
}

impl NormalizerDecl {
    /// Create a linear normalizer declaration
    pub fn linear(name: impl Into<String>, input: impl Into<String>) -> Self {
        NormalizerDecl {
            name: name.into(),
            input: input.into(),
            algo: NormalizerAlgo::Linear,
            k: 0.0,
        }
    }

    /// Create a reciprocal-rank normalizer declaration
    pub fn reciprocal_rank(name: impl Into<String>, input: impl Into<String>, k: f64) -> Self {
        NormalizerDecl {
            name: name.into(),
            input: input.into(),
            algo: NormalizerAlgo::ReciprocalRank,
            k,
        }
    }
}

// ============================================================================
// RankProfile
// ============================================================================

/// Configuration of one rank profile, as delivered by the config system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankProfile {
    /// Profile name
    name: String,
    /// Opaque property list; keys may repeat, order is meaningful for
    /// pair-sequenced keys such as feature renames
    properties: Vec<(String, String)>,
    /// Normalizer declarations
    normalizers: Vec<NormalizerDecl>,
}

impl RankProfile {
    /// Create an empty profile
    pub fn new(name: impl Into<String>) -> Self {
        RankProfile {
            name: name.into(),
            properties: Vec::new(),
            normalizers: Vec::new(),
        }
    }

    /// Builder: append a property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    /// Builder: append a normalizer declaration
    pub fn with_normalizer(mut self, decl: NormalizerDecl) -> Self {
        self.normalizers.push(decl);
        self
    }

    /// Profile name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// First value of a property key, if present
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values of a repeatable property key, in configuration order
    pub fn property_values(&self, key: &str) -> Vec<&str> {
        self.properties
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Normalizer declarations
    pub fn normalizers(&self) -> &[NormalizerDecl] {
        &self.normalizers
    }

    /// Find a normalizer declaration by name
    pub fn normalizer(&self, name: &str) -> Option<&NormalizerDecl> {
        self.normalizers.iter().find(|n| n.name == name)
    }
}

// ============================================================================
// ProfileRegistry
// ============================================================================

/// Read-only lookup of rank profiles by (schema, profile name)
///
/// Built once when configuration is loaded, then shared read-only across all
/// query threads. Replaces the mutable component registries of the source
/// system with explicit constructor injection.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: HashMap<(String, String), RankProfile>,
}

impl ProfileRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        ProfileRegistry {
            profiles: HashMap::new(),
        }
    }

    /// Register a profile for a schema; replaces any previous entry
    pub fn register(mut self, schema: impl Into<String>, profile: RankProfile) -> Self {
        self.profiles
            .insert((schema.into(), profile.name().to_string()), profile);
        self
    }

    /// Look up a profile
    pub fn get(&self, schema: &str, profile: &str) -> Option<&RankProfile> {
        self.profiles
            .get(&(schema.to_string(), profile.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================
