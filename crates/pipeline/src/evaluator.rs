//! Evaluator capability seam
//!
//! This module provides:
//! - Evaluator trait: one single-use scoring-function instance
//! - EvaluatorFactory trait: cheap per-hit instantiation
//! - EvaluatorRegistry: read-only (schema, expression) lookup
//! - LinearEvaluator: a weighted-sum reference implementation
//!
//! The real expression/model evaluation engine is an external collaborator;
//! the pipeline only sees these traits. LinearEvaluator exists to validate
//! the seam and to make the crate exercisable without that engine.

use rescore_core::error::{Error, Result};
use rescore_core::Tensor;
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Evaluator / EvaluatorFactory
// ============================================================================

/// A single-use instance of a compiled scoring function
///
/// Lifecycle: created from a factory, fed bindings for every required input,
/// then evaluated once. Instances are never reused across hits or queries.
pub trait Evaluator: Send {
    /// Names of inputs not yet bound
    fn required_inputs(&self) -> Vec<String>;

    /// Bind one input by name
    ///
    /// Binding a name that is not required (or already bound) is an error.
    fn bind(&mut self, name: &str, value: Tensor) -> Result<()>;

    /// Evaluate the function
    ///
    /// Invalid before every required input is bound.
    fn evaluate(&mut self) -> Result<f64>;
}

/// Produces fresh [`Evaluator`] instances for one compiled function
///
/// # Thread Safety
///
/// Factories must be Send + Sync: one factory is shared by all concurrent
/// queries, and per-hit parallel rescoring hands each task its own instance.
pub trait EvaluatorFactory: Send + Sync {
    /// Create a fresh, unbound evaluator instance
    fn create(&self) -> Box<dyn Evaluator>;

    /// Name for debugging and logging
    fn name(&self) -> &str;
}

// ============================================================================
// EvaluatorRegistry
// ============================================================================

/// Read-only lookup of evaluator factories by (schema, expression id)
///
/// Built once at config load from whatever the external evaluation engine
/// compiled, then injected into the orchestrator. Never mutated afterwards.
#[derive(Clone, Default)]
pub struct EvaluatorRegistry {
    factories: HashMap<(String, String), Arc<dyn EvaluatorFactory>>,
}

impl EvaluatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        EvaluatorRegistry {
            factories: HashMap::new(),
        }
    }

    /// Register a factory for a schema's expression
    pub fn register(
        mut self,
        schema: impl Into<String>,
        expression: impl Into<String>,
        factory: Arc<dyn EvaluatorFactory>,
    ) -> Self {
        self.factories
            .insert((schema.into(), expression.into()), factory);
        self
    }

    /// Look up a factory
    pub fn get(&self, schema: &str, expression: &str) -> Option<Arc<dyn EvaluatorFactory>> {
        self.factories
            .get(&(schema.to_string(), expression.to_string()))
            .cloned()
    }
}

impl std::fmt::Debug for EvaluatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorRegistry")
            .field("expressions", &self.factories.len())
            .finish()
    }
}

// ============================================================================
// LinearEvaluator
// ============================================================================

/// Weighted sum over named scalar inputs
///
/// A minimal evaluator to validate the seam: `score = Σ weight_i * input_i`.
/// Non-scalar bindings contribute the sum of their cells. Real deployments
/// plug in the external expression engine instead.
#[derive(Debug)]
pub struct LinearEvaluator {
    weights: Vec<(String, f64)>,
    bound: HashMap<String, f64>,
}

impl Evaluator for LinearEvaluator {
    fn required_inputs(&self) -> Vec<String> {
        self.weights
            .iter()
            .map(|(name, _)| name.clone())
            .filter(|name| !self.bound.contains_key(name))
            .collect()
    }

    fn bind(&mut self, name: &str, value: Tensor) -> Result<()> {
        if !self.weights.iter().any(|(n, _)| n == name) || self.bound.contains_key(name) {
            return Err(Error::InvalidBinding(name.to_string()));
        }
        let scalar = value
            .as_scalar()
            .unwrap_or_else(|| value.cells().iter().sum());
        self.bound.insert(name.to_string(), scalar);
        Ok(())
    }

    fn evaluate(&mut self) -> Result<f64> {
        let missing = self.required_inputs();
        if !missing.is_empty() {
            return Err(Error::UnboundInputs(missing));
        }
        Ok(self
            .weights
            .iter()
            .map(|(name, weight)| weight * self.bound[name])
            .sum())
    }
}

/// Factory for [`LinearEvaluator`] instances
#[derive(Debug, Clone)]
pub struct LinearEvaluatorFactory {
    weights: Vec<(String, f64)>,
}

impl LinearEvaluatorFactory {
    /// Create a factory for the given (input name, weight) terms
    pub fn new(weights: Vec<(String, f64)>) -> Self {
        LinearEvaluatorFactory { weights }
    }
}

impl EvaluatorFactory for LinearEvaluatorFactory {
    fn create(&self) -> Box<dyn Evaluator> {
        Box::new(LinearEvaluator {
            weights: self.weights.clone(),
            bound: HashMap::new(),
        })
    }

    fn name(&self) -> &str {
        "linear"
    }
}

// ============================================================================
// Tests
// ============================================================================
