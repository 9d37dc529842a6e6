//! Optimization inputs and outputs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixed-shape numeric summary of portfolio/market/sentiment state.
///
/// Rebuilt on every call; absent names read as 0 so the engine degrades
/// gracefully on partial data. Ordered map keeps serialized output stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureVector(BTreeMap<String, f64>);

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }

    /// Value for `name`, defaulting to 0.0 when absent.
    pub fn get(&self, name: &str) -> f64 {
        self.0.get(name).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Which strategy produced a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationMethod {
    Model,
    Rule,
}

/// Per-factor contribution of the rule strategy, in percent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorBreakdown {
    pub base_reduction: f64,
    pub volatility_factor: f64,
    pub index_factor: f64,
    pub sentiment_factor: f64,
    pub correlation_factor: f64,
}

/// Margin recommendation value object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub current_margin: f64,
    pub optimized_margin: f64,
    pub reduction_percent: f64,
    pub potential_savings: f64,
    pub method: OptimizationMethod,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factors: Option<FactorBreakdown>,
}
