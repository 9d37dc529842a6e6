//! Margin optimization engine.
//!
//! Two strategies behind one total `optimize` call: a trained regression
//! artifact when one loads, and a deterministic rule formula otherwise. Any
//! model failure is absorbed and the rule path runs, so the caller always
//! gets a recommendation.

use crate::error::{AppError, Result};
use crate::types::{FactorBreakdown, FeatureVector, OptimizationMethod, OptimizationResult};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Bounds on the recommended margin reduction, both strategies.
pub const MIN_REDUCTION: f64 = 0.05;
pub const MAX_REDUCTION: f64 = 0.25;

/// Reported confidence when the trained model produced the number.
pub const MODEL_CONFIDENCE: f64 = 0.85;
/// Reported confidence for the rule fallback.
pub const RULE_CONFIDENCE: f64 = 0.65;

/// A trained regression artifact exported by the offline pipeline.
pub trait ModelArtifact: Send {
    /// Feature names in the column order `predict` expects.
    fn feature_columns(&self) -> &[String];

    /// Predicted margin reduction fraction for one feature row.
    fn predict(&self, row: &[f64]) -> Result<f64>;
}

/// Linear regression artifact, serialized as JSON by the training pipeline.
#[derive(Debug, Deserialize)]
pub struct LinearArtifact {
    columns: Vec<String>,
    weights: Vec<f64>,
    intercept: f64,
}

impl LinearArtifact {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Configuration(format!("cannot read model artifact {}: {e}", path.display()))
        })?;
        let artifact: Self = serde_json::from_str(&raw).map_err(|e| {
            AppError::Configuration(format!("malformed model artifact {}: {e}", path.display()))
        })?;
        if artifact.columns.len() != artifact.weights.len() {
            return Err(AppError::Configuration(format!(
                "model artifact {} has {} columns but {} weights",
                path.display(),
                artifact.columns.len(),
                artifact.weights.len()
            )));
        }
        Ok(artifact)
    }
}

impl ModelArtifact for LinearArtifact {
    fn feature_columns(&self) -> &[String] {
        &self.columns
    }

    fn predict(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.weights.len() {
            return Err(AppError::Validation(format!(
                "feature row has {} values, model expects {}",
                row.len(),
                self.weights.len()
            )));
        }
        let weighted: f64 = row.iter().zip(&self.weights).map(|(x, w)| x * w).sum();
        Ok(self.intercept + weighted)
    }
}

/// Recommends a reduced margin requirement from a feature vector.
pub struct OptimizationEngine {
    model: Option<Box<dyn ModelArtifact>>,
    primary_index: String,
}

impl OptimizationEngine {
    /// Build the engine, attempting to load the model artifact at `path`.
    /// Load failure degrades to rule-only and is logged, never fatal.
    pub fn new(model_path: &Path, primary_index: &str) -> Self {
        let model: Option<Box<dyn ModelArtifact>> = match LinearArtifact::load(model_path) {
            Ok(artifact) => {
                info!(path = %model_path.display(), "margin model loaded");
                Some(Box::new(artifact))
            }
            Err(e) => {
                warn!("model unavailable, running rule-only: {e}");
                None
            }
        };
        Self {
            model,
            primary_index: primary_index.to_string(),
        }
    }

    /// Rule-only engine, for tests and degraded operation.
    pub fn rule_only(primary_index: &str) -> Self {
        Self {
            model: None,
            primary_index: primary_index.to_string(),
        }
    }

    /// Engine with an injected artifact, bypassing the filesystem.
    pub fn with_model(model: Box<dyn ModelArtifact>, primary_index: &str) -> Self {
        Self {
            model: Some(model),
            primary_index: primary_index.to_string(),
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Produce a recommendation for `current_margin`. Total: model errors are
    /// absorbed and the rule strategy answers instead.
    pub fn optimize(&self, features: &FeatureVector, current_margin: f64) -> OptimizationResult {
        if let Some(model) = &self.model {
            match self.model_reduction(model.as_ref(), features) {
                Ok(reduction) => {
                    return self.result(
                        current_margin,
                        reduction,
                        OptimizationMethod::Model,
                        MODEL_CONFIDENCE,
                        None,
                    );
                }
                Err(e) => warn!("model prediction failed, falling back to rule: {e}"),
            }
        }

        let (reduction, factors) = self.rule_reduction(features);
        self.result(
            current_margin,
            reduction,
            OptimizationMethod::Rule,
            RULE_CONFIDENCE,
            Some(factors),
        )
    }

    fn model_reduction(&self, model: &dyn ModelArtifact, features: &FeatureVector) -> Result<f64> {
        let row: Vec<f64> = model
            .feature_columns()
            .iter()
            .map(|c| features.get(c))
            .collect();
        let raw = model.predict(&row)?;
        debug!(raw, "model predicted reduction");
        Ok(raw.clamp(MIN_REDUCTION, MAX_REDUCTION))
    }

    /// Deterministic fallback. Low volatility, a rising primary index,
    /// positive sentiment, and low cross-correlation each widen the reduction.
    fn rule_reduction(&self, features: &FeatureVector) -> (f64, FactorBreakdown) {
        let base_reduction = 0.05;
        let volatility_factor = (0.10 - features.get("avg_volatility")).max(0.0);
        let index_key = format!("{}_change_pct", self.primary_index.to_lowercase());
        let index_factor = if features.get(&index_key) > 0.0 { 0.02 } else { -0.02 };
        let sentiment_factor = features.get("overall_sentiment_score")
            * features.get("overall_sentiment_confidence")
            * 0.05;
        let correlation_factor = (1.0 - features.get("avg_correlation")) * 0.04;

        let reduction = (base_reduction
            + volatility_factor
            + index_factor
            + sentiment_factor
            + correlation_factor)
            .clamp(MIN_REDUCTION, MAX_REDUCTION);

        (
            reduction,
            FactorBreakdown {
                base_reduction,
                volatility_factor,
                index_factor,
                sentiment_factor,
                correlation_factor,
            },
        )
    }

    fn result(
        &self,
        current_margin: f64,
        reduction: f64,
        method: OptimizationMethod,
        confidence: f64,
        factors: Option<FactorBreakdown>,
    ) -> OptimizationResult {
        let optimized_margin = current_margin * (1.0 - reduction);
        OptimizationResult {
            current_margin,
            optimized_margin,
            reduction_percent: reduction,
            potential_savings: current_margin - optimized_margin,
            method,
            confidence,
            factors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingModel {
        columns: Vec<String>,
    }

    impl ModelArtifact for FailingModel {
        fn feature_columns(&self) -> &[String] {
            &self.columns
        }

        fn predict(&self, _row: &[f64]) -> Result<f64> {
            Err(AppError::Upstream("predictor crashed".to_string()))
        }
    }

    fn worked_example_features() -> FeatureVector {
        let mut features = FeatureVector::new();
        features.set("avg_volatility", 0.05);
        features.set("nifty_change_pct", 0.45);
        features.set("overall_sentiment_score", 0.6);
        features.set("overall_sentiment_confidence", 0.8);
        features.set("avg_correlation", 0.4);
        features
    }

    #[test]
    fn test_rule_worked_example() {
        let engine = OptimizationEngine::rule_only("NIFTY");
        let result = engine.optimize(&worked_example_features(), 4_200_000.0);

        // 0.05 + 0.05 + 0.02 + 0.024 + 0.024 = 0.168
        assert_eq!(result.method, OptimizationMethod::Rule);
        assert!((result.reduction_percent - 0.168).abs() < 1e-12);
        assert!((result.optimized_margin - 3_494_400.0).abs() < 1e-6);
        assert!((result.potential_savings - 705_600.0).abs() < 1e-6);
        assert_eq!(result.confidence, RULE_CONFIDENCE);

        let factors = result.factors.expect("rule path attaches factors");
        assert_eq!(factors.index_factor, 0.02);
        assert!((factors.sentiment_factor - 0.024).abs() < 1e-12);
    }

    #[test]
    fn test_reduction_bounds_hold() {
        let engine = OptimizationEngine::rule_only("NIFTY");

        // Hostile inputs: high volatility, falling index, deeply negative
        // sentiment, perfect correlation.
        let mut worst = FeatureVector::new();
        worst.set("avg_volatility", 0.50);
        worst.set("nifty_change_pct", -1.2);
        worst.set("overall_sentiment_score", -1.0);
        worst.set("overall_sentiment_confidence", 1.0);
        worst.set("avg_correlation", 1.0);
        let result = engine.optimize(&worst, 1_000_000.0);
        assert_eq!(result.reduction_percent, MIN_REDUCTION);

        // Best case clamps at the ceiling.
        let mut best = FeatureVector::new();
        best.set("avg_volatility", 0.0);
        best.set("nifty_change_pct", 2.0);
        best.set("overall_sentiment_score", 1.0);
        best.set("overall_sentiment_confidence", 1.0);
        best.set("avg_correlation", 0.0);
        let result = engine.optimize(&best, 1_000_000.0);
        assert_eq!(result.reduction_percent, MAX_REDUCTION);
        assert!(result.optimized_margin <= result.current_margin);
    }

    #[test]
    fn test_model_output_is_clamped() {
        let artifact = LinearArtifact {
            columns: vec!["avg_volatility".to_string()],
            weights: vec![10.0],
            intercept: 0.0,
        };
        let engine = OptimizationEngine::with_model(Box::new(artifact), "NIFTY");

        let mut features = FeatureVector::new();
        features.set("avg_volatility", 0.09);
        let result = engine.optimize(&features, 1_000_000.0);

        assert_eq!(result.method, OptimizationMethod::Model);
        assert_eq!(result.confidence, MODEL_CONFIDENCE);
        // Raw prediction 0.9 clamps to the ceiling.
        assert_eq!(result.reduction_percent, MAX_REDUCTION);
        assert!(result.factors.is_none());
    }

    #[test]
    fn test_model_failure_falls_back_to_rule() {
        let model = FailingModel {
            columns: vec!["avg_volatility".to_string()],
        };
        let engine = OptimizationEngine::with_model(Box::new(model), "NIFTY");

        let result = engine.optimize(&worked_example_features(), 4_200_000.0);
        assert_eq!(result.method, OptimizationMethod::Rule);
        assert!((result.reduction_percent - 0.168).abs() < 1e-12);
    }

    #[test]
    fn test_missing_artifact_degrades_to_rule_only() {
        let engine = OptimizationEngine::new(Path::new("/nonexistent/model.json"), "NIFTY");
        assert!(!engine.has_model());

        let result = engine.optimize(&FeatureVector::new(), 100_000.0);
        assert_eq!(result.method, OptimizationMethod::Rule);
    }

    #[test]
    fn test_artifact_shape_mismatch_rejected() {
        let dir = std::env::temp_dir().join("lien_optimizer_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad_model.json");
        std::fs::write(
            &path,
            r#"{"columns": ["a", "b"], "weights": [0.1], "intercept": 0.0}"#,
        )
        .unwrap();

        let err = LinearArtifact::load(&path).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_linear_artifact_predicts() {
        let artifact = LinearArtifact {
            columns: vec!["x".to_string(), "y".to_string()],
            weights: vec![0.5, 0.25],
            intercept: 0.01,
        };
        assert_eq!(artifact.predict(&[0.2, 0.4]).unwrap(), 0.01 + 0.1 + 0.1);
        assert!(artifact.predict(&[0.2]).is_err());
    }
}
