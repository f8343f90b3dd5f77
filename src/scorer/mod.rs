//! Risk scorer
//!
//! Wraps the pre-trained fraud classifier. The classifier is loaded once at
//! start-up and shared read-only; if loading failed, the scorer is built in
//! the unavailable state and every call short-circuits for the process
//! lifetime. Inference failures are reported as structured payloads, never
//! propagated.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::OrchestrationError;
use crate::features::FeatureVector;
use crate::models::{RiskAssessment, RiskTier};
use crate::Result;

pub mod logistic;
pub use logistic::LogisticModel;

/// Trait for the fraud classifier collaborator
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    /// Probability that the transaction is fraudulent, in [0, 1]
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64>;
}

/// Tier policy: `p > high` → high, `p > medium` → medium, else low.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            high: 0.75,
            medium: 0.5,
        }
    }
}

impl TierThresholds {
    pub fn new(high: f64, medium: f64) -> Result<Self> {
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        if !in_range(high) || !in_range(medium) || medium > high {
            return Err(OrchestrationError::Config(format!(
                "invalid risk thresholds: medium={} high={} (need 0 <= medium <= high <= 1)",
                medium, high
            )));
        }
        Ok(Self { high, medium })
    }

    pub fn tier_for(&self, probability: f64) -> RiskTier {
        if probability > self.high {
            RiskTier::High
        } else if probability > self.medium {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }
}

/// Scorer handle, constructed once and passed by reference
#[derive(Clone)]
pub struct RiskScorer {
    classifier: Option<Arc<dyn Classifier>>,
    thresholds: TierThresholds,
}

impl RiskScorer {
    pub fn new(classifier: Arc<dyn Classifier>, thresholds: TierThresholds) -> Self {
        Self {
            classifier: Some(classifier),
            thresholds,
        }
    }

    /// Scorer whose classifier failed to load
    pub fn unavailable(thresholds: TierThresholds) -> Self {
        Self {
            classifier: None,
            thresholds,
        }
    }

    /// Load a logistic model artifact from disk
    pub fn load(path: impl AsRef<Path>, thresholds: TierThresholds) -> Result<Self> {
        let path = path.as_ref();
        let model = LogisticModel::from_path(path)?;
        info!(model_path = %path.display(), "Fraud model loaded");
        Ok(Self::new(Arc::new(model), thresholds))
    }

    /// Load, or fall back to the unavailable state. Never retried.
    pub fn load_or_unavailable(path: impl AsRef<Path>, thresholds: TierThresholds) -> Self {
        let path = path.as_ref();
        match Self::load(path, thresholds) {
            Ok(scorer) => scorer,
            Err(e) => {
                error!(model_path = %path.display(), error = %e, "Error loading fraud model");
                Self::unavailable(thresholds)
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn thresholds(&self) -> TierThresholds {
        self.thresholds
    }

    pub fn score(&self, features: &FeatureVector) -> RiskAssessment {
        let Some(classifier) = self.classifier.as_ref() else {
            return RiskAssessment::model_unavailable();
        };

        let probability = match classifier.predict_probability(features) {
            Ok(p) if (0.0..=1.0).contains(&p) => p,
            Ok(p) => {
                warn!(classifier = classifier.name(), probability = p, "Probability out of range");
                return RiskAssessment::scoring_failed();
            }
            Err(e) => {
                warn!(classifier = classifier.name(), error = %e, "Error evaluating transaction");
                return RiskAssessment::scoring_failed();
            }
        };

        let tier = self.thresholds.tier_for(probability);
        info!(fraud_probability = probability, risk_level = %tier, "Fraud evaluation");

        RiskAssessment::Scored { probability, tier }
    }
}

/// Classifier returning a constant probability.
/// Keeps the pipeline exercisable without a model artifact.
pub struct FixedClassifier(pub f64);

impl Classifier for FixedClassifier {
    fn name(&self) -> &str {
        "fixed"
    }

    fn predict_probability(&self, _features: &FeatureVector) -> Result<f64> {
        Ok(self.0)
    }
}
