//! Logistic regression artifact
//!
//! The trained fraud model is shipped as JSON:
//!
//! ```json
//! {
//!   "feature_layout": ["amount", "ip_distance", ...],
//!   "weights": [...],
//!   "bias": -2.1,
//!   "means": [...],
//!   "scales": [...]
//! }
//! ```
//!
//! `means` / `scales` are optional standardization parameters. The layout
//! must match the extractor's layout exactly or the load is rejected.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::OrchestrationError;
use crate::features::{feature_names, FeatureVector, FEATURE_COUNT};
use crate::scorer::Classifier;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub(crate) feature_layout: Vec<String>,
    pub(crate) weights: Vec<f64>,
    pub(crate) bias: f64,
    #[serde(default)]
    pub(crate) means: Option<Vec<f64>>,
    #[serde(default)]
    pub(crate) scales: Option<Vec<f64>>,
}

impl LogisticModel {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let model: LogisticModel = serde_json::from_str(raw)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        let expected = feature_names();
        if self.feature_layout.len() != FEATURE_COUNT
            || self
                .feature_layout
                .iter()
                .zip(expected.iter())
                .any(|(got, want)| got != want)
        {
            return Err(OrchestrationError::ModelUnavailable(format!(
                "feature layout mismatch: model={:?} extractor={:?}",
                self.feature_layout, expected
            )));
        }

        let check_len = |name: &str, len: usize| {
            if len == FEATURE_COUNT {
                Ok(())
            } else {
                Err(OrchestrationError::ModelUnavailable(format!(
                    "{} has {} entries, expected {}",
                    name, len, FEATURE_COUNT
                )))
            }
        };

        check_len("weights", self.weights.len())?;
        if let Some(means) = &self.means {
            check_len("means", means.len())?;
        }
        if let Some(scales) = &self.scales {
            check_len("scales", scales.len())?;
            if scales.iter().any(|s| *s == 0.0 || !s.is_finite()) {
                return Err(OrchestrationError::ModelUnavailable(
                    "scales must be finite and non-zero".to_string(),
                ));
            }
        }

        Ok(())
    }
}

impl Classifier for LogisticModel {
    fn name(&self) -> &str {
        "logistic"
    }

    fn predict_probability(&self, features: &FeatureVector) -> Result<f64> {
        let mut logit = self.bias;

        for (i, x) in features.as_slice().iter().enumerate() {
            let weight = param(Some(&self.weights), i, 0.0, "weights")?;
            let mean = param(self.means.as_ref(), i, 0.0, "means")?;
            let scale = param(self.scales.as_ref(), i, 1.0, "scales")?;
            logit += weight * (x - mean) / scale;
        }

        let probability = 1.0 / (1.0 + (-logit).exp());
        if !probability.is_finite() {
            return Err(OrchestrationError::ScoringFailed(format!(
                "non-finite probability for logit {}",
                logit
            )));
        }

        Ok(probability)
    }
}

/// Coefficient `i` of an optional parameter list; a short list is an inference error.
fn param(values: Option<&Vec<f64>>, i: usize, default: f64, name: &str) -> Result<f64> {
    match values {
        None => Ok(default),
        Some(values) => values.get(i).copied().ok_or_else(|| {
            OrchestrationError::ScoringFailed(format!(
                "{} has {} entries, expected {}",
                name,
                values.len(),
                FEATURE_COUNT
            ))
        }),
    }
}
