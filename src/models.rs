//! Core data models for the risk & compliance orchestrator

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

use crate::error::OrchestrationError;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

/// Closed set of responder behaviors the router can select.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Compliance,
    Fraud,
    None,
}

impl Capability {
    /// Allow-list lookup for an untrusted `agent` value.
    pub fn from_agent(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compliance" => Some(Capability::Compliance),
            "fraud" => Some(Capability::Fraud),
            "none" => Some(Capability::None),
            _ => None,
        }
    }
}

//
// ================= Transaction =================
//

/// Loosely-typed transaction record as received from the gateway.
/// Every field is optional; the feature extractor fills in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct TransactionRecord(Map<String, Value>);

impl TransactionRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Accept any JSON value that is an object.
    pub fn from_value(value: Value) -> crate::Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(OrchestrationError::invalid_feature(
                "transaction",
                format!("expected a JSON object, got {}", json_kind(&other)),
            )),
        }
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Stand-in record used when the fraud path runs without caller data.
    pub fn placeholder() -> Self {
        Self::new()
            .with("amount", 900)
            .with("ip_distance", 120)
            .with("device_type_id", 2)
            .with("time_of_day", 23)
            .with("tx_frequency", 5)
            .with("merchant_risk", 0.7)
            .with("account_age", 500)
            .with("location_deviation", 10)
    }

    /// Random but realistic record, for demos and smoke tests.
    pub fn simulated<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::new()
            .with("amount", round2(rng.gen_range(1.0..1000.0)))
            .with("ip_distance", round2(rng.gen_range(0.0..1000.0)))
            .with("device_type_id", rng.gen_range(1..=3))
            .with("time_of_day", round2(rng.gen_range(0.0..23.0)))
            .with("tx_frequency", round2(rng.gen_range(0.0..10.0)))
            .with("merchant_risk", round2(rng.gen_range(0.0..1.0)))
            .with("account_age", round2(rng.gen_range(10.0..3650.0)))
            .with("location_deviation", round2(rng.gen_range(0.0..200.0)))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

//
// ================= Risk Assessment =================
//

pub const MODEL_UNAVAILABLE: &str = "model unavailable";
pub const SCORING_FAILED: &str = "scoring failed";

/// Per-request scoring outcome. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RiskAssessment {
    Scored { probability: f64, tier: RiskTier },
    Failed { error: String },
}

impl RiskAssessment {
    pub fn model_unavailable() -> Self {
        RiskAssessment::Failed {
            error: MODEL_UNAVAILABLE.to_string(),
        }
    }

    pub fn scoring_failed() -> Self {
        RiskAssessment::Failed {
            error: SCORING_FAILED.to_string(),
        }
    }

    pub fn tier(&self) -> Option<RiskTier> {
        match self {
            RiskAssessment::Scored { tier, .. } => Some(*tier),
            RiskAssessment::Failed { .. } => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RiskAssessment::Scored { probability, tier } => {
                json!({ "probability": probability, "tier": tier })
            }
            RiskAssessment::Failed { error } => json!({ "error": error }),
        }
    }
}

//
// ================= Routing =================
//

/// Transient outcome of the classification step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutingDecision {
    #[serde(rename = "agent")]
    pub capability: Capability,
}

impl RoutingDecision {
    pub fn none() -> Self {
        Self {
            capability: Capability::None,
        }
    }
}

/// Canonical answer handed back to the gateway: any JSON value,
/// usually a string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct CapabilityResponse(pub Value);

impl CapabilityResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self(Value::String(text.into()))
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Capability::Compliance => "compliance",
            Capability::Fraud => "fraud",
            Capability::None => "none",
        };
        write!(f, "{}", s)
    }
}
