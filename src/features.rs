//! Feature extraction
//!
//! Converts a loosely-typed transaction record into the fixed-order numeric
//! vector the fraud classifier was trained on. The classifier is keyed on
//! position, not on field name, so `FEATURE_LAYOUT` is the single source of
//! truth for ordering.
//!
//! Rules:
//! 1. Absent field → fixed default
//! 2. Present but not coercible → `InvalidFeature` (never silently defaulted)
//! 3. Changing order or membership → bump `FEATURE_VERSION`

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::OrchestrationError;
use crate::models::{json_kind, TransactionRecord};
use crate::Result;

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

/// Total number of features
pub const FEATURE_COUNT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Float,
    Int,
}

/// One slot of the feature vector.
#[derive(Debug, Clone, Copy)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub kind: FeatureKind,
    pub default: f64,
}

/// Feature slots in the exact order they appear in the vector
pub const FEATURE_LAYOUT: [FeatureSpec; FEATURE_COUNT] = [
    FeatureSpec { name: "amount", kind: FeatureKind::Float, default: 0.0 },             // 0: transaction amount
    FeatureSpec { name: "ip_distance", kind: FeatureKind::Float, default: 0.0 },        // 1: network distance from account home
    FeatureSpec { name: "device_type_id", kind: FeatureKind::Int, default: 1.0 },       // 2: device category code
    FeatureSpec { name: "time_of_day", kind: FeatureKind::Float, default: 12.0 },       // 3: hour of day
    FeatureSpec { name: "tx_frequency", kind: FeatureKind::Float, default: 1.0 },       // 4: recent transaction count
    FeatureSpec { name: "merchant_risk", kind: FeatureKind::Float, default: 0.5 },      // 5: merchant risk score
    FeatureSpec { name: "account_age", kind: FeatureKind::Float, default: 365.0 },      // 6: account age in days
    FeatureSpec { name: "location_deviation", kind: FeatureKind::Float, default: 0.0 }, // 7: distance from usual location
];

/// Feature names in layout order
pub fn feature_names() -> [&'static str; FEATURE_COUNT] {
    FEATURE_LAYOUT.map(|spec| spec.name)
}

/// Fixed-order feature vector handed to the classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub version: u8,
    pub values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            version: FEATURE_VERSION,
            values,
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Value by feature name
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_LAYOUT
            .iter()
            .position(|spec| spec.name == name)
            .map(|idx| self.values[idx])
    }
}

/// Extract the feature vector from a transaction record.
pub fn extract(record: &TransactionRecord) -> Result<FeatureVector> {
    let mut values = [0.0; FEATURE_COUNT];

    for (slot, spec) in values.iter_mut().zip(FEATURE_LAYOUT.iter()) {
        *slot = match record.get(spec.name) {
            None => spec.default,
            Some(raw) => coerce(spec, raw).map_err(|e| {
                warn!(field = spec.name, error = %e, "Feature extraction error");
                e
            })?,
        };
    }

    let vector = FeatureVector::from_values(values);
    debug!(features = ?vector.values, "Extracted features");

    Ok(vector)
}

fn coerce(spec: &FeatureSpec, raw: &Value) -> Result<f64> {
    let value = match (spec.kind, raw) {
        (FeatureKind::Float, Value::Number(n)) => n.as_f64(),
        (FeatureKind::Float, Value::String(s)) => s.trim().parse::<f64>().ok(),

        // Integral slot: floats truncate toward zero, strings must be integers
        (FeatureKind::Int, Value::Number(n)) => n
            .as_i64()
            .map(|v| v as f64)
            .or_else(|| n.as_f64().map(f64::trunc)),
        (FeatureKind::Int, Value::String(s)) => s.trim().parse::<i64>().ok().map(|v| v as f64),

        (_, other) => {
            return Err(OrchestrationError::invalid_feature(
                spec.name,
                format!("expected a number, got {}", json_kind(other)),
            ))
        }
    };

    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(_) => Err(OrchestrationError::invalid_feature(
            spec.name,
            "value is not finite",
        )),
        None => Err(OrchestrationError::invalid_feature(
            spec.name,
            format!("cannot convert {} to {}", raw, kind_name(spec.kind)),
        )),
    }
}

fn kind_name(kind: FeatureKind) -> &'static str {
    match kind {
        FeatureKind::Float => "float",
        FeatureKind::Int => "int",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> TransactionRecord {
        TransactionRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_empty_record_uses_defaults() {
        let vector = extract(&TransactionRecord::new()).unwrap();
        assert_eq!(
            vector.values,
            [0.0, 0.0, 1.0, 12.0, 1.0, 0.5, 365.0, 0.0]
        );
        assert_eq!(vector.version, FEATURE_VERSION);
    }

    #[test]
    fn test_full_record_preserves_layout_order() {
        let vector = extract(&TransactionRecord::placeholder()).unwrap();
        assert_eq!(
            vector.values,
            [900.0, 120.0, 2.0, 23.0, 5.0, 0.7, 500.0, 10.0]
        );
    }

    #[test]
    fn test_partial_records_always_yield_eight_slots() {
        let names = feature_names();
        for (i, name) in names.iter().enumerate() {
            let vector = extract(&record(json!({ *name: 42 }))).unwrap();
            assert_eq!(vector.values.len(), FEATURE_COUNT);
            assert_eq!(vector.values[i], 42.0);
            for (j, spec) in FEATURE_LAYOUT.iter().enumerate() {
                if j != i {
                    assert_eq!(vector.values[j], spec.default, "slot {}", spec.name);
                }
            }
        }
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let vector = extract(&record(json!({
            "amount": "250.5",
            "device_type_id": "3"
        })))
        .unwrap();
        assert_eq!(vector.get("amount"), Some(250.5));
        assert_eq!(vector.get("device_type_id"), Some(3.0));
    }

    #[test]
    fn test_int_slot_truncates_floats() {
        let vector = extract(&record(json!({ "device_type_id": 2.9 }))).unwrap();
        assert_eq!(vector.get("device_type_id"), Some(2.0));
    }

    #[test]
    fn test_non_numeric_values_are_rejected() {
        let cases = vec![
            ("amount", json!("abc")),
            ("ip_distance", json!(true)),
            ("time_of_day", json!(null)),
            ("merchant_risk", json!([0.5])),
            ("account_age", json!({"days": 10})),
            ("device_type_id", json!("2.5")),
            ("location_deviation", json!("inf")),
        ];

        for (field, value) in cases {
            let err = extract(&record(json!({ field: value }))).unwrap_err();
            match err {
                OrchestrationError::InvalidFeature { field: f, .. } => assert_eq!(f, field),
                other => panic!("unexpected error: {}", other),
            }
        }
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let vector = extract(&record(json!({ "currency": "EUR", "amount": 5 }))).unwrap();
        assert_eq!(vector.get("amount"), Some(5.0));
    }
}
