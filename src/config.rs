//! Runtime configuration
//!
//! Read from the environment (after `.env`, if present).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::OrchestrationError;
use crate::models::TransactionRecord;
use crate::scorer::TierThresholds;
use crate::Result;

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_MODEL_PATH: &str = "assets/fraud_model.json";
const DEFAULT_API_KEY: &str = "default-api-key";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Allowed outbound generation timeout, in seconds
const GENERATION_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 10..=60;

#[derive(Debug, Clone)]
pub struct Settings {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub generation_timeout: Duration,
    pub fraud_model_path: PathBuf,
    pub thresholds: TierThresholds,
    pub placeholder_transaction: TransactionRecord,
    pub api_key: String,
    pub port: u16,
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_model: DEFAULT_MODEL.to_string(),
            generation_timeout: Duration::from_secs(DEFAULT_GENERATION_TIMEOUT_SECS),
            fraud_model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            thresholds: TierThresholds::default(),
            placeholder_transaction: TransactionRecord::placeholder(),
            api_key: DEFAULT_API_KEY.to_string(),
            port: DEFAULT_PORT,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Load `.env` then read the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let generation_timeout_secs =
            parse_or(get("GENERATION_TIMEOUT_SECS"), "GENERATION_TIMEOUT_SECS", DEFAULT_GENERATION_TIMEOUT_SECS)?;
        if !GENERATION_TIMEOUT_RANGE.contains(&generation_timeout_secs) {
            return Err(OrchestrationError::Config(format!(
                "GENERATION_TIMEOUT_SECS must be within {}..={}, got {}",
                GENERATION_TIMEOUT_RANGE.start(),
                GENERATION_TIMEOUT_RANGE.end(),
                generation_timeout_secs
            )));
        }

        let thresholds = TierThresholds::new(
            parse_or(get("RISK_HIGH_THRESHOLD"), "RISK_HIGH_THRESHOLD", defaults.thresholds.high)?,
            parse_or(get("RISK_MEDIUM_THRESHOLD"), "RISK_MEDIUM_THRESHOLD", defaults.thresholds.medium)?,
        )?;

        let placeholder_transaction = match get("PLACEHOLDER_TRANSACTION") {
            Some(raw) => {
                let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
                    OrchestrationError::Config(format!("PLACEHOLDER_TRANSACTION is not JSON: {}", e))
                })?;
                TransactionRecord::from_value(value).map_err(|e| {
                    OrchestrationError::Config(format!("PLACEHOLDER_TRANSACTION: {}", e))
                })?
            }
            None => defaults.placeholder_transaction,
        };

        let port = parse_or(
            get("PORT").or_else(|| get("API_PORT")),
            "PORT",
            defaults.port,
        )?;

        let request_timeout_secs =
            parse_or(get("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            generation_timeout: Duration::from_secs(generation_timeout_secs),
            fraud_model_path: get("FRAUD_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.fraud_model_path),
            thresholds,
            placeholder_transaction,
            api_key: get("API_KEY").unwrap_or(defaults.api_key),
            port,
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.trim().parse::<T>().map_err(|e| {
            OrchestrationError::Config(format!("{} has invalid value '{}': {}", key, value, e))
        }),
        None => Ok(default),
    }
}
