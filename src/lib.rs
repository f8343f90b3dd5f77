//! Risk & Compliance Orchestrator
//!
//! Routes a natural-language query or a transaction record to one of:
//! - a regulatory-compliance responder
//! - a fraud chain (feature extraction → risk scoring → narrative formatter)
//! - a fixed rejection
//!
//! and always returns a single serializable answer.
//!
//! QUERY → CLASSIFY → DISPATCH → NORMALIZE → RESPOND

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod llm;
pub mod models;
pub mod normalizer;
pub mod responders;
pub mod router;
pub mod scorer;

pub use error::Result;

// Re-export common types
pub use agent::Orchestrator;
pub use models::*;
pub use router::IntentRouter;
