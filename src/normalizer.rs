//! Response normalizer
//!
//! Collapses whatever a responder chain produced into the canonical
//! `CapabilityResponse`, so the gateway only ever sees serializable JSON.

use serde_json::Value;

use crate::models::CapabilityResponse;
use crate::responders::ResponderOutput;

pub fn normalize(raw: ResponderOutput) -> CapabilityResponse {
    match raw {
        // plain values pass through untouched
        ResponderOutput::Structured(value) => CapabilityResponse(value),
        ResponderOutput::Text(text) => CapabilityResponse(Value::String(text)),
        // message-like: keep only the text
        ResponderOutput::Message(message) => CapabilityResponse(Value::String(message.content)),
        ResponderOutput::Error(error) => CapabilityResponse(Value::String(error)),
    }
}
