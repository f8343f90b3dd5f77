//! Capability responders
//!
//! Each responder wraps one call to the text-generation collaborator with a
//! fixed role prompt, and contains its own generation failures.

use serde_json::Value;

use crate::llm::GeneratedMessage;

pub mod compliance;
pub mod formatter;

pub use compliance::ComplianceResponder;
pub use formatter::FormatterResponder;

/// What a responder chain hands to the normalizer
#[derive(Debug, Clone, PartialEq)]
pub enum ResponderOutput {
    Text(String),
    Message(GeneratedMessage),
    Structured(Value),
    Error(String),
}

impl From<GeneratedMessage> for ResponderOutput {
    fn from(message: GeneratedMessage) -> Self {
        ResponderOutput::Message(message)
    }
}
