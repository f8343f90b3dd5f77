//! Regulatory-compliance responder

use std::sync::Arc;
use tracing::{info, warn};

use crate::llm::TextGenerator;
use crate::responders::ResponderOutput;

pub const COMPLIANCE_ROLE: &str = "You are a regulatory compliance expert. Your goal is to analyze \
queries about financial regulation and return precise, contextual answers.";

/// Returned to the user when generation fails
pub const COMPLIANCE_FALLBACK: &str = "Error analyzing the compliance query.";

pub struct ComplianceResponder {
    generator: Arc<dyn TextGenerator>,
}

impl ComplianceResponder {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn respond(&self, query: &str) -> ResponderOutput {
        match self.generator.generate(COMPLIANCE_ROLE, query).await {
            Ok(message) => {
                info!(chars = message.content.len(), "Compliance responder answered");
                message.into()
            }
            Err(e) => {
                warn!(error = %e, "Compliance responder generation failed");
                ResponderOutput::Error(COMPLIANCE_FALLBACK.to_string())
            }
        }
    }
}
