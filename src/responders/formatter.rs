//! Risk-narrative formatter
//!
//! Turns a risk assessment into a short professional paragraph. If prose
//! generation fails, the raw assessment is returned instead so the
//! structured result is never lost.

use std::sync::Arc;
use tracing::{info, warn};

use crate::llm::TextGenerator;
use crate::models::{RiskAssessment, TransactionRecord};
use crate::responders::ResponderOutput;

pub const FORMATTER_ROLE: &str = "You are a seasoned fraud & compliance expert.";

pub struct FormatterResponder {
    generator: Arc<dyn TextGenerator>,
}

impl FormatterResponder {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn respond(
        &self,
        query: &str,
        transaction: &TransactionRecord,
        assessment: &RiskAssessment,
    ) -> ResponderOutput {
        let prompt = build_prompt(query, transaction, assessment);

        match self.generator.generate(FORMATTER_ROLE, &prompt).await {
            Ok(message) => {
                info!(chars = message.content.len(), "Formatter output");
                message.into()
            }
            Err(e) => {
                warn!(error = %e, "Formatter error, returning raw assessment");
                ResponderOutput::Structured(assessment.to_value())
            }
        }
    }
}

fn build_prompt(query: &str, transaction: &TransactionRecord, assessment: &RiskAssessment) -> String {
    let transaction_json = serde_json::to_string_pretty(transaction)
        .unwrap_or_else(|_| transaction.as_value().to_string());
    let prediction_json = serde_json::to_string_pretty(assessment)
        .unwrap_or_else(|_| assessment.to_value().to_string());

    format!(
        r#"A user has asked: {}
They provided transaction data: {}
The fraud model produced: {}

Draft a clear, professional paragraph that:
- Summarizes the risk or recommendation
- Explains key factors
- Advises next steps"#,
        query, transaction_json, prediction_json
    )
}
