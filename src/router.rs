//! Intent router
//!
//! received → classifying → {routing-to-compliance | routing-to-fraud | rejected} → responded
//!
//! The classification comes from a free-text model and is treated as an
//! untrusted signal: it is parsed defensively and checked against the
//! closed capability set before anything branches on it. Nothing escapes
//! `route`; every failure becomes a fixed answer string.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::error::OrchestrationError;
use crate::features;
use crate::llm::TextGenerator;
use crate::models::{Capability, CapabilityResponse, RoutingDecision, TransactionRecord};
use crate::normalizer::normalize;
use crate::responders::{ComplianceResponder, FormatterResponder, ResponderOutput};
use crate::scorer::RiskScorer;
use crate::Result;

pub const ROUTER_ROLE: &str = "You are an intelligent orchestrator for agents in a risk management \
and compliance platform. Analyze the provided query and decide whether it should be delegated to \
'compliance', 'fraud', or if none of them can address it. Return a JSON with the field 'agent', \
e.g., {\"agent\": \"compliance\"}. If not applicable, respond with {\"agent\": \"none\"}.";

/// Answer for queries no capability can handle
pub const REJECTION: &str = "I'm sorry, I cannot resolve that query at this time.";

/// Answer when classification or dispatch failed outright
pub const ROUTER_ERROR: &str = "Error processing the query.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStage {
    Received,
    Classifying,
    RoutingToCompliance,
    RoutingToFraud,
    Rejected,
    Responded,
}

impl fmt::Display for RouteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RouteStage::Received => "received",
            RouteStage::Classifying => "classifying",
            RouteStage::RoutingToCompliance => "routing-to-compliance",
            RouteStage::RoutingToFraud => "routing-to-fraud",
            RouteStage::Rejected => "rejected",
            RouteStage::Responded => "responded",
        };
        write!(f, "{}", s)
    }
}

pub struct IntentRouter {
    generator: Arc<dyn TextGenerator>,
    compliance: ComplianceResponder,
    formatter: FormatterResponder,
    scorer: Arc<RiskScorer>,
    placeholder: TransactionRecord,
}

impl IntentRouter {
    pub fn new(generator: Arc<dyn TextGenerator>, scorer: Arc<RiskScorer>) -> Self {
        Self {
            compliance: ComplianceResponder::new(generator.clone()),
            formatter: FormatterResponder::new(generator.clone()),
            generator,
            scorer,
            placeholder: TransactionRecord::placeholder(),
        }
    }

    /// Replace the record used when the fraud path runs without caller data
    pub fn with_placeholder(mut self, placeholder: TransactionRecord) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn scorer(&self) -> &RiskScorer {
        &self.scorer
    }

    /// Route a query and always produce an answer.
    #[instrument(skip_all, fields(query_len = query.len(), has_transaction = transaction.is_some()))]
    pub async fn route(
        &self,
        query: &str,
        transaction: Option<&TransactionRecord>,
    ) -> CapabilityResponse {
        debug!(stage = %RouteStage::Received, "Query received");

        let response = match self.dispatch(query, transaction).await {
            Ok(output) => normalize(output),
            Err(e) => {
                error!(error = %e, "Error in orchestrator");
                CapabilityResponse::text(ROUTER_ERROR)
            }
        };

        info!(stage = %RouteStage::Responded, "Query answered");
        response
    }

    /// Ask the text generator for a decision. Unparseable replies become `none`;
    /// only a failed generation call is an error.
    pub async fn classify(&self, query: &str) -> Result<RoutingDecision> {
        debug!(stage = %RouteStage::Classifying, "Requesting routing decision");

        let reply = self
            .generator
            .generate(ROUTER_ROLE, &format!("Query: {}", query))
            .await?;

        debug!(raw_response = %reply.content, "Orchestrator raw response");

        match parse_decision(&reply.content) {
            Ok(decision) => Ok(decision),
            Err(e) => {
                warn!(error = %e, "Unusable routing decision, treating as none");
                Ok(RoutingDecision::none())
            }
        }
    }

    async fn dispatch(
        &self,
        query: &str,
        transaction: Option<&TransactionRecord>,
    ) -> Result<ResponderOutput> {
        let decision = self.classify(query).await?;
        info!(agent = %decision.capability, "Routing decision");

        match decision.capability {
            Capability::Compliance => {
                debug!(stage = %RouteStage::RoutingToCompliance, "Dispatching to compliance responder");
                Ok(self.compliance.respond(query).await)
            }
            Capability::Fraud => {
                debug!(stage = %RouteStage::RoutingToFraud, "Dispatching to fraud chain");
                let transaction = match transaction {
                    Some(tx) => tx,
                    None => {
                        debug!("No transaction supplied, using placeholder");
                        &self.placeholder
                    }
                };
                self.assess_and_format(query, transaction).await
            }
            Capability::None => {
                debug!(stage = %RouteStage::Rejected, "No capability selected");
                Ok(ResponderOutput::Text(REJECTION.to_string()))
            }
        }
    }

    /// Feature extraction → scoring → narrative
    async fn assess_and_format(
        &self,
        query: &str,
        transaction: &TransactionRecord,
    ) -> Result<ResponderOutput> {
        let vector = features::extract(transaction)?;
        let assessment = self.scorer.score(&vector);

        Ok(self.formatter.respond(query, transaction, &assessment).await)
    }
}

/// Extract a routing decision from a free-text reply.
///
/// Order: fenced block, then the first balanced `{...}`. Anything else,
/// or an `agent` outside the known set, is a parse failure.
pub fn parse_decision(raw: &str) -> Result<RoutingDecision> {
    let parsed = fenced_block(raw)
        .and_then(|body| serde_json::from_str::<Value>(body).ok())
        .or_else(|| {
            first_balanced_object(raw).and_then(|obj| serde_json::from_str::<Value>(obj).ok())
        })
        .ok_or_else(|| {
            OrchestrationError::ClassificationParse("no JSON object in reply".to_string())
        })?;

    let agent = parsed
        .get("agent")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            OrchestrationError::ClassificationParse(format!("missing 'agent' field in {}", parsed))
        })?;

    let capability = Capability::from_agent(agent).ok_or_else(|| {
        OrchestrationError::ClassificationParse(format!("unknown agent '{}'", agent))
    })?;

    Ok(RoutingDecision { capability })
}

/// Body of the first ``` fence, minus an optional info string such as `json`
fn fenced_block(raw: &str) -> Option<&str> {
    let start = raw.find("```")?;
    let after = &raw[start + 3..];
    let close = after.find("```")?;
    let body_start = match after.find('\n') {
        Some(i) if i < close => i + 1,
        _ => 0,
    };
    Some(after[body_start..close].trim())
}

/// First `{...}` whose braces balance, ignoring braces inside JSON strings
fn first_balanced_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockGenerator;
    use crate::models::RiskTier;
    use crate::responders::compliance::{COMPLIANCE_FALLBACK, COMPLIANCE_ROLE};
    use crate::responders::formatter::FORMATTER_ROLE;
    use crate::scorer::{FixedClassifier, TierThresholds};
    use serde_json::json;

    const ROUTER_NEEDLE: &str = "intelligent orchestrator";

    fn router_with(mock: Arc<MockGenerator>) -> IntentRouter {
        let scorer = RiskScorer::new(Arc::new(FixedClassifier(0.9)), TierThresholds::default());
        IntentRouter::new(mock, Arc::new(scorer))
    }

    // ---------- parsing ----------

    #[test]
    fn test_parse_fenced_block() {
        let decision = parse_decision("```json\n{\"agent\": \"compliance\"}\n```").unwrap();
        assert_eq!(decision.capability, Capability::Compliance);
    }

    #[test]
    fn test_parse_object_embedded_in_prose() {
        let decision = parse_decision("I think {\"agent\": \"fraud\"} is right").unwrap();
        assert_eq!(decision.capability, Capability::Fraud);
    }

    #[test]
    fn test_parse_single_line_fence() {
        let decision = parse_decision("```{\"agent\": \"fraud\"}```").unwrap();
        assert_eq!(decision.capability, Capability::Fraud);
    }

    #[test]
    fn test_parse_bare_object() {
        let decision = parse_decision("{\"agent\": \"none\"}").unwrap();
        assert_eq!(decision.capability, Capability::None);
    }

    #[test]
    fn test_parse_braces_inside_strings_and_nesting() {
        let raw = r#"Sure: {"reason": "looks like {fraud}", "meta": {"x": 1}, "agent": "fraud"} done {"agent": "compliance"}"#;
        assert_eq!(parse_decision(raw).unwrap().capability, Capability::Fraud);
    }

    #[test]
    fn test_parse_unclosed_fence_falls_back_to_brace_scan() {
        let raw = "```json\n{\"agent\": \"compliance\"}\n";
        assert_eq!(parse_decision(raw).unwrap().capability, Capability::Compliance);
    }

    #[test]
    fn test_parse_first_balanced_object_must_be_valid_json() {
        let raw = "{agent: fraud} or maybe {\"agent\": \"fraud\"}";
        assert!(parse_decision(raw).is_err());
    }

    #[test]
    fn test_parse_failures() {
        for raw in [
            "not sure",
            "",
            "{\"agent\": \"marketing\"}",
            "{\"route\": \"fraud\"}",
            "{\"agent\": 3}",
            "{\"agent\": \"fraud\"",
        ] {
            assert!(
                matches!(parse_decision(raw), Err(OrchestrationError::ClassificationParse(_))),
                "expected parse failure for {:?}",
                raw
            );
        }
    }

    // ---------- dispatch ----------

    #[tokio::test]
    async fn test_fenced_compliance_decision_routes_to_compliance() {
        let mock = Arc::new(
            MockGenerator::new()
                .reply_when(ROUTER_NEEDLE, "```json\n{\"agent\": \"compliance\"}\n```")
                .reply_when(COMPLIANCE_ROLE, "Under PSD2, strong customer authentication..."),
        );
        let router = router_with(mock.clone());

        let response = router.route("What does PSD2 require?", None).await;

        assert_eq!(response.as_str(), Some("Under PSD2, strong customer authentication..."));
        let compliance_calls = mock.calls_with_role(COMPLIANCE_ROLE);
        assert_eq!(compliance_calls.len(), 1);
        assert_eq!(compliance_calls[0].user_content, "What does PSD2 require?");
        assert!(mock.calls_with_role(FORMATTER_ROLE).is_empty());
    }

    #[tokio::test]
    async fn test_fraud_decision_uses_placeholder_and_returns_formatter_text() {
        let mock = Arc::new(
            MockGenerator::new()
                .reply_when(ROUTER_NEEDLE, "I think {\"agent\": \"fraud\"} is right")
                .reply_when(FORMATTER_ROLE, "This transaction is high risk."),
        );
        let router = router_with(mock.clone());

        let response = router.route("Is this transaction suspicious?", None).await;

        assert_eq!(response.as_str(), Some("This transaction is high risk."));
        let formatter_calls = mock.calls_with_role(FORMATTER_ROLE);
        assert_eq!(formatter_calls.len(), 1);
        assert!(formatter_calls[0].user_content.contains("\"amount\": 900"));
        assert!(formatter_calls[0].user_content.contains("\"tier\": \"high\""));
        assert!(mock.calls_with_role(COMPLIANCE_ROLE).is_empty());
    }

    #[tokio::test]
    async fn test_fraud_decision_prefers_caller_transaction() {
        let mock = Arc::new(
            MockGenerator::new()
                .reply_when(ROUTER_NEEDLE, "{\"agent\": \"fraud\"}")
                .reply_when(FORMATTER_ROLE, "ok"),
        );
        let router = router_with(mock.clone());
        let tx = TransactionRecord::new().with("amount", 12.5);

        router.route("Check my payment", Some(&tx)).await;

        let content = &mock.calls_with_role(FORMATTER_ROLE)[0].user_content;
        assert!(content.contains("\"amount\": 12.5"));
        assert!(!content.contains("\"ip_distance\": 120"));
    }

    #[tokio::test]
    async fn test_configured_placeholder_is_used() {
        let mock = Arc::new(
            MockGenerator::new()
                .reply_when(ROUTER_NEEDLE, "{\"agent\": \"fraud\"}")
                .reply_when(FORMATTER_ROLE, "ok"),
        );
        let placeholder = TransactionRecord::new().with("amount", 31337);
        let router = router_with(mock.clone()).with_placeholder(placeholder);

        router.route("Check", None).await;

        assert!(mock.calls_with_role(FORMATTER_ROLE)[0]
            .user_content
            .contains("31337"));
    }

    #[tokio::test]
    async fn test_unparseable_decision_is_rejected_without_responders() {
        let mock = Arc::new(MockGenerator::new().reply_when(ROUTER_NEEDLE, "not sure"));
        let router = router_with(mock.clone());

        let response = router.route("Tell me a joke", None).await;

        assert_eq!(response.as_str(), Some(REJECTION));
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_agent_is_rejected() {
        let mock = Arc::new(MockGenerator::new().reply_when(ROUTER_NEEDLE, "{\"agent\": \"weather\"}"));
        let router = router_with(mock.clone());

        assert_eq!(router.route("Rain tomorrow?", None).await.as_str(), Some(REJECTION));
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_compliance_generation_failure_yields_fallback() {
        let mock = Arc::new(
            MockGenerator::new()
                .reply_when(ROUTER_NEEDLE, "{\"agent\": \"compliance\"}")
                .fail_when(COMPLIANCE_ROLE, "503"),
        );
        let router = router_with(mock);

        let response = router.route("What is AML?", None).await;
        assert_eq!(response.as_str(), Some(COMPLIANCE_FALLBACK));
    }

    #[tokio::test]
    async fn test_formatter_failure_yields_raw_assessment() {
        let mock = Arc::new(
            MockGenerator::new()
                .reply_when(ROUTER_NEEDLE, "{\"agent\": \"fraud\"}")
                .fail_when(FORMATTER_ROLE, "timeout"),
        );
        let router = router_with(mock);

        let response = router.route("Is this fraud?", None).await;
        assert_eq!(
            response.into_value(),
            json!({"probability": 0.9, "tier": RiskTier::High})
        );
    }

    #[tokio::test]
    async fn test_classification_failure_yields_router_error() {
        let mock = Arc::new(MockGenerator::new().fail_when(ROUTER_NEEDLE, "connection reset"));
        let router = router_with(mock.clone());

        assert_eq!(router.route("Anything", None).await.as_str(), Some(ROUTER_ERROR));
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_caller_transaction_is_contained() {
        let mock = Arc::new(
            MockGenerator::new()
                .reply_when(ROUTER_NEEDLE, "{\"agent\": \"fraud\"}")
                .reply_when(FORMATTER_ROLE, "never"),
        );
        let router = router_with(mock.clone());
        let tx = TransactionRecord::new().with("amount", "lots");

        let response = router.route("Check", Some(&tx)).await;

        assert_eq!(response.as_str(), Some(ROUTER_ERROR));
        assert!(mock.calls_with_role(FORMATTER_ROLE).is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_model_still_reaches_formatter() {
        let mock = Arc::new(
            MockGenerator::new()
                .reply_when(ROUTER_NEEDLE, "{\"agent\": \"fraud\"}")
                .fail_when(FORMATTER_ROLE, "down"),
        );
        let scorer = RiskScorer::unavailable(TierThresholds::default());
        let router = IntentRouter::new(mock, Arc::new(scorer));

        let response = router.route("Check", None).await;
        assert_eq!(response.into_value(), json!({"error": "model unavailable"}));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(RouteStage::RoutingToFraud.to_string(), "routing-to-fraud");
        assert_eq!(RouteStage::Rejected.to_string(), "rejected");
    }
}
