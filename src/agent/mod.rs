//! Orchestrator - entry points used by the request gateway
//!
//! QUERY → CLASSIFY → DISPATCH → NORMALIZE → RESPOND
//! TRANSACTION → EXTRACT → SCORE

use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::config::Settings;
use crate::features;
use crate::llm::{GeminiClient, TextGenerator};
use crate::models::{CapabilityResponse, RiskAssessment, TransactionRecord};
use crate::router::IntentRouter;
use crate::scorer::RiskScorer;
use crate::Result;

pub struct Orchestrator {
    router: IntentRouter,
}

impl Orchestrator {
    pub fn new(generator: Arc<dyn TextGenerator>, scorer: RiskScorer) -> Self {
        Self {
            router: IntentRouter::new(generator, Arc::new(scorer)),
        }
    }

    pub fn with_placeholder(mut self, placeholder: TransactionRecord) -> Self {
        self.router = self.router.with_placeholder(placeholder);
        self
    }

    /// Wire the Gemini client and the on-disk fraud model.
    /// A model that fails to load leaves scoring permanently unavailable.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let generator = GeminiClient::new(
            settings.gemini_api_key.clone(),
            &settings.gemini_model,
            settings.generation_timeout,
        )?;
        let scorer = RiskScorer::load_or_unavailable(&settings.fraud_model_path, settings.thresholds);

        Ok(Self::new(Arc::new(generator), scorer)
            .with_placeholder(settings.placeholder_transaction.clone()))
    }

    pub fn model_available(&self) -> bool {
        self.router.scorer().is_available()
    }

    /// Answer a free-text query. Never fails.
    pub async fn handle_query(
        &self,
        query: &str,
        transaction: Option<&TransactionRecord>,
    ) -> CapabilityResponse {
        info!(query_len = query.len(), "Query received");
        debug!(query = %query, "Query text");
        self.router.route(query, transaction).await
    }

    /// Score a transaction directly. Malformed fields are the caller's error.
    #[instrument(skip_all)]
    pub fn handle_transaction(&self, transaction: &TransactionRecord) -> Result<RiskAssessment> {
        info!(fields = transaction.len(), "Transaction received");

        let vector = features::extract(transaction)?;
        Ok(self.router.scorer().score(&vector))
    }
}
