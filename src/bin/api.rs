use risk_compliance_orchestrator::{agent::Orchestrator, api::start_server, config::Settings};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    let settings = Settings::from_env()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if settings.gemini_api_key.is_empty() {
        warn!("GEMINI_API_KEY not set; text generation will return fallback answers");
    }

    info!("Risk & Compliance Orchestrator - API Server");
    info!("Port: {}", settings.port);

    let orchestrator = Arc::new(Orchestrator::from_settings(&settings)?);

    info!(
        model_available = orchestrator.model_available(),
        "Orchestrator initialized"
    );

    start_server(orchestrator, &settings).await?;

    Ok(())
}
