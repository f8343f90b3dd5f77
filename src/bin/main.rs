use risk_compliance_orchestrator::{
    agent::Orchestrator, config::Settings, models::TransactionRecord,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: orchestrator \"<query>\" | orchestrator --simulate";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    }

    let orchestrator = Orchestrator::from_settings(&settings)?;

    if args[0] == "--simulate" {
        let transaction = TransactionRecord::simulated(&mut rand::thread_rng());
        info!(transaction = %transaction.as_value(), "Simulated transaction");

        let assessment = orchestrator.handle_transaction(&transaction)?;
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "transaction": transaction,
                "assessment": assessment,
            }))?
        );
        return Ok(());
    }

    let query = args.join(" ");
    let response = orchestrator.handle_query(&query, None).await;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({ "response": response }))?
    );

    Ok(())
}
