pub mod agent;
pub mod models;
pub mod server;
pub mod config;
pub mod llm;
pub mod cli;
pub mod history;
pub mod error;

use agent::TriageAgent;
use cli::Args;
use config::ServiceConfig;
use log::{ info, warn };
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = ServiceConfig::from_args(&args)?;

    info!("--- Core Configuration ---");
    info!("Server Address: {}", config.bind_addr);
    info!("Mock Mode: {}", config.mock_mode);
    info!("Chat LLM Type: {}", config.llm.llm_type);
    info!("Chat API Key Set: {}", config.llm.api_key.is_some());
    info!("Temperature: {}", config.temperature);
    info!("Max Tokens: {}", config.max_tokens);
    info!(
        "Rate Limits: {}/minute, {}/day per caller",
        config.rate_limit.per_minute,
        config.rate_limit.per_day
    );
    info!("Allowed Origins: {}", config.allowed_origins.join(", "));
    info!("TLS Enabled: {}", config.tls.is_some());
    info!("-------------------------");

    if config.uses_default_secret() {
        warn!("SERVICE_SECRET_KEY is not set. Using the default insecure key.");
    }

    let agent = Arc::new(TriageAgent::new(&config));
    let server = Server::new(config, agent);
    server.run().await?;

    Ok(())
}
