//! `ragdesk serve`: start the HTTP API server.

use ragdesk_agent::SupportDesk;
use ragdesk_config::AppConfig;
use std::sync::Arc;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("ragdesk gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {} ({})", config.default_model, config.default_provider);

    let desk = Arc::new(SupportDesk::from_config(&config));
    ragdesk_gateway::start(&config, desk).await?;

    Ok(())
}
