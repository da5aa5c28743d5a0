use agent_hub::api::create_app;
use agent_hub::chat::{ChatDispatcher, CommandReplyProvider};
use agent_hub::config::HubConfig;
use agent_hub::state::StateEngine;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent_hub=info".into()),
        )
        .init();

    info!("Agent hub starting...");

    let config = HubConfig::from_env().context("Invalid configuration")?;

    let state_engine = Arc::new(StateEngine::from_config(&config));
    let provider = Arc::new(CommandReplyProvider::new(
        config.chat.command.clone(),
        config.chat.args.clone(),
    ));
    let dispatcher = Arc::new(ChatDispatcher::from_config(
        Arc::clone(&state_engine),
        provider,
        &config.chat,
    ));

    let app = create_app(state_engine, dispatcher);

    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;

    info!(
        address = %config.server.bind_address,
        agents = config.agents.len(),
        assistant = %config.chat.assistant_agent,
        "Agent hub listening (GET /health, GET /state, POST /event, POST /status, POST /send, GET /ws)"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Agent hub stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
