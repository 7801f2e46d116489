mod config;

use std::sync::Arc;

use chat_relay::ChatRelay;
use config::RelayConfig;
use openai_api::OpenAIHandler;
use relay_http::AppState;
use tracing::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine, the environment may already be set.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    info!(
        "Starting... CARGO_PKG_NAME={}, CARGO_PKG_VERSION={}, version={}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        option_env!("version").unwrap_or("(not defined at compile)")
    );

    let config = RelayConfig::from_env()?;
    info!(
        "assistant={} base_url={} poll={}ms x{}",
        config.assistant_id,
        config.base_url,
        config.poll_interval.as_millis(),
        config.poll_max_attempts
    );

    let backend = OpenAIHandler::new(
        config.api_key.clone(),
        config.assistant_id.clone(),
        config.base_url.clone(),
        config.http_timeout,
    )?;
    let relay = ChatRelay::new(Arc::new(backend), config.poll_policy());
    let app = relay_http::router(AppState::new(relay));

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _signal_err = tokio::signal::ctrl_c().await;
            info!("Received Ctrl-C, shutting down.");
        })
        .await?;

    Ok(())
}
