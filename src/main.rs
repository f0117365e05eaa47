use anyhow::Context;
use docsum::{api, config, gemini::GeminiClient, logging};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::init_config().context("Failed to load configuration")?;
    logging::init_tracing();

    if config.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; summaries and chat will fail until it is configured");
    }
    let client = GeminiClient::from_config(config).context("Failed to build the Gemini client")?;
    let state = api::AppState::new(config, Arc::new(client)).context("Failed to compile page templates")?;
    let app = api::create_router(state);

    let (listener, port) = bind_listener(config).await.context("Failed to bind listener")?;
    tracing::info!(model = %config.gemini_model, "Listening on http://{}:{}", config.server_host, port);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn bind_listener(config: &config::Config) -> Result<(TcpListener, u16), std::io::Error> {
    let host = config.server_host.as_str();
    if let Some(port) = config.server_port {
        return TcpListener::bind((host, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 5000..=5099;
    for port in PORT_RANGE {
        match TcpListener::bind((host, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 5000-5099",
    ))
}
