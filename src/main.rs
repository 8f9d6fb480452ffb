mod config;
mod invoker;
mod protocol;
mod server;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::BridgeConfig;
use crate::invoker::ConformanceInvoker;
use crate::server::{router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("conformance_bridge=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let config = BridgeConfig::from_env()?;

    // Fail fast on a misconfigured deployment; tool locations are fixed
    // for the lifetime of the process.
    config.tools.ensure_tools_available()?;
    info!(
        "Using conformance runner at {} (cpu version {}, plugin {})",
        config.tools.runner.display(),
        config.tools.cpu_version,
        config.tools.plugin.display()
    );

    let state = AppState {
        invoker: Arc::new(ConformanceInvoker::new(config.tools.clone())),
        default_timeout_secs: config.default_timeout_secs,
    };

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!("Listening on {}", config.listen_addr);

    axum::serve(listener, router(state)).await?;

    Ok(())
}
