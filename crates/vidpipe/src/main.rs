use std::sync::Arc;

use tracing::{error, info};

use vidpipe::api::{start_server, AppState};
use vidpipe::logging::{init_logging, LogFormat};
use vidpipe::{load_config, Orchestrator, VidpipeError};

const CONFIG_ENV: &str = "VIDPIPE_CONFIG";

fn config_path() -> Result<String, VidpipeError> {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV).ok())
        .ok_or_else(|| {
            VidpipeError::InvalidRequest(format!(
                "usage: vidpipe <config.json> (or set {})",
                CONFIG_ENV
            ))
        })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn run() -> Result<(), VidpipeError> {
    let path = config_path()?;
    let config = load_config(&path)?;
    info!("Loaded configuration from {}", path);

    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);
    let state = AppState::new(Arc::clone(&orchestrator));

    start_server(&config.orchestrator.bind_address(), state, shutdown_signal()).await?;

    orchestrator.shutdown();
    info!("Waiting for running jobs to finish...");
    orchestrator.wait_idle().await;
    info!("All jobs have ended");
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = init_logging(LogFormat::from_env()) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
    info!("Starting vidpipe v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}
