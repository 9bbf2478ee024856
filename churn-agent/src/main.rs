//! churn-agent - customer churn prediction service
//!
//! Serves `POST /predict` (feedback in, churn prediction out) and
//! `GET /health`. Default port 8080.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use churn_common::config::ServiceConfig;
use churn_agent::{bootstrap, build_router, AppState};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "churn-agent", version, about = "Customer churn prediction service")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, env = "CHURN_CONFIG")]
    config: Option<PathBuf>,

    /// Socket address to bind, overrides configuration
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration errors are fatal: there is no listener to report them on
    let mut config = ServiceConfig::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }

    // RUST_LOG wins; otherwise the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting churn-agent v{}", env!("CARGO_PKG_VERSION"));

    let state = match bootstrap::build_orchestrator(&config).await {
        Ok(orchestrator) => {
            info!("✓ Prediction pipeline ready");
            AppState::new(orchestrator)
        }
        Err(e) => {
            error!("Server initialization failed: {:#}", e);
            AppState::initialization_failed(format!("{:#}", e))
        }
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    info!("Listening on http://{}", config.server.bind_addr);
    info!("Health check: http://{}/health", config.server.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
