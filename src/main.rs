use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use caseline::{
    config::{Config, LogFormat},
    frames::FfmpegExtractor,
    imaging::HttpRenderClient,
    model::HttpReasoningClient,
    pipeline::Orchestrator,
    progress::RunRegistry,
    server::{run_server, AppState},
    storage::SqliteStore,
};

/// Case analysis orchestrator server.
#[derive(Debug, Parser)]
#[command(name = "caseline", version, about)]
struct Cli {
    /// Bind address, overrides SERVER_BIND.
    #[arg(long)]
    bind: Option<String>,

    /// SQLite database path, overrides DATABASE_PATH.
    #[arg(long)]
    database: Option<PathBuf>,

    /// Directory for extracted video frames.
    #[arg(long, default_value = "data/frames")]
    frame_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(database) = cli.database {
        config.database.path = database;
    }

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Caseline server starting..."
    );

    // Initialize storage
    let store = match SqliteStore::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            Arc::new(s)
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    // Initialize reasoning model client
    let model = match HttpReasoningClient::new(&config.model, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.model.base_url, "Reasoning client initialized");
            Arc::new(c)
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize reasoning client");
            return Err(e.into());
        }
    };

    // Initialize image generation client
    let render = match HttpRenderClient::new(&config.imaging, &config.request) {
        Ok(c) => {
            info!(base_url = %config.imaging.base_url, "Render client initialized");
            Arc::new(c)
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize render client");
            return Err(e.into());
        }
    };

    let frames = Arc::new(FfmpegExtractor::new(cli.frame_dir));

    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        model,
        render,
        frames,
        config.pipeline.clone(),
    ));

    let state = AppState {
        store,
        orchestrator,
        runs: RunRegistry::new(),
        heartbeat_interval_ms: config.server.heartbeat_interval_ms,
    };

    if let Err(e) = run_server(&config.server, state).await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
