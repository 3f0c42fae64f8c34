pub mod api;
pub mod authorization;
pub mod config;
pub mod core_state;
pub mod db;
pub mod documents;
pub mod feed;
pub mod models;
pub mod monitor;
pub mod notifications;
pub mod pipeline;
pub mod session_cache;
pub mod storage;
pub mod store;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Core(#[from] core_state::CoreError),

    #[error(transparent)]
    Server(#[from] api::server::ServerError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Server entry point.
///
/// State and the blocking OCR client are built before the runtime
/// starts and dropped after it stops.
pub fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("VolleyMed starting v{}", config::APP_VERSION);

    let config = config::AppConfig::from_env()?;
    tracing::info!(
        database = %config.database_path.display(),
        storage = %config.storage_dir.display(),
        bind = %config.bind,
        "Configuration loaded"
    );

    let core = Arc::new(core_state::CoreState::from_config(&config)?);

    let _scheduler = match config.monitor_interval {
        Some(interval) => Some(monitor::background::start_monitor_scheduler(
            core.store().clone(),
            *core.thresholds(),
            interval,
        )),
        None => {
            tracing::info!("Background monitor disabled");
            None
        }
    };

    let runtime = tokio::runtime::Runtime::new().map_err(StartupError::Runtime)?;
    runtime.block_on(serve_until_ctrl_c(core, config.bind))?;
    drop(runtime);

    tracing::info!("VolleyMed stopped");
    Ok(())
}

async fn serve_until_ctrl_c(
    core: Arc<core_state::CoreState>,
    bind: std::net::SocketAddr,
) -> Result<(), StartupError> {
    let mut server = api::start_api_server(core, bind).await?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Cannot listen for ctrl-c, shutting down");
    }
    server.shutdown();
    server.wait().await;
    Ok(())
}
