//! reconcile-server: HTTP entry point for contact identity reconciliation.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use reconcile_core::db::open_db_with_options;
use reconcile_core::init_logging;
use reconcile_server::config::ServerConfig;
use reconcile_server::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();

    init_logging(&config.log_level(), config.log_dir.as_deref()).map_err(anyhow::Error::msg)?;
    info!(
        "event=server_start module=http status=start version={} environment={} busy_timeout_ms={}",
        env!("CARGO_PKG_VERSION"),
        config.environment.as_str(),
        config.busy_timeout_ms
    );

    let conn = open_db_with_options(&config.db_path, &config.db_options())
        .with_context(|| format!("failed to open database `{}`", config.db_path.display()))?;

    let app = build_router(AppState::new(conn, config.environment));
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(
        "event=server_start module=http status=ok bind={}",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("event=server_stop module=http status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
