use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use deepwork_core::{Config, Database, SessionManager, SessionService, SystemClock};
use deepwork_server::{create_router, init_tracing, AppState, SharedClock};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "deepwork-server", version, about = "Deep Work session tracker API")]
struct Args {
    /// Address to listen on (overrides server.bind_address)
    #[arg(long)]
    bind: Option<String>,
    /// Database file (overrides storage.database_file)
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = Config::load().context("loading configuration")?;
    let db_path = match args.database {
        Some(path) => path,
        None => config.database_path()?,
    };
    let db = Database::open_at(&db_path)
        .with_context(|| format!("opening database at {}", db_path.display()))?;

    let clock: SharedClock = Arc::new(SystemClock);
    let manager = SessionManager::new(clock).with_rules(config.outcome);
    let state = AppState::new(SessionService::new(db, manager));
    let app = create_router(state, &config.server.allowed_origins);

    let bind = args.bind.unwrap_or_else(|| config.server.bind_address.clone());
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
