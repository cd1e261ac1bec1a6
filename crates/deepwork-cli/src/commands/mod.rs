pub mod config;
pub mod history;
pub mod session;

use anyhow::Context;
use deepwork_core::{Config, Database, SessionManager, SessionService};

/// Open the configured database with the configured outcome thresholds.
pub fn open_service() -> anyhow::Result<SessionService<Database>> {
    let config = Config::load().context("loading configuration")?;
    let path = config.database_path()?;
    let db = Database::open_at(&path)
        .with_context(|| format!("opening database at {}", path.display()))?;
    Ok(SessionService::new(db, SessionManager::system().with_rules(config.outcome)))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
