mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, ServerConfig, StorageConfig};
pub use database::Database;

use std::path::PathBuf;

use crate::error::Result;
use crate::session::{Interruption, Session};

/// Returns the data directory, creating it if needed.
///
/// `DEEPWORK_DATA_DIR` wins when set. Otherwise `~/.config/deepwork[-dev]/`,
/// with the `-dev` suffix selected by `DEEPWORK_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("DEEPWORK_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("DEEPWORK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("deepwork-dev")
            } else {
                base_dir.join("deepwork")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Persistence for sessions and their interruptions.
///
/// Implementations must make [`SessionStore::transaction`] atomic and
/// serialized with respect to other writers, so that a lifecycle check and
/// the write that follows it cannot interleave with another transition on
/// the same session.
pub trait SessionStore {
    /// Insert a new session and any interruptions it carries. Returns the
    /// stored copy with ids assigned.
    fn insert(&mut self, session: &Session) -> Result<Session>;

    fn fetch_by_id(&self, id: i64) -> Result<Option<Session>>;

    /// Sessions in id order.
    fn list_all(&self, offset: usize, limit: usize) -> Result<Vec<Session>>;

    /// Every session, newest `created_at` first.
    fn list_recent(&self) -> Result<Vec<Session>>;

    /// Persist the mutable session fields. Interruptions are written through
    /// [`SessionStore::insert_interruption`].
    fn update(&mut self, session: &Session) -> Result<()>;

    fn insert_interruption(&mut self, interruption: &Interruption) -> Result<Interruption>;

    /// Delete a session and its interruptions. Returns false if it did not exist.
    fn delete(&mut self, id: i64) -> Result<bool>;

    /// Run `f` atomically. Any error rolls back everything `f` wrote.
    fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>;
}
