//! # Deep Work Core Library
//!
//! Core business logic for tracking focused work sessions. The CLI and the
//! HTTP server are thin layers over the same library.
//!
//! ## Architecture
//!
//! - **Session lifecycle**: a state machine (`planned → active ⇄ paused →
//!   terminal`) whose transitions take their timestamps from an injected clock
//! - **Outcome classification**: an ordered rule table applied at completion
//! - **History**: outcome counts and productive time across sessions
//! - **Storage**: SQLite-based session storage and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SessionManager`]: applies transitions to a [`Session`]
//! - [`OutcomeRules`]: picks the terminal status on completion
//! - [`SessionService`]: runs transitions atomically against a [`SessionStore`]
//! - [`Database`]: SQLite implementation of [`SessionStore`]
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod error;
pub mod history;
pub mod service;
pub mod session;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, Result, TransitionError, ValidationError};
pub use history::SessionHistory;
pub use service::SessionService;
pub use session::{
    Interruption, NewSession, OutcomeRule, OutcomeRules, Session, SessionManager, SessionStatus,
    TransitionAction,
};
pub use storage::{Config, Database, SessionStore};
