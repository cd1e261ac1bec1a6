//! Session lifecycle commands for CLI.

use clap::Subcommand;
use deepwork_core::service::DEFAULT_PAGE_SIZE;
use deepwork_core::NewSession;

use super::{open_service, print_json};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Plan a new session
    Create {
        /// Session title
        title: String,
        /// What the session should achieve
        #[arg(long)]
        goal: String,
        /// Planned length in minutes
        #[arg(long, allow_negative_numbers = true)]
        duration: f64,
    },
    /// Show one session
    Get { id: i64 },
    /// List sessions in creation order
    List {
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: usize,
    },
    /// Start a planned session
    Start { id: i64 },
    /// Pause an active session
    Pause {
        id: i64,
        /// Why the session was interrupted
        #[arg(long)]
        reason: String,
    },
    /// Resume a paused session
    Resume { id: i64 },
    /// Finish a session and record its outcome
    Complete { id: i64 },
    /// Delete a session and its interruptions
    Delete { id: i64 },
}

pub fn run(action: SessionAction) -> anyhow::Result<()> {
    let mut service = open_service()?;

    match action {
        SessionAction::Create { title, goal, duration } => {
            let session = service.create(NewSession::new(title, goal, duration))?;
            print_json(&session)?;
        }
        SessionAction::Get { id } => print_json(&service.get(id)?)?,
        SessionAction::List { skip, limit } => print_json(&service.list(skip, limit)?)?,
        SessionAction::Start { id } => print_json(&service.start(id)?)?,
        SessionAction::Pause { id, reason } => print_json(&service.pause(id, &reason)?)?,
        SessionAction::Resume { id } => print_json(&service.resume(id)?)?,
        SessionAction::Complete { id } => print_json(&service.complete(id)?)?,
        SessionAction::Delete { id } => {
            service.delete(id)?;
            print_json(&serde_json::json!({ "deleted": id }))?;
        }
    }
    Ok(())
}
