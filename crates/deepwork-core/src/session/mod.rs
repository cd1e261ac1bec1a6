//! Deep work session model.
//!
//! A session moves through a small state machine:
//!
//! ```text
//!   PLANNED ──start──> ACTIVE ──complete──> COMPLETED | INTERRUPTED | OVERDUE | ABANDONED
//!                       │  ^                          ^
//!                 pause │  │ resume                   │
//!                       v  │                          │
//!                      PAUSED ─────complete───────────┘
//! ```
//!
//! Which terminal state `complete` lands in is decided by the
//! [`outcome`] classifier.

pub mod lifecycle;
pub mod outcome;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use lifecycle::SessionManager;
pub use outcome::{OutcomeRule, OutcomeRules};

/// Session status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created but not started (initial state)
    Planned,
    /// Work in progress
    Active,
    /// Temporarily stopped; an interruption was recorded
    Paused,
    /// Finished within the rules
    Completed,
    /// Finished after too many interruptions
    Interrupted,
    /// Finished after running well past the scheduled duration
    Overdue,
    /// Finished while paused without having been worked on after the start
    Abandoned,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 7] = [
        SessionStatus::Planned,
        SessionStatus::Active,
        SessionStatus::Paused,
        SessionStatus::Completed,
        SessionStatus::Interrupted,
        SessionStatus::Overdue,
        SessionStatus::Abandoned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Planned => "planned",
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
            SessionStatus::Interrupted => "interrupted",
            SessionStatus::Overdue => "overdue",
            SessionStatus::Abandoned => "abandoned",
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed
                | SessionStatus::Interrupted
                | SessionStatus::Overdue
                | SessionStatus::Abandoned
        )
    }

    /// Check if a transition is valid.
    pub fn can_transition_to(&self, to: &SessionStatus) -> bool {
        self.valid_transitions().contains(to)
    }

    /// Get valid next states for this state.
    pub fn valid_transitions(&self) -> &'static [SessionStatus] {
        const TERMINAL_OR_PAUSED: &[SessionStatus] = &[
            SessionStatus::Paused,
            SessionStatus::Completed,
            SessionStatus::Interrupted,
            SessionStatus::Overdue,
            SessionStatus::Abandoned,
        ];
        const TERMINAL_OR_ACTIVE: &[SessionStatus] = &[
            SessionStatus::Active,
            SessionStatus::Completed,
            SessionStatus::Interrupted,
            SessionStatus::Overdue,
            SessionStatus::Abandoned,
        ];
        match self {
            SessionStatus::Planned => &[SessionStatus::Active],
            SessionStatus::Active => TERMINAL_OR_PAUSED,
            SessionStatus::Paused => TERMINAL_OR_ACTIVE,
            _ => &[],
        }
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Planned
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "status",
                message: format!("unknown session status '{s}'"),
            })
    }
}

/// Operation applied to a session by the lifecycle manager.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransitionAction {
    /// PLANNED → ACTIVE
    Start,
    /// ACTIVE → PAUSED
    Pause,
    /// PAUSED → ACTIVE
    Resume,
    /// ACTIVE | PAUSED → terminal
    Complete,
}

impl TransitionAction {
    /// Whether the action may be applied to a session in `status`.
    pub fn allowed_from(&self, status: SessionStatus) -> bool {
        match self {
            TransitionAction::Start => status == SessionStatus::Planned,
            TransitionAction::Pause => status == SessionStatus::Active,
            TransitionAction::Resume => status == SessionStatus::Paused,
            TransitionAction::Complete => {
                matches!(status, SessionStatus::Active | SessionStatus::Paused)
            }
        }
    }

    pub(crate) fn past_tense(&self) -> &'static str {
        match self {
            TransitionAction::Start => "started",
            TransitionAction::Pause => "paused",
            TransitionAction::Resume => "resumed",
            TransitionAction::Complete => "completed",
        }
    }

    pub(crate) fn required_states(&self) -> &'static str {
        match self {
            TransitionAction::Start => "planned",
            TransitionAction::Pause => "active",
            TransitionAction::Resume => "paused",
            TransitionAction::Complete => "active or paused",
        }
    }
}

impl fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionAction::Start => write!(f, "start"),
            TransitionAction::Pause => write!(f, "pause"),
            TransitionAction::Resume => write!(f, "resume"),
            TransitionAction::Complete => write!(f, "complete"),
        }
    }
}

/// A recorded pause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interruption {
    /// Store-assigned identifier (0 until persisted)
    pub id: i64,
    pub session_id: i64,
    pub reason: String,
    pub pause_time: DateTime<Utc>,
}

/// A tracked unit of focused work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Store-assigned identifier (0 until persisted)
    pub id: i64,
    pub title: String,
    pub goal: String,
    /// Planned length in minutes
    pub scheduled_duration: f64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    /// Pauses in chronological order
    #[serde(default)]
    pub interruptions: Vec<Interruption>,
}

impl Session {
    pub fn interruption_count(&self) -> usize {
        self.interruptions.len()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Minutes between start and end, if both are set.
    pub fn elapsed_minutes(&self) -> Option<f64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(minutes_between(start, end)),
            _ => None,
        }
    }

    /// Interruptions not yet written to a store.
    pub fn unsaved_interruptions_mut(&mut self) -> impl Iterator<Item = &mut Interruption> {
        self.interruptions.iter_mut().filter(|i| i.id == 0)
    }
}

/// Input for creating a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSession {
    pub title: String,
    pub goal: String,
    pub scheduled_duration: f64,
}

impl NewSession {
    pub fn new(title: impl Into<String>, goal: impl Into<String>, scheduled_duration: f64) -> Self {
        Self {
            title: title.into(),
            goal: goal.into(),
            scheduled_duration,
        }
    }

    /// # Errors
    /// Returns the first offending field: empty title, empty goal, or a
    /// duration that is not a positive finite number.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        require_text("goal", &self.goal)?;
        if !self.scheduled_duration.is_finite() || self.scheduled_duration <= 0.0 {
            return Err(ValidationError::InvalidValue {
                field: "scheduled_duration",
                message: format!("must be positive, got {}", self.scheduled_duration),
            });
        }
        Ok(())
    }
}

/// Rejects empty or whitespace-only text.
pub fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyField { field })
    } else {
        Ok(())
    }
}

pub(crate) fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 60_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn terminal_states_have_no_transitions() {
        for status in SessionStatus::ALL {
            assert_eq!(status.is_terminal(), status.valid_transitions().is_empty());
        }
    }

    #[test]
    fn planned_only_starts() {
        assert!(SessionStatus::Planned.can_transition_to(&SessionStatus::Active));
        assert!(!SessionStatus::Planned.can_transition_to(&SessionStatus::Paused));
        assert!(!SessionStatus::Planned.can_transition_to(&SessionStatus::Completed));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in SessionStatus::ALL {
            assert_eq!(status.as_str().parse::<SessionStatus>().unwrap(), status);
        }
        assert!("running".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&SessionStatus::Overdue).unwrap();
        assert_eq!(json, "\"overdue\"");
    }

    #[test]
    fn action_sources() {
        assert!(TransitionAction::Complete.allowed_from(SessionStatus::Paused));
        assert!(TransitionAction::Complete.allowed_from(SessionStatus::Active));
        assert!(!TransitionAction::Complete.allowed_from(SessionStatus::Planned));
        assert!(!TransitionAction::Resume.allowed_from(SessionStatus::Active));
    }

    #[test]
    fn validate_rejects_blank_fields() {
        assert_eq!(
            NewSession::new("", "goal", 30.0).validate(),
            Err(ValidationError::EmptyField { field: "title" })
        );
        assert_eq!(
            NewSession::new("title", "   ", 30.0).validate(),
            Err(ValidationError::EmptyField { field: "goal" })
        );
    }

    #[test]
    fn validate_rejects_non_positive_duration() {
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(NewSession::new("t", "g", bad).validate().is_err(), "{bad}");
        }
        assert!(NewSession::new("t", "g", 0.1).validate().is_ok());
    }

    #[test]
    fn unsaved_interruptions_skip_stored_ones() {
        let now = Utc::now();
        let mut session = Session {
            id: 3,
            title: "t".into(),
            goal: "g".into(),
            scheduled_duration: 30.0,
            start_time: Some(now),
            end_time: None,
            status: SessionStatus::Paused,
            created_at: now,
            interruptions: [7, 0]
                .into_iter()
                .map(|id| Interruption {
                    id,
                    session_id: 3,
                    reason: format!("pause {id}"),
                    pause_time: now,
                })
                .collect(),
        };
        let unsaved: Vec<String> = session
            .unsaved_interruptions_mut()
            .map(|i| i.reason.clone())
            .collect();
        assert_eq!(unsaved, vec!["pause 0"]);
    }

    #[test]
    fn elapsed_minutes_requires_both_ends() {
        let now = Utc::now();
        let mut session = Session {
            id: 1,
            title: "t".into(),
            goal: "g".into(),
            scheduled_duration: 30.0,
            start_time: Some(now),
            end_time: None,
            status: SessionStatus::Active,
            created_at: now,
            interruptions: Vec::new(),
        };
        assert_eq!(session.elapsed_minutes(), None);
        session.end_time = Some(now + Duration::seconds(90));
        assert_eq!(session.elapsed_minutes(), Some(1.5));
    }
}
