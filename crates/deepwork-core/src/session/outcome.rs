//! Outcome classification at completion time.
//!
//! The rules overlap (a session can be both heavily interrupted and late),
//! so they are kept as an ordered table and the first match wins:
//!
//! 1. more than `max_interruptions` pauses → `interrupted`
//! 2. elapsed minutes over `scheduled × overdue_factor` → `overdue`
//! 3. completed while paused, with no pause after the start → `abandoned`
//! 4. otherwise → `completed`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{minutes_between, Interruption, Session, SessionStatus};

/// Thresholds used by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRules {
    #[serde(default = "default_max_interruptions")]
    pub max_interruptions: usize,
    #[serde(default = "default_overdue_factor")]
    pub overdue_factor: f64,
}

fn default_max_interruptions() -> usize {
    3
}

fn default_overdue_factor() -> f64 {
    1.1
}

impl Default for OutcomeRules {
    fn default() -> Self {
        Self {
            max_interruptions: default_max_interruptions(),
            overdue_factor: default_overdue_factor(),
        }
    }
}

/// Facts the classifier looks at.
#[derive(Debug, Clone, Copy)]
pub struct Completion<'a> {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: DateTime<Utc>,
    pub scheduled_duration: f64,
    pub interruptions: &'a [Interruption],
    /// `active` or `paused`
    pub status_at_completion: SessionStatus,
}

impl<'a> Completion<'a> {
    pub fn of(session: &'a Session, end_time: DateTime<Utc>) -> Self {
        Self {
            start_time: session.start_time,
            end_time,
            scheduled_duration: session.scheduled_duration,
            interruptions: &session.interruptions,
            status_at_completion: session.status,
        }
    }

    fn elapsed_minutes(&self) -> Option<f64> {
        self.start_time
            .map(|start| minutes_between(start, self.end_time))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeRule {
    TooManyInterruptions,
    RanOverSchedule,
    LeftPaused,
}

impl OutcomeRule {
    /// Evaluation order.
    pub const ORDER: [OutcomeRule; 3] = [
        OutcomeRule::TooManyInterruptions,
        OutcomeRule::RanOverSchedule,
        OutcomeRule::LeftPaused,
    ];

    pub fn outcome(&self) -> SessionStatus {
        match self {
            OutcomeRule::TooManyInterruptions => SessionStatus::Interrupted,
            OutcomeRule::RanOverSchedule => SessionStatus::Overdue,
            OutcomeRule::LeftPaused => SessionStatus::Abandoned,
        }
    }

    pub fn matches(&self, completion: &Completion<'_>, rules: &OutcomeRules) -> bool {
        match self {
            OutcomeRule::TooManyInterruptions => {
                completion.interruptions.len() > rules.max_interruptions
            }
            OutcomeRule::RanOverSchedule => completion
                .elapsed_minutes()
                .is_some_and(|elapsed| elapsed > completion.scheduled_duration * rules.overdue_factor),
            // Compared against the start time, not the latest resume.
            OutcomeRule::LeftPaused => match completion.start_time {
                Some(start) => {
                    completion.status_at_completion == SessionStatus::Paused
                        && !completion
                            .interruptions
                            .iter()
                            .any(|i| i.pause_time > start)
                }
                None => false,
            },
        }
    }
}

impl OutcomeRules {
    /// The rule that decided the outcome, or `None` for a plain completion.
    pub fn deciding_rule(&self, completion: &Completion<'_>) -> Option<OutcomeRule> {
        OutcomeRule::ORDER
            .into_iter()
            .find(|rule| rule.matches(completion, self))
    }

    pub fn classify(&self, completion: &Completion<'_>) -> SessionStatus {
        let rule = self.deciding_rule(completion);
        trace!(?rule, "outcome rule");
        rule.map(|rule| rule.outcome())
            .unwrap_or(SessionStatus::Completed)
    }
}
