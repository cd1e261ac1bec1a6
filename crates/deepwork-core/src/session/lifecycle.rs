//! Session lifecycle manager.
//!
//! Applies transitions to an in-memory [`Session`]. Every precondition is
//! checked before anything is written, so a failed call leaves the session
//! exactly as it was.

use tracing::{debug, info};

use super::outcome::{Completion, OutcomeRules};
use super::{require_text, Interruption, NewSession, Session, SessionStatus, TransitionAction};
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, TransitionError};

#[derive(Debug, Clone)]
pub struct SessionManager<C: Clock = SystemClock> {
    clock: C,
    rules: OutcomeRules,
}

impl SessionManager<SystemClock> {
    pub fn system() -> Self {
        Self::new(SystemClock)
    }
}

impl Default for SessionManager<SystemClock> {
    fn default() -> Self {
        Self::system()
    }
}

impl<C: Clock> SessionManager<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            rules: OutcomeRules::default(),
        }
    }

    pub fn with_rules(mut self, rules: OutcomeRules) -> Self {
        self.rules = rules;
        self
    }

    /// Build a new `planned` session. The id stays 0 until a store assigns one.
    ///
    /// # Errors
    /// Returns a validation error for an empty title or goal, or a
    /// non-positive duration.
    pub fn create(&self, input: NewSession) -> Result<Session> {
        input.validate()?;
        Ok(Session {
            id: 0,
            title: input.title,
            goal: input.goal,
            scheduled_duration: input.scheduled_duration,
            start_time: None,
            end_time: None,
            status: SessionStatus::Planned,
            created_at: self.clock.now(),
            interruptions: Vec::new(),
        })
    }

    pub fn start(&self, session: &mut Session) -> Result<()> {
        check(TransitionAction::Start, session)?;
        session.start_time = Some(self.clock.now());
        set_status(session, SessionStatus::Active, TransitionAction::Start);
        Ok(())
    }

    /// Pause an active session, recording why.
    ///
    /// The state check comes first: pausing a non-active session is an
    /// invalid transition even when the reason is also empty.
    pub fn pause(&self, session: &mut Session, reason: &str) -> Result<()> {
        check(TransitionAction::Pause, session)?;
        require_text("reason", reason)?;
        session.interruptions.push(Interruption {
            id: 0,
            session_id: session.id,
            reason: reason.to_string(),
            pause_time: self.clock.now(),
        });
        set_status(session, SessionStatus::Paused, TransitionAction::Pause);
        Ok(())
    }

    pub fn resume(&self, session: &mut Session) -> Result<()> {
        check(TransitionAction::Resume, session)?;
        set_status(session, SessionStatus::Active, TransitionAction::Resume);
        Ok(())
    }

    /// Stamp the end time and move to whichever terminal state the
    /// outcome rules pick.
    pub fn complete(&self, session: &mut Session) -> Result<SessionStatus> {
        check(TransitionAction::Complete, session)?;
        let end_time = self.clock.now();
        let outcome = self.rules.classify(&Completion::of(session, end_time));
        debug!(
            session_id = session.id,
            interruptions = session.interruption_count(),
            %outcome,
            "classified session outcome"
        );
        session.end_time = Some(end_time);
        set_status(session, outcome, TransitionAction::Complete);
        Ok(outcome)
    }

    pub fn apply(&self, session: &mut Session, action: TransitionAction, reason: Option<&str>) -> Result<()> {
        match action {
            TransitionAction::Start => self.start(session),
            TransitionAction::Pause => self.pause(session, reason.unwrap_or_default()),
            TransitionAction::Resume => self.resume(session),
            TransitionAction::Complete => self.complete(session).map(|_| ()),
        }
    }
}

fn check(action: TransitionAction, session: &Session) -> Result<(), TransitionError> {
    if action.allowed_from(session.status) {
        Ok(())
    } else {
        debug!(session_id = session.id, %action, from = %session.status, "rejected transition");
        Err(TransitionError {
            action,
            from: session.status,
        })
    }
}

fn set_status(session: &mut Session, to: SessionStatus, action: TransitionAction) {
    let from = session.status;
    debug_assert!(from.can_transition_to(&to), "{from} -> {to}");
    session.status = to;
    info!(session_id = session.id, %action, %from, %to, "session transition");
}
