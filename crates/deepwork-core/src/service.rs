//! Session operations backed by a store.
//!
//! Each transition loads the session, applies it through the
//! [`SessionManager`], and writes the result inside one store transaction.
//! A rejected transition returns before anything is written.

use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::error::{CoreError, Result};
use crate::history::SessionHistory;
use crate::session::{NewSession, Session, SessionManager, TransitionAction};
use crate::storage::SessionStore;

pub const DEFAULT_PAGE_SIZE: usize = 100;

pub struct SessionService<S: SessionStore, C: Clock = SystemClock> {
    store: S,
    manager: SessionManager<C>,
}

impl<S: SessionStore, C: Clock> SessionService<S, C> {
    pub fn new(store: S, manager: SessionManager<C>) -> Self {
        Self { store, manager }
    }

    pub fn create(&mut self, input: NewSession) -> Result<Session> {
        let draft = self.manager.create(input)?;
        let session = self.store.insert(&draft)?;
        info!(session_id = session.id, title = %session.title, "created session");
        Ok(session)
    }

    pub fn get(&self, id: i64) -> Result<Session> {
        self.store
            .fetch_by_id(id)?
            .ok_or_else(|| CoreError::session_not_found(id))
    }

    pub fn list(&self, offset: usize, limit: usize) -> Result<Vec<Session>> {
        self.store.list_all(offset, limit)
    }

    pub fn start(&mut self, id: i64) -> Result<Session> {
        self.transition(id, TransitionAction::Start, None)
    }

    pub fn pause(&mut self, id: i64, reason: &str) -> Result<Session> {
        self.transition(id, TransitionAction::Pause, Some(reason))
    }

    pub fn resume(&mut self, id: i64) -> Result<Session> {
        self.transition(id, TransitionAction::Resume, None)
    }

    pub fn complete(&mut self, id: i64) -> Result<Session> {
        self.transition(id, TransitionAction::Complete, None)
    }

    pub fn delete(&mut self, id: i64) -> Result<()> {
        if self.store.delete(id)? {
            info!(session_id = id, "deleted session");
            Ok(())
        } else {
            Err(CoreError::session_not_found(id))
        }
    }

    pub fn history(&self) -> Result<SessionHistory> {
        Ok(SessionHistory::from_sessions(self.store.list_recent()?))
    }

    fn transition(&mut self, id: i64, action: TransitionAction, reason: Option<&str>) -> Result<Session> {
        let manager = &self.manager;
        self.store.transaction(|store| {
            let mut session = store
                .fetch_by_id(id)?
                .ok_or_else(|| CoreError::session_not_found(id))?;
            manager.apply(&mut session, action, reason)?;

            for interruption in session.unsaved_interruptions_mut() {
                *interruption = store.insert_interruption(interruption)?;
            }
            store.update(&session)?;
            store
                .fetch_by_id(id)?
                .ok_or_else(|| CoreError::session_not_found(id))
        })
    }
}
