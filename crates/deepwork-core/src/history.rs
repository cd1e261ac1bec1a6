//! Session history aggregation.

use serde::{Deserialize, Serialize};

use crate::session::{Session, SessionStatus};

/// All sessions, newest first, plus outcome totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionHistory {
    pub sessions: Vec<Session>,
    pub total_sessions: u64,
    pub completed_sessions: u64,
    pub interrupted_sessions: u64,
    pub overdue_sessions: u64,
    pub abandoned_sessions: u64,
    /// Minutes spent in sessions that ended `completed`
    pub total_productive_time: f64,
    /// Pauses across every session, whatever its status
    pub total_interruptions: u64,
}

impl SessionHistory {
    pub fn from_sessions(mut sessions: Vec<Session>) -> Self {
        sessions.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let mut history = SessionHistory {
            total_sessions: sessions.len() as u64,
            ..Default::default()
        };

        for session in &sessions {
            match session.status {
                SessionStatus::Completed => {
                    history.completed_sessions += 1;
                    if let Some(minutes) = session.elapsed_minutes() {
                        history.total_productive_time += minutes;
                    }
                }
                SessionStatus::Interrupted => history.interrupted_sessions += 1,
                SessionStatus::Overdue => history.overdue_sessions += 1,
                SessionStatus::Abandoned => history.abandoned_sessions += 1,
                SessionStatus::Planned | SessionStatus::Active | SessionStatus::Paused => {}
            }
            history.total_interruptions += session.interruption_count() as u64;
        }

        history.sessions = sessions;
        history
    }

    pub fn count(&self, status: SessionStatus) -> u64 {
        self.sessions.iter().filter(|s| s.status == status).count() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Interruption;
    use chrono::{Duration, Utc};

    fn session(id: i64, status: SessionStatus, elapsed_min: Option<i64>, pauses: usize) -> Session {
        let created = Utc::now() + Duration::seconds(id);
        let start = created + Duration::seconds(1);
        Session {
            id,
            title: format!("session {id}"),
            goal: "goal".into(),
            scheduled_duration: 30.0,
            start_time: elapsed_min.map(|_| start),
            end_time: elapsed_min.map(|m| start + Duration::minutes(m)),
            status,
            created_at: created,
            interruptions: (0..pauses)
                .map(|i| Interruption {
                    id: i as i64 + 1,
                    session_id: id,
                    reason: "ping".into(),
                    pause_time: start,
                })
                .collect(),
        }
    }

    #[test]
    fn empty_history() {
        let h = SessionHistory::from_sessions(Vec::new());
        assert_eq!(h.total_sessions, 0);
        assert_eq!(h.total_productive_time, 0.0);
    }

    #[test]
    fn productive_time_counts_completed_only() {
        let h = SessionHistory::from_sessions(vec![
            session(1, SessionStatus::Completed, Some(20), 0),
            session(2, SessionStatus::Completed, Some(10), 1),
            session(3, SessionStatus::Overdue, Some(90), 0),
            session(4, SessionStatus::Interrupted, Some(15), 4),
            session(5, SessionStatus::Planned, None, 0),
        ]);
        assert_eq!(h.total_sessions, 5);
        assert_eq!(h.completed_sessions, 2);
        assert_eq!(h.overdue_sessions, 1);
        assert_eq!(h.interrupted_sessions, 1);
        assert_eq!(h.abandoned_sessions, 0);
        assert!((h.total_productive_time - 30.0).abs() < 1e-9);
    }

    #[test]
    fn interruptions_counted_across_all_statuses() {
        let h = SessionHistory::from_sessions(vec![
            session(1, SessionStatus::Completed, Some(5), 1),
            session(2, SessionStatus::Interrupted, Some(5), 4),
            session(3, SessionStatus::Paused, None, 2),
            session(4, SessionStatus::Abandoned, Some(1), 1),
        ]);
        assert_eq!(h.total_interruptions, 8);
        assert_eq!(h.abandoned_sessions, 1);
    }

    #[test]
    fn newest_first() {
        let h = SessionHistory::from_sessions(vec![
            session(1, SessionStatus::Planned, None, 0),
            session(3, SessionStatus::Planned, None, 0),
            session(2, SessionStatus::Planned, None, 0),
        ]);
        let ids: Vec<i64> = h.sessions.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(h.count(SessionStatus::Planned), 3);
    }
}
