use std::sync::Arc;

use deepwork_core::{Clock, Database, SessionService};
use tokio::sync::Mutex;

pub type SharedClock = Arc<dyn Clock + Send + Sync>;

pub type Service = SessionService<Database, SharedClock>;

/// Shared handler state.
///
/// Requests take the service lock for the whole fetch-check-write of a
/// transition, so two transitions on the same session never interleave.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<Mutex<Service>>,
}

impl AppState {
    pub fn new(service: Service) -> Self {
        Self {
            service: Arc::new(Mutex::new(service)),
        }
    }
}
