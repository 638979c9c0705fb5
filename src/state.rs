//! Process-level state shared by the health and readiness routes.

use crate::config::Environment;
use crate::store::DocumentStore;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct ServiceState {
    pub service: String,
    pub environment: Environment,
    pub started: Instant,
    /// Probed by `/ready`. `None` when the service runs without a database.
    pub store: Option<Arc<dyn DocumentStore>>,
}

impl ServiceState {
    pub fn new(service: impl Into<String>, environment: Environment) -> Self {
        ServiceState {
            service: service.into(),
            environment,
            started: Instant::now(),
            store: None,
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}
