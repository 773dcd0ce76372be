use std::sync::Arc;

use chrono::{DateTime, Utc};
use standup_core::Engine;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    clock: Clock,
}

impl AppState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            clock: Arc::new(Utc::now),
        }
    }

    /// Use a fixed or simulated clock instead of the wall clock.
    pub fn with_clock(
        engine: Arc<Engine>,
        clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static,
    ) -> Self {
        Self {
            engine,
            clock: Arc::new(clock),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}
