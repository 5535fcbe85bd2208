use std::sync::Arc;

use kinsync_core::Scheduler;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        AppState { scheduler }
    }
}
