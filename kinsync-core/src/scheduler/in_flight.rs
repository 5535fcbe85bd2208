use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use crate::source::SourceId;

/// Sources with a sync currently running.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    ids: Mutex<HashSet<SourceId>>,
}

impl InFlight {
    /// Mark `id` as syncing. Returns `None` if it already is.
    pub(crate) fn claim(&self, id: &SourceId) -> Option<InFlightGuard<'_>> {
        if !self.lock().insert(id.clone()) {
            return None;
        }
        Some(InFlightGuard {
            in_flight: self,
            id: id.clone(),
        })
    }

    pub(crate) fn contains(&self, id: &SourceId) -> bool {
        self.lock().contains(id)
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<SourceId>> {
        self.ids.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Releases the claim when dropped, including on error paths.
pub(crate) struct InFlightGuard<'a> {
    in_flight: &'a InFlight,
    id: SourceId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.id);
    }
}
