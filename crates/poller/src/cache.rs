//! Single-slot holder of the most recent sample.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tsm_core::Snapshot;

/// At most one buffered [`Snapshot`]; the freshest publish wins.
///
/// [`ScanCache::take`] clears the slot, so a second take before the next
/// publish sees `None` rather than a stale duplicate.
#[derive(Debug, Default)]
pub struct ScanCache {
    slot: Mutex<Option<Snapshot>>,
}

impl ScanCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever is held, consumed or not.
    pub fn publish(&self, snapshot: Snapshot) {
        *self.lock() = Some(snapshot);
    }

    /// Returns the held snapshot and empties the slot.
    pub fn take(&self) -> Option<Snapshot> {
        self.lock().take()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Snapshot>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
