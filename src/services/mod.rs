//! Long-lived services shared by the web layer and background tasks

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod catalog_service;
pub mod stream_validator;

pub use catalog_service::{CatalogOrigin, CatalogService, RebuildSummary};
pub use stream_validator::{StartOutcome, StreamValidator, ValidationService, ValidationStatus};

/// Single-flight marker: holds `flag` set until dropped
///
/// The guard owns its flag so it can move into a spawned task.
pub(crate) struct RunGuard {
    flag: Arc<AtomicBool>,
}

impl RunGuard {
    /// Set the flag, or return `None` when another run already holds it
    pub(crate) fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
