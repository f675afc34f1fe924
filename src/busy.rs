//! In-flight guards for submissions and cancellation signals for runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Flag marking a call as in flight.
///
/// Clones share the same flag, so a UI handle and a spawned task see the
/// same state.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag {
    busy: Arc<AtomicBool>,
}

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the flag for the lifetime of the returned guard.
    ///
    /// Returns `None` if another call already holds it.
    pub fn try_begin(&self) -> Option<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

/// RAII guard that clears the busy flag on drop.
///
/// Early returns via `?`, panics and normal completion all release it.
#[derive(Debug)]
pub struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// Cooperative cancellation signal passed into a run.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
