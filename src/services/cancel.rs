//! Cooperative cancellation for long-running bulk operations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Shared flag checked between items of a bulk operation.
///
/// Raising it never interrupts an item in flight; the operation finishes the
/// current item, stops, and reports `cancelled = true`.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Raise the signal once `after` has elapsed. Dropping the returned guard
    /// disarms the timer.
    pub fn with_deadline(&self, after: Duration) -> DeadlineGuard {
        let signal = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            tracing::warn!(
                deadline_ms = after.as_millis() as u64,
                "Bulk operation deadline reached, cancelling"
            );
            signal.cancel();
        });
        DeadlineGuard { handle }
    }
}

/// Aborts the deadline timer when dropped.
pub struct DeadlineGuard {
    handle: JoinHandle<()>,
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
