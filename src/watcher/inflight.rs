use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::Notify;

/// Counter of in-flight watcher tasks.
///
/// Tasks register by holding an [`InflightGuard`]; dropping the guard is the
/// only way to deregister, so every exit path (return, error, panic unwind,
/// abort) decrements exactly once.
#[derive(Debug, Default)]
pub struct InflightTracker {
    count: AtomicUsize,
    idle: Notify,
}

#[derive(Debug)]
#[must_use = "the task is deregistered as soon as the guard is dropped"]
pub struct InflightGuard {
    tracker: Arc<InflightTracker>,
}

impl InflightTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn enter(self: &Arc<Self>) -> InflightGuard {
        self.count.fetch_add(1, Ordering::AcqRel);
        InflightGuard {
            tracker: Arc::clone(self),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Resolves once no task is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        if self.tracker.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.tracker.idle.notify_waiters();
        }
    }
}
