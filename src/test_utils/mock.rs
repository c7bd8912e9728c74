use std::future::pending;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;

use crate::ClusterDirectory;
use crate::ExecutionContext;
use crate::Result;
use crate::Watcher;

/// Counters shared between a test and the [`RecordingWatcher`]s it creates.
#[derive(Debug, Default)]
pub(crate) struct LifecycleCounters {
    pub(crate) created: AtomicUsize,
    pub(crate) initialized: AtomicUsize,
    pub(crate) running: AtomicUsize,
    pub(crate) finished: AtomicUsize,
}

impl LifecycleCounters {
    pub(crate) fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Watcher that parks until cancellation and records its lifecycle.
pub(crate) struct RecordingWatcher {
    name: &'static str,
    counters: Arc<LifecycleCounters>,
    ctx: Option<ExecutionContext>,
}

impl RecordingWatcher {
    pub(crate) fn new(
        name: &'static str,
        counters: Arc<LifecycleCounters>,
    ) -> Self {
        counters.created.fetch_add(1, Ordering::SeqCst);
        Self {
            name,
            counters,
            ctx: None,
        }
    }
}

#[async_trait]
impl Watcher for RecordingWatcher {
    fn name(&self) -> &'static str {
        self.name
    }

    fn init(
        &mut self,
        ctx: ExecutionContext,
    ) {
        self.counters.initialized.fetch_add(1, Ordering::SeqCst);
        self.ctx = Some(ctx);
    }

    async fn run(self: Box<Self>) {
        let this = *self;
        let Some(ctx) = this.ctx else {
            return;
        };
        this.counters.running.fetch_add(1, Ordering::SeqCst);
        ctx.shutdown_token().cancelled().await;
        this.counters.finished.fetch_add(1, Ordering::SeqCst);
    }
}

/// Directory whose lookups never answer.
pub(crate) struct StalledDirectory;

#[async_trait]
impl ClusterDirectory for StalledDirectory {
    async fn resolve_brokers(
        &self,
        _cluster: &str,
    ) -> Result<Vec<String>> {
        pending().await
    }

    async fn list_partitions(
        &self,
        _cluster: &str,
        _topic: &str,
    ) -> Result<Vec<i32>> {
        pending().await
    }

    async fn list_live_gateways(&self) -> Result<Vec<String>> {
        pending().await
    }
}
