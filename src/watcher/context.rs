use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::Instrument;

use super::InflightTracker;
use crate::ClusterDirectory;
use crate::MessageTransport;
use crate::WatcherMetrics;
use crate::WatchersConfig;

/// Read-only handle shared by every watcher of one daemon run.
///
/// Cloning shares the same directory, transport, cancellation token and
/// tracker.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    directory: Arc<dyn ClusterDirectory>,
    transport: Arc<dyn MessageTransport>,
    settings: Arc<WatchersConfig>,
    metrics: Arc<WatcherMetrics>,
    shutdown: CancellationToken,
    inflight: Arc<InflightTracker>,
}

impl ExecutionContext {
    /// Creates a context with a fresh cancellation token and an idle tracker.
    pub fn new(
        directory: Arc<dyn ClusterDirectory>,
        transport: Arc<dyn MessageTransport>,
        settings: WatchersConfig,
        metrics: Arc<WatcherMetrics>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                directory,
                transport,
                settings: Arc::new(settings),
                metrics,
                shutdown: CancellationToken::new(),
                inflight: InflightTracker::new(),
            }),
        }
    }

    pub fn directory(&self) -> &dyn ClusterDirectory {
        self.inner.directory.as_ref()
    }

    pub fn transport(&self) -> &dyn MessageTransport {
        self.inner.transport.as_ref()
    }

    pub fn settings(&self) -> &WatchersConfig {
        &self.inner.settings
    }

    pub fn metrics(&self) -> &WatcherMetrics {
        &self.inner.metrics
    }

    /// Non-blocking check of the cancellation signal.
    pub fn cancelled(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Token to race against in `select!`.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.inner.shutdown
    }

    /// Broadcasts cancellation to every task. Idempotent.
    pub fn cancel(&self) {
        if !self.inner.shutdown.is_cancelled() {
            debug!("broadcasting cancellation");
        }
        self.inner.shutdown.cancel();
    }

    pub fn inflight(&self) -> &InflightTracker {
        &self.inner.inflight
    }

    /// Awaits `fut` unless cancellation fires first, in which case `fut` is
    /// dropped and `None` is returned.
    ///
    /// Collaborator calls go through this so a stalled directory or transport
    /// never holds a task past shutdown.
    pub async fn until_cancelled<F>(
        &self,
        fut: F,
    ) -> Option<F::Output>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.inner.shutdown.cancelled() => None,
            out = fut => Some(out),
        }
    }

    /// Spawns `task` as an in-flight task.
    ///
    /// The task is registered before this returns, so a tracker observed at
    /// zero after `spawn` really means the task finished. The task runs in
    /// the caller's current span.
    pub fn spawn<F>(
        &self,
        name: &str,
        task: F,
    ) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = self.inner.inflight.enter();
        let name = name.to_string();
        tokio::spawn(
            async move {
                let _guard = guard;
                task.await;
                debug!("task {} exited", name);
            }
            .in_current_span(),
        )
    }
}
