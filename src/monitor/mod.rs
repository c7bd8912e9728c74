//! Daemon driver hosting the configured watchers.
//!
//! ## Example
//! ```ignore
//! let ctx = ExecutionContext::new(directory, transport, settings.watchers.clone(), metrics);
//! let mut monitor = Monitor::new(builtin_registry(), ctx);
//! monitor.start(&settings.watchers.enabled)?;
//! monitor.run_until(tokio::signal::ctrl_c().map(|_| ())).await;
//! ```
#[cfg(test)]
mod monitor_test;

use std::collections::HashSet;
use std::future::Future;

use tokio::task::JoinHandle;
use tracing::error;
use tracing::info;
use tracing::info_span;
use tracing::warn;
use tracing::Instrument;

use crate::ExecutionContext;
use crate::Result;
use crate::Watcher;
use crate::WatcherRegistry;

pub struct Monitor {
    registry: WatcherRegistry,
    ctx: ExecutionContext,
    handles: Vec<(String, JoinHandle<()>)>,
}

impl Monitor {
    pub fn new(
        registry: WatcherRegistry,
        ctx: ExecutionContext,
    ) -> Self {
        Self {
            registry,
            ctx,
            handles: Vec::new(),
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Instantiates, initialises and spawns every named watcher.
    ///
    /// All names are resolved before anything is spawned, so an unknown name
    /// fails the call without starting a single watcher. Repeated names start
    /// one instance.
    pub fn start(
        &mut self,
        names: &[String],
    ) -> Result<usize> {
        let mut seen = HashSet::new();
        let mut watchers: Vec<Box<dyn Watcher>> = Vec::with_capacity(names.len());
        for name in names {
            if !seen.insert(name.as_str()) {
                warn!("watcher {} listed twice, starting it once", name);
                continue;
            }
            watchers.push(self.registry.create(name)?);
        }

        let started = watchers.len();
        for mut watcher in watchers {
            let name = watcher.name();
            watcher.init(self.ctx.clone());
            info!("starting watcher {}", name);

            let span = info_span!("watcher", name = name);
            let handle = self.ctx.spawn(name, watcher.run().instrument(span));
            self.handles.push((name.to_string(), handle));
        }
        Ok(started)
    }

    /// Broadcasts cancellation and waits until every watcher task is gone.
    pub async fn shutdown(self) {
        info!("stopping {} watchers", self.handles.len());
        self.ctx.cancel();
        self.ctx.inflight().wait_idle().await;

        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                error!("watcher {} ended abnormally: {}", name, e);
            }
        }
        info!("all watchers stopped");
    }

    /// Runs until `signal` resolves, then shuts down.
    pub async fn run_until<F>(
        self,
        signal: F,
    ) where
        F: Future<Output = ()>,
    {
        signal.await;
        self.shutdown().await;
    }
}
