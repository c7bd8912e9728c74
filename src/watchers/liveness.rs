//! Gateway liveness watcher.
//!
//! Polls the directory for live gateway instances on a fixed interval,
//! publishes the count as `kateway_live` and warns when it drops below the
//! configured minimum. A failed query skips the tick; the watcher keeps
//! retrying until cancelled.

use async_trait::async_trait;
use tokio::time::interval_at;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::constants::LIVENESS_WATCHER;
use crate::constants::LIVE_GATEWAY_GAUGE;
use crate::ExecutionContext;
use crate::Watcher;
use crate::WatcherError;

#[derive(Default)]
pub struct LivenessWatcher {
    ctx: Option<ExecutionContext>,
}

impl LivenessWatcher {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Result of one directory query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Healthy { live: usize },
    UnderCapacity { live: usize, min_healthy: usize },
    /// Query failed, gauge left untouched
    Failed,
    /// Cancellation fired while the query was pending
    Cancelled,
}

#[async_trait]
impl Watcher for LivenessWatcher {
    fn name(&self) -> &'static str {
        LIVENESS_WATCHER
    }

    fn init(
        &mut self,
        ctx: ExecutionContext,
    ) {
        self.ctx = Some(ctx);
    }

    async fn run(self: Box<Self>) {
        let LivenessWatcher { ctx } = *self;
        let Some(ctx) = ctx else {
            error!("{}", WatcherError::NotInitialized(LIVENESS_WATCHER));
            return;
        };

        let config = ctx.settings().liveness.clone();
        if let Err(e) = config.check() {
            warn!("{}", e);
            return;
        }

        // warmup to avoid alert on startup
        if poll_live_gateways(&ctx, config.min_healthy_instances, false).await == PollOutcome::Cancelled {
            info!("{} stopped", LIVENESS_WATCHER);
            return;
        }

        let period = config.poll_interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = ctx.shutdown_token().cancelled() => {
                    info!("{} stopped", LIVENESS_WATCHER);
                    return;
                }
                _ = ticker.tick() => {
                    if poll_live_gateways(&ctx, config.min_healthy_instances, true).await == PollOutcome::Cancelled {
                        info!("{} stopped", LIVENESS_WATCHER);
                        return;
                    }
                }
            }
        }
    }
}

/// Queries the live gateway list and updates the gauge.
///
/// With `alarm` set, a count below `min_healthy` is logged as a warning with
/// the full instance list.
pub async fn poll_live_gateways(
    ctx: &ExecutionContext,
    min_healthy: usize,
    alarm: bool,
) -> PollOutcome {
    let gateways = match ctx.until_cancelled(ctx.directory().list_live_gateways()).await {
        None => return PollOutcome::Cancelled,
        Some(Ok(gateways)) => gateways,
        Some(Err(e)) => {
            error!("{} {}", LIVE_GATEWAY_GAUGE, WatcherError::Poll(e.to_string()));
            return PollOutcome::Failed;
        }
    };

    let live = gateways.len();
    ctx.metrics().live_gateways().set(live as i64);

    if live < min_healthy {
        if alarm {
            warn!(live, min_healthy, instances = ?gateways, "{} < {}: {:?}", LIVE_GATEWAY_GAUGE, min_healthy, gateways);
        }
        return PollOutcome::UnderCapacity { live, min_healthy };
    }
    PollOutcome::Healthy { live }
}
