//! Application error log watcher.
//!
//! Client libraries ship their logs to a topic. This watcher tails every
//! partition of that topic from the oldest retained record, keeps the lines
//! carrying a known pub/sub error marker and funnels them into one aggregator
//! that bumps `kateway_apperr` and logs each hit.
//!
//! ```text
//! partition 0 ──┐
//! partition 1 ──┼──> bounded mpsc (channel_capacity) ──> aggregator
//! partition N ──┘
//! ```
//!
//! Backpressure: a full channel blocks the partition consumers instead of
//! dropping matches. Under sustained overload a slow aggregator therefore
//! stalls tailing of every partition, fast ones included. A blocked send still
//! races the cancellation token, so shutdown is never held up by it.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::constants::APP_ERROR_MARKERS;
use crate::constants::APP_ERROR_WATCHER;
use crate::constants::MAX_PAYLOAD_PREVIEW_BYTES;
use crate::AppErrorTarget;
use crate::ConnectionError;
use crate::ConsumedMessage;
use crate::ExecutionContext;
use crate::Result;
use crate::StartOffset;
use crate::TransportConnection;
use crate::Watcher;
use crate::WatcherError;

#[derive(Default)]
pub struct AppErrorWatcher {
    ctx: Option<ExecutionContext>,
}

impl AppErrorWatcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Watcher for AppErrorWatcher {
    fn name(&self) -> &'static str {
        APP_ERROR_WATCHER
    }

    fn init(
        &mut self,
        ctx: ExecutionContext,
    ) {
        self.ctx = Some(ctx);
    }

    async fn run(self: Box<Self>) {
        let AppErrorWatcher { ctx } = *self;
        let Some(ctx) = ctx else {
            error!("{}", WatcherError::NotInitialized(APP_ERROR_WATCHER));
            return;
        };

        let target = match ctx.settings().apperr.target() {
            Ok(target) => target,
            Err(e) => {
                warn!("{}", e);
                return;
            }
        };

        let (tx, rx) = mpsc::channel(target.channel_capacity);
        let Some(spawned) = ctx.until_cancelled(spawn_partition_consumers(&ctx, &target, tx)).await else {
            info!("{} stopped before tailing started", APP_ERROR_WATCHER);
            return;
        };
        match spawned {
            Ok(0) => warn!(cluster = %target.cluster, topic = %target.topic, "topic has no partitions"),
            Ok(n) => info!(cluster = %target.cluster, topic = %target.topic, "{} tailing {} partitions", APP_ERROR_WATCHER, n),
            Err(e) => {
                error!(cluster = %target.cluster, topic = %target.topic, "{} {}", APP_ERROR_WATCHER, e);
                return;
            }
        }

        aggregate(&ctx, &target, rx).await;
    }
}

/// Returns true if the payload carries any known client error marker.
pub fn is_app_error(payload: &[u8]) -> bool {
    APP_ERROR_MARKERS.iter().any(|marker| contains(payload, marker))
}

fn contains(
    haystack: &[u8],
    needle: &[u8],
) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

/// Lossy, length-capped rendering of a payload for log lines.
pub(crate) fn payload_preview(payload: &[u8]) -> String {
    let cut = payload.len().min(MAX_PAYLOAD_PREVIEW_BYTES);
    let mut preview = String::from_utf8_lossy(&payload[..cut]).into_owned();
    if cut < payload.len() {
        preview.push_str("...");
    }
    preview
}

/// Resolves brokers, connects and spawns one consumer per distinct partition.
/// The caller races the whole sequence against cancellation.
///
/// `tx` is moved in so the channel closes once the last consumer exits.
async fn spawn_partition_consumers(
    ctx: &ExecutionContext,
    target: &AppErrorTarget,
    tx: mpsc::Sender<ConsumedMessage>,
) -> Result<usize> {
    let brokers = ctx.directory().resolve_brokers(&target.cluster).await?;
    if brokers.is_empty() {
        return Err(ConnectionError::EmptyBrokers {
            cluster: target.cluster.clone(),
        }
        .into());
    }

    let connection = ctx.transport().connect(&brokers).await?;

    let partitions: BTreeSet<i32> = ctx
        .directory()
        .list_partitions(&target.cluster, &target.topic)
        .await?
        .into_iter()
        .collect();

    for &partition in &partitions {
        let consumer = PartitionConsumer {
            cluster: target.cluster.clone(),
            topic: target.topic.clone(),
            partition,
            connection: Arc::clone(&connection),
            tx: tx.clone(),
            shutdown: ctx.shutdown_token().clone(),
        };
        ctx.spawn(
            &format!("{}:{}/{}", APP_ERROR_WATCHER, target.topic, partition),
            consumer.run(),
        );
    }

    Ok(partitions.len())
}

/// Tails one partition; owns its stream until it exits.
struct PartitionConsumer {
    cluster: String,
    topic: String,
    partition: i32,
    connection: Arc<dyn TransportConnection>,
    tx: mpsc::Sender<ConsumedMessage>,
    shutdown: CancellationToken,
}

impl PartitionConsumer {
    async fn run(self) {
        let opened = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return,
            opened = self.connection.open_partition_stream(&self.topic, self.partition, StartOffset::Oldest) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                error!(
                    cluster = %self.cluster,
                    topic = %self.topic,
                    partition = self.partition,
                    offset = "oldest",
                    "open partition: {}",
                    e
                );
                return;
            }
        };

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    debug!(topic = %self.topic, partition = self.partition, "partition consumer stopped");
                    return;
                }
                next = stream.next() => match next {
                    Some(Ok(message)) => {
                        if is_app_error(&message.payload) && !self.forward(message).await {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        error!(cluster = %self.cluster, topic = %self.topic, partition = self.partition, "{}", e);
                        return;
                    }
                    None => {
                        warn!(cluster = %self.cluster, topic = %self.topic, partition = self.partition, "partition stream closed");
                        return;
                    }
                }
            }
        }
    }

    /// Blocks while the channel is full. Returns false when the consumer
    /// should stop: cancellation, or the aggregator is gone.
    async fn forward(
        &self,
        message: ConsumedMessage,
    ) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => false,
            sent = self.tx.send(message) => sent.is_ok(),
        }
    }
}

/// Counts and logs forwarded errors until cancellation or until every
/// consumer has exited and the channel is drained. Messages still buffered at
/// cancellation are dropped.
async fn aggregate(
    ctx: &ExecutionContext,
    target: &AppErrorTarget,
    mut rx: mpsc::Receiver<ConsumedMessage>,
) {
    let app_errors = ctx.metrics().app_errors();
    loop {
        tokio::select! {
            biased;
            _ = ctx.shutdown_token().cancelled() => {
                info!("{} stopped", APP_ERROR_WATCHER);
                return;
            }
            message = rx.recv() => {
                let Some(message) = message else {
                    info!("{} every partition consumer exited", APP_ERROR_WATCHER);
                    return;
                };
                app_errors.inc();
                warn!(
                    cluster = %target.cluster,
                    topic = %target.topic,
                    partition = message.partition,
                    offset = message.offset,
                    "{}/{} {}",
                    message.partition,
                    message.offset,
                    payload_preview(&message.payload)
                );
            }
        }
    }
}
