use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio::time::Instant;

use crate::ClusterDirectory;
use crate::ClusterEntry;
use crate::DirectoryConfig;
use crate::ExecutionContext;
use crate::MemoryTransport;
use crate::MessageTransport;
use crate::StaticDirectory;
use crate::WatcherMetrics;
use crate::WatchersConfig;

pub(crate) const TEST_CLUSTER: &str = "trade";
pub(crate) const TEST_TOPIC: &str = "applog";
pub(crate) const TEST_BROKER: &str = "10.0.1.1:9092";

/// One cluster with one topic of `partitions` partitions.
pub(crate) fn directory_config(
    partitions: i32,
    gateways: &[&str],
) -> DirectoryConfig {
    let mut config = DirectoryConfig {
        gateways: gateways.iter().map(|g| g.to_string()).collect(),
        ..Default::default()
    };
    config.clusters.insert(
        TEST_CLUSTER.to_string(),
        ClusterEntry {
            brokers: vec![TEST_BROKER.to_string()],
            topics: [(TEST_TOPIC.to_string(), partitions)].into_iter().collect(),
        },
    );
    config
}

/// Watcher settings pointing the error watcher at the test topic.
pub(crate) fn watchers_config(channel_capacity: usize) -> WatchersConfig {
    let mut settings = WatchersConfig::default();
    settings.apperr.cluster = Some(TEST_CLUSTER.to_string());
    settings.apperr.topic = Some(TEST_TOPIC.to_string());
    settings.apperr.channel_capacity = channel_capacity;
    settings
}

pub(crate) fn test_context(
    directory: Arc<dyn ClusterDirectory>,
    transport: Arc<dyn MessageTransport>,
    settings: WatchersConfig,
) -> ExecutionContext {
    let metrics = Arc::new(WatcherMetrics::new().expect("metrics should register"));
    ExecutionContext::new(directory, transport, settings, metrics)
}

/// Context over a [`StaticDirectory`] and [`MemoryTransport`] built from the
/// same directory config. Returns the transport handle for appending.
pub(crate) fn memory_context(
    partitions: i32,
    settings: WatchersConfig,
) -> (ExecutionContext, MemoryTransport) {
    let config = directory_config(partitions, &[]);
    let transport = MemoryTransport::from_directory(&config);
    let directory = Arc::new(StaticDirectory::new(config));
    let ctx = test_context(directory, Arc::new(transport.clone()), settings);
    (ctx, transport)
}

/// Polls `condition` every few milliseconds; panics after `within`.
pub(crate) async fn wait_until<F>(
    within: Duration,
    what: &str,
    mut condition: F,
) where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + within;
    while !condition() {
        if Instant::now() >= deadline {
            panic!("timed out waiting for {}", what);
        }
        sleep(Duration::from_millis(5)).await;
    }
}
