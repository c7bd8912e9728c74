use std::sync::Arc;
use std::time::Duration;

use kguard::ClusterEntry;
use kguard::DirectoryConfig;
use kguard::ExecutionContext;
use kguard::MemoryTransport;
use kguard::StaticDirectory;
use kguard::WatcherMetrics;
use kguard::WatchersConfig;
use tokio::time::sleep;
use tokio::time::Instant;

pub const CLUSTER: &str = "trade";
pub const TOPIC: &str = "applog";
pub const PARTITIONS: i32 = 3;

/// In-process collaborators wired the way `main` wires them.
pub struct TestDaemon {
    pub directory: Arc<StaticDirectory>,
    pub transport: MemoryTransport,
    pub ctx: ExecutionContext,
}

pub fn directory_config(gateways: &[&str]) -> DirectoryConfig {
    let mut config = DirectoryConfig {
        gateways: gateways.iter().map(|g| g.to_string()).collect(),
        ..Default::default()
    };
    config.clusters.insert(
        CLUSTER.to_string(),
        ClusterEntry {
            brokers: vec!["10.0.1.1:9092".to_string(), "10.0.1.2:9092".to_string()],
            topics: [(TOPIC.to_string(), PARTITIONS)].into_iter().collect(),
        },
    );
    config
}

pub fn watchers_config(poll_interval_in_ms: u64) -> WatchersConfig {
    let mut settings = WatchersConfig::default();
    settings.apperr.cluster = Some(CLUSTER.to_string());
    settings.apperr.topic = Some(TOPIC.to_string());
    settings.liveness.poll_interval_in_ms = poll_interval_in_ms;
    settings
}

pub fn build_daemon(
    settings: WatchersConfig,
    gateways: &[&str],
) -> TestDaemon {
    let config = directory_config(gateways);
    let transport = MemoryTransport::from_directory(&config);
    let directory = Arc::new(StaticDirectory::new(config));
    let metrics = Arc::new(WatcherMetrics::new().expect("metrics should register"));
    let ctx = ExecutionContext::new(directory.clone(), Arc::new(transport.clone()), settings, metrics);
    TestDaemon {
        directory,
        transport,
        ctx,
    }
}

pub async fn wait_until<F>(
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
