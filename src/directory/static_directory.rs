use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::ClusterDirectory;
use crate::ConnectionError;
use crate::DirectoryConfig;
use crate::Result;

/// Directory answering from a [`DirectoryConfig`] snapshot.
///
/// The snapshot can be swapped at runtime, which is how an external
/// reconciler (or a test) publishes membership changes.
pub struct StaticDirectory {
    snapshot: RwLock<DirectoryConfig>,
}

impl StaticDirectory {
    pub fn new(config: DirectoryConfig) -> Self {
        Self {
            snapshot: RwLock::new(config),
        }
    }

    /// Replaces the live gateway list.
    pub fn set_live_gateways(
        &self,
        gateways: Vec<String>,
    ) {
        debug!(count = gateways.len(), "directory gateway list replaced");
        self.snapshot.write().gateways = gateways;
    }

    /// Replaces the whole snapshot.
    pub fn replace(
        &self,
        config: DirectoryConfig,
    ) {
        *self.snapshot.write() = config;
    }
}

#[async_trait]
impl ClusterDirectory for StaticDirectory {
    async fn resolve_brokers(
        &self,
        cluster: &str,
    ) -> Result<Vec<String>> {
        let snapshot = self.snapshot.read();
        let entry = snapshot
            .clusters
            .get(cluster)
            .ok_or_else(|| ConnectionError::UnknownCluster(cluster.to_string()))?;

        if entry.brokers.is_empty() {
            return Err(ConnectionError::EmptyBrokers {
                cluster: cluster.to_string(),
            }
            .into());
        }
        Ok(entry.brokers.clone())
    }

    async fn list_partitions(
        &self,
        cluster: &str,
        topic: &str,
    ) -> Result<Vec<i32>> {
        let snapshot = self.snapshot.read();
        let entry = snapshot
            .clusters
            .get(cluster)
            .ok_or_else(|| ConnectionError::UnknownCluster(cluster.to_string()))?;

        let count = entry.topics.get(topic).ok_or_else(|| ConnectionError::UnknownTopic {
            cluster: cluster.to_string(),
            topic: topic.to_string(),
        })?;
        Ok((0..*count).collect())
    }

    async fn list_live_gateways(&self) -> Result<Vec<String>> {
        Ok(self.snapshot.read().gateways.clone())
    }
}
