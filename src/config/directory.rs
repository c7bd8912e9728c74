use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Cluster layout served by [`crate::StaticDirectory`].
///
/// ```toml
/// [directory]
/// gateways = ["10.0.0.1:9191", "10.0.0.2:9191"]
///
/// [directory.clusters.trade]
/// brokers = ["10.0.1.1:9092"]
/// topics = { applog = 4 }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub clusters: HashMap<String, ClusterEntry>,

    /// Addresses of the gateway instances currently registered as live
    #[serde(default)]
    pub gateways: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ClusterEntry {
    #[serde(default)]
    pub brokers: Vec<String>,

    /// Topic name to partition count; partitions are numbered from 0
    #[serde(default)]
    pub topics: HashMap<String, i32>,
}

impl DirectoryConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, cluster) in &self.clusters {
            if let Some((topic, count)) = cluster.topics.iter().find(|(_, c)| **c <= 0) {
                return Err(Error::InvalidConfig(format!(
                    "cluster[{}] topic {} has {} partitions",
                    name, topic, count
                )));
            }
        }
        Ok(())
    }
}
