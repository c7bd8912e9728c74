//! Cluster directory contract.
//!
//! The directory is owned by another system (the registry the brokers and
//! gateways announce themselves in). Watchers only consume the three lookups
//! below; [`StaticDirectory`] is the configuration-backed implementation the
//! daemon ships with.
mod static_directory;
pub use static_directory::*;


use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::Result;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterDirectory: Send + Sync + 'static {
    /// Broker addresses of a cluster.
    ///
    /// An unknown cluster or one without brokers fails with
    /// [`crate::ConnectionError`].
    async fn resolve_brokers(
        &self,
        cluster: &str,
    ) -> Result<Vec<String>>;

    /// Partition ids of `topic` in `cluster`.
    async fn list_partitions(
        &self,
        cluster: &str,
        topic: &str,
    ) -> Result<Vec<i32>>;

    /// Addresses of the gateway instances currently registered as live.
    async fn list_live_gateways(&self) -> Result<Vec<String>>;
}
