//! Message transport contract.
//!
//! A transport connects to a set of brokers and hands out one ordered stream
//! per topic partition. The broker wire protocol lives behind these traits;
//! [`MemoryTransport`] is the in-process implementation.
mod memory;
pub use memory::*;


use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::Result;

/// Ordered, per-partition message stream. Yields an `Err` at most once, right
/// before it ends.
pub type MessageStream = BoxStream<'static, Result<ConsumedMessage>>;

/// Where a new partition stream starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOffset {
    /// First record still retained by the partition
    Oldest,
    /// Only records appended after the stream is opened
    Newest,
    At(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Bytes,
}

#[async_trait]
pub trait MessageTransport: Send + Sync + 'static {
    async fn connect(
        &self,
        brokers: &[String],
    ) -> Result<Arc<dyn TransportConnection>>;
}

#[async_trait]
pub trait TransportConnection: Send + Sync + 'static {
    /// Opens a stream over one partition. Failures are scoped to that
    /// partition and surface as [`crate::ConsumeError`].
    async fn open_partition_stream(
        &self,
        topic: &str,
        partition: i32,
        offset: StartOffset,
    ) -> Result<MessageStream>;
}
