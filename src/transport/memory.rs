use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::stream;
use futures::StreamExt;
use parking_lot::Mutex;
use parking_lot::RwLock;
use tokio::sync::Notify;
use tracing::debug;

use super::ConsumedMessage;
use super::MessageStream;
use super::MessageTransport;
use super::StartOffset;
use super::TransportConnection;
use crate::ConnectionError;
use crate::ConsumeError;
use crate::DirectoryConfig;
use crate::Result;

/// In-process transport holding every partition as an append-only vector.
///
/// Cloning is cheap and every clone sees the same partitions, so a test can
/// keep one handle for appending while a watcher consumes through another.
#[derive(Clone)]
pub struct MemoryTransport {
    shared: Arc<Shared>,
}

struct Shared {
    brokers: Vec<String>,
    partitions: DashMap<(String, i32), Arc<MemoryPartition>>,
    connections: AtomicUsize,
}

#[derive(Default)]
struct MemoryPartition {
    records: RwLock<Vec<Bytes>>,
    failure: Mutex<Option<String>>,
    appended: Notify,
    open_streams: AtomicUsize,
}

impl MemoryPartition {
    /// Waits until `offset` exists or the partition is failed.
    async fn next_record(
        &self,
        offset: i64,
    ) -> std::result::Result<Bytes, String> {
        loop {
            let notified = self.appended.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let failure = self.failure.lock().clone();
            if let Some(reason) = failure {
                return Err(reason);
            }
            let record = self.records.read().get(offset as usize).cloned();
            if let Some(payload) = record {
                return Ok(payload);
            }

            notified.await;
        }
    }

    fn len(&self) -> i64 {
        self.records.read().len() as i64
    }
}

/// Counts a stream as open until the stream is dropped.
struct StreamLease(Arc<MemoryPartition>);

impl Drop for StreamLease {
    fn drop(&mut self) {
        self.0.open_streams.fetch_sub(1, Ordering::AcqRel);
    }
}

struct Cursor {
    topic: String,
    partition: i32,
    next: i64,
    lease: StreamLease,
    done: bool,
}

impl MemoryTransport {
    /// Creates a transport accepting connections that name any of `brokers`.
    pub fn new(brokers: Vec<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                brokers,
                partitions: DashMap::new(),
                connections: AtomicUsize::new(0),
            }),
        }
    }

    /// Builds a transport knowing every broker and topic of `config`.
    pub fn from_directory(config: &DirectoryConfig) -> Self {
        let brokers = config.clusters.values().flat_map(|c| c.brokers.iter().cloned()).collect();
        let transport = Self::new(brokers);
        for cluster in config.clusters.values() {
            for (topic, count) in &cluster.topics {
                transport.create_topic(topic, *count);
            }
        }
        transport
    }

    /// Creates partitions `0..partitions` of `topic`; existing ones are kept.
    pub fn create_topic(
        &self,
        topic: &str,
        partitions: i32,
    ) {
        for id in 0..partitions {
            self.shared.partitions.entry((topic.to_string(), id)).or_default();
        }
    }

    /// Appends a record and returns its offset.
    pub fn append(
        &self,
        topic: &str,
        partition: i32,
        payload: impl Into<Bytes>,
    ) -> Result<i64> {
        let p = self.partition(topic, partition)?;
        let offset = {
            let mut records = p.records.write();
            records.push(payload.into());
            records.len() as i64 - 1
        };
        p.appended.notify_waiters();
        Ok(offset)
    }

    /// Makes every current and future read of the partition fail.
    pub fn fail_partition(
        &self,
        topic: &str,
        partition: i32,
        reason: &str,
    ) -> Result<()> {
        let p = self.partition(topic, partition)?;
        *p.failure.lock() = Some(reason.to_string());
        p.appended.notify_waiters();
        Ok(())
    }

    /// Number of successful `connect` calls so far.
    pub fn connection_count(&self) -> usize {
        self.shared.connections.load(Ordering::Acquire)
    }

    /// Streams currently open over the partition.
    pub fn open_stream_count(
        &self,
        topic: &str,
        partition: i32,
    ) -> usize {
        self.shared
            .partitions
            .get(&(topic.to_string(), partition))
            .map(|p| p.open_streams.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    fn partition(
        &self,
        topic: &str,
        partition: i32,
    ) -> std::result::Result<Arc<MemoryPartition>, ConsumeError> {
        self.shared
            .partitions
            .get(&(topic.to_string(), partition))
            .map(|p| Arc::clone(p.value()))
            .ok_or_else(|| ConsumeError::PartitionNotFound {
                topic: topic.to_string(),
                partition,
            })
    }
}

#[async_trait]
impl MessageTransport for MemoryTransport {
    async fn connect(
        &self,
        brokers: &[String],
    ) -> Result<Arc<dyn TransportConnection>> {
        if !brokers.iter().any(|b| self.shared.brokers.contains(b)) {
            return Err(ConnectionError::ConnectFailed {
                brokers: brokers.to_vec(),
                reason: "no reachable broker".to_string(),
            }
            .into());
        }

        self.shared.connections.fetch_add(1, Ordering::AcqRel);
        debug!(?brokers, "memory transport connected");
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl TransportConnection for MemoryTransport {
    async fn open_partition_stream(
        &self,
        topic: &str,
        partition: i32,
        offset: StartOffset,
    ) -> Result<MessageStream> {
        let p = self.partition(topic, partition)?;

        let start = match offset {
            StartOffset::Oldest => 0,
            StartOffset::Newest => p.len(),
            StartOffset::At(at) => {
                if at < 0 || at > p.len() {
                    return Err(ConsumeError::OffsetOutOfRange {
                        topic: topic.to_string(),
                        partition,
                        offset: at,
                    }
                    .into());
                }
                at
            }
        };

        p.open_streams.fetch_add(1, Ordering::AcqRel);
        let cursor = Cursor {
            topic: topic.to_string(),
            partition,
            next: start,
            lease: StreamLease(p),
            done: false,
        };

        let stream = stream::unfold(cursor, |mut c| async move {
            if c.done {
                return None;
            }
            match c.lease.0.next_record(c.next).await {
                Ok(payload) => {
                    let message = ConsumedMessage {
                        topic: c.topic.clone(),
                        partition: c.partition,
                        offset: c.next,
                        payload,
                    };
                    c.next += 1;
                    Some((Ok(message), c))
                }
                Err(reason) => {
                    c.done = true;
                    let err = ConsumeError::ReadFailed {
                        topic: c.topic.clone(),
                        partition: c.partition,
                        reason,
                    };
                    Some((Err(err.into()), c))
                }
            }
        });
        Ok(stream.boxed())
    }
}
