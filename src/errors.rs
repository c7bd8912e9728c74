//! Watcher Daemon Error Hierarchy
//!
//! Errors are split by blast radius. [`Error`] is what the daemon itself can
//! fail with, and it is only produced during startup. [`WatcherError`] and its
//! sub-errors describe failures inside a single watcher; they are logged by the
//! watcher that hit them and never cross into the daemon or a sibling watcher.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration sources could not be read or deserialized
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A configuration value failed validation
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Failures owned by a single watcher
    #[error(transparent)]
    Watcher(#[from] WatcherError),

    /// Watcher name resolution failures
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Metric construction or registration failures
    #[error(transparent)]
    Metrics(#[from] prometheus::Error),

    /// Log file and other local I/O
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    /// Required setting missing or invalid; the watcher disables itself
    #[error("{watcher} disabled: {reason}")]
    Configuration {
        watcher: &'static str,
        reason: String,
    },

    /// Directory or transport unreachable; fatal to the owning watcher only
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A single partition stream failed; fatal to that partition task only
    #[error(transparent)]
    PartitionConsume(#[from] ConsumeError),

    /// A single liveness query failed; the tick is skipped
    #[error("Liveness poll failed: {0}")]
    Poll(String),

    /// `run` was called before `init`
    #[error("{0} was run before init")]
    NotInitialized(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("cluster[{cluster}] has empty brokers")]
    EmptyBrokers { cluster: String },

    #[error("cluster[{0}] is unknown to the directory")]
    UnknownCluster(String),

    #[error("topic {topic} not found in cluster[{cluster}]")]
    UnknownTopic { cluster: String, topic: String },

    /// None of the given brokers accepted the connection
    #[error("Connect to brokers {brokers:?} failed: {reason}")]
    ConnectFailed {
        brokers: Vec<String>,
        reason: String,
    },

    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConsumeError {
    #[error("partition {topic}/{partition} does not exist")]
    PartitionNotFound { topic: String, partition: i32 },

    #[error("offset {offset} out of range for {topic}/{partition}")]
    OffsetOutOfRange {
        topic: String,
        partition: i32,
        offset: i64,
    },

    #[error("read failed on {topic}/{partition}: {reason}")]
    ReadFailed {
        topic: String,
        partition: i32,
        reason: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no watcher registered under name {0:?}")]
    NotFound(String),
}

// ============== Conversion Implementations ============== //
impl From<ConnectionError> for Error {
    fn from(e: ConnectionError) -> Self {
        Error::Watcher(WatcherError::Connection(e))
    }
}

impl From<ConsumeError> for Error {
    fn from(e: ConsumeError) -> Self {
        Error::Watcher(WatcherError::PartitionConsume(e))
    }
}
