//! Watcher daemon for a clustered publish/subscribe platform.
//!
//! The daemon hosts a set of named, independently running watchers. Each one
//! observes one aspect of the cluster and publishes its findings as
//! Prometheus metrics and structured log lines:
//!
//! - `kateway.apperr` tails the application log topic across all of its
//!   partitions and counts error-bearing messages.
//! - `kateway.engine` periodically counts live gateway instances.
//!
//! Watchers share one [`ExecutionContext`]; cancelling it stops every
//! watcher and the daemon waits on its completion tracker before exiting.
mod config;
mod directory;
mod errors;
mod metrics;
mod monitor;
mod transport;
mod watcher;
mod watchers;

pub mod constants;

pub use config::*;
pub use directory::*;
pub use errors::*;
pub use metrics::*;
pub use monitor::*;
pub use transport::*;
pub use watcher::*;
pub use watchers::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
