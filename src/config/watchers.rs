use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::APP_ERROR_WATCHER;
use crate::constants::LIVENESS_WATCHER;
use crate::Error;
use crate::Result;
use crate::WatcherError;

/// Watchers to start, plus the per-watcher sections they read at run entry.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchersConfig {
    /// Registry names of the watchers the daemon starts
    #[serde(default = "default_enabled")]
    pub enabled: Vec<String>,

    #[serde(default)]
    pub apperr: AppErrorConfig,

    #[serde(default)]
    pub liveness: LivenessConfig,
}
impl Default for WatchersConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            apperr: AppErrorConfig::default(),
            liveness: LivenessConfig::default(),
        }
    }
}
impl WatchersConfig {
    pub fn validate(&self) -> Result<()> {
        if self.enabled.is_empty() {
            return Err(Error::InvalidConfig(
                "watchers.enabled must name at least one watcher".into(),
            ));
        }
        if let Some(blank) = self.enabled.iter().find(|n| n.trim().is_empty()) {
            return Err(Error::InvalidConfig(format!(
                "watchers.enabled contains a blank name: {:?}",
                blank
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppErrorConfig {
    /// Cluster holding the application log topic
    #[serde(default)]
    pub cluster: Option<String>,

    /// Topic the client libraries ship their logs to
    #[serde(default)]
    pub topic: Option<String>,

    /// Slots of the fan-in channel shared by all partition consumers
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}
impl Default for AppErrorConfig {
    fn default() -> Self {
        Self {
            cluster: None,
            topic: None,
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Validated view of [`AppErrorConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppErrorTarget {
    pub cluster: String,
    pub topic: String,
    pub channel_capacity: usize,
}

impl AppErrorConfig {
    /// Resolves the section into a target, failing with a configuration error
    /// when cluster or topic is missing or blank.
    pub fn target(&self) -> std::result::Result<AppErrorTarget, WatcherError> {
        let cluster = non_blank(self.cluster.as_deref());
        let topic = non_blank(self.topic.as_deref());

        let (Some(cluster), Some(topic)) = (cluster, topic) else {
            return Err(WatcherError::Configuration {
                watcher: APP_ERROR_WATCHER,
                reason: "empty cluster/topic params provided".into(),
            });
        };
        if self.channel_capacity == 0 {
            return Err(WatcherError::Configuration {
                watcher: APP_ERROR_WATCHER,
                reason: "channel_capacity must be greater than 0".into(),
            });
        }

        Ok(AppErrorTarget {
            cluster: cluster.to_string(),
            topic: topic.to_string(),
            channel_capacity: self.channel_capacity,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LivenessConfig {
    #[serde(default = "default_poll_interval_in_ms")]
    pub poll_interval_in_ms: u64,

    /// Live gateway count below which every tick raises a warning
    #[serde(default = "default_min_healthy_instances")]
    pub min_healthy_instances: usize,
}
impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            poll_interval_in_ms: default_poll_interval_in_ms(),
            min_healthy_instances: default_min_healthy_instances(),
        }
    }
}
impl LivenessConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_in_ms)
    }

    pub fn check(&self) -> std::result::Result<(), WatcherError> {
        if self.poll_interval_in_ms == 0 {
            return Err(WatcherError::Configuration {
                watcher: LIVENESS_WATCHER,
                reason: "poll_interval_in_ms must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

fn default_enabled() -> Vec<String> {
    vec![APP_ERROR_WATCHER.to_string(), LIVENESS_WATCHER.to_string()]
}
fn default_channel_capacity() -> usize {
    2000
}
fn default_poll_interval_in_ms() -> u64 {
    60_000
}
fn default_min_healthy_instances() -> usize {
    2
}
