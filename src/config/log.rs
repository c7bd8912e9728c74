use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    /// Directory of the rolling log file; stdout when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_level")]
    pub level: String,
}
impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            level: default_level(),
        }
    }
}
impl LogConfig {
    pub fn validate(&self) -> Result<()> {
        EnvFilter::try_new(&self.level)
            .map_err(|e| Error::InvalidConfig(format!("log level {:?}: {}", self.level, e)))?;

        if let Some(dir) = &self.log_dir {
            if dir.as_os_str().is_empty() {
                return Err(Error::InvalidConfig("log_dir cannot be empty".into()));
            }
        }
        Ok(())
    }
}

fn default_level() -> String {
    "info".to_string()
}
