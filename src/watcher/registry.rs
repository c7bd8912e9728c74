use std::collections::BTreeMap;

use tracing::warn;

use super::Watcher;
use crate::RegistryError;
use crate::Result;

/// No-argument constructor of a fresh, unstarted watcher.
pub type WatcherFactory = Box<dyn Fn() -> Box<dyn Watcher> + Send + Sync>;

/// Collects watcher factories during startup.
///
/// Registration happens in a fixed order on a single thread; a second
/// registration under the same name replaces the first.
#[derive(Default)]
pub struct WatcherRegistryBuilder {
    factories: BTreeMap<String, WatcherFactory>,
}

impl WatcherRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(
        &mut self,
        name: &str,
        factory: F,
    ) -> &mut Self
    where
        F: Fn() -> Box<dyn Watcher> + Send + Sync + 'static,
    {
        if self.factories.insert(name.to_string(), Box::new(factory)).is_some() {
            warn!("watcher {} registered twice, last registration wins", name);
        }
        self
    }

    /// Freezes the registry. No registration is possible afterwards.
    pub fn build(self) -> WatcherRegistry {
        WatcherRegistry {
            factories: self.factories,
        }
    }
}

/// Frozen name to factory map used by the daemon's run phase.
pub struct WatcherRegistry {
    factories: BTreeMap<String, WatcherFactory>,
}

impl WatcherRegistry {
    pub fn builder() -> WatcherRegistryBuilder {
        WatcherRegistryBuilder::new()
    }

    pub fn lookup(
        &self,
        name: &str,
    ) -> Result<&WatcherFactory> {
        self.factories
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()).into())
    }

    /// Creates a fresh instance of the named watcher.
    pub fn create(
        &self,
        name: &str,
    ) -> Result<Box<dyn Watcher>> {
        let factory = self.lookup(name)?;
        Ok(factory())
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}
