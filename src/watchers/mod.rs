//! Built-in watchers.
mod app_error;
mod liveness;
pub use app_error::*;
pub use liveness::*;


use crate::constants::APP_ERROR_WATCHER;
use crate::constants::LIVENESS_WATCHER;
use crate::Watcher;
use crate::WatcherRegistry;
use crate::WatcherRegistryBuilder;

/// Registers every built-in watcher under its fixed name.
pub fn register_builtin_watchers(builder: &mut WatcherRegistryBuilder) {
    builder
        .register(APP_ERROR_WATCHER, || Box::new(AppErrorWatcher::new()) as Box<dyn Watcher>)
        .register(LIVENESS_WATCHER, || Box::new(LivenessWatcher::new()) as Box<dyn Watcher>);
}

/// Frozen registry holding only the built-in watchers.
pub fn builtin_registry() -> WatcherRegistry {
    let mut builder = WatcherRegistry::builder();
    register_builtin_watchers(&mut builder);
    builder.build()
}
