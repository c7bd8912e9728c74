//! Watcher capability and the plumbing shared by every watcher.
//!
//! A watcher moves through
//! `Created -> Initialized -> Running -> Draining -> Terminated`:
//! its factory creates it, [`Watcher::init`] binds it to the shared
//! [`ExecutionContext`], [`Watcher::run`] spawns its subtasks, cancellation
//! makes the subtasks unwind, and the instance is dropped once `run` returns.
//! Instances are single-use; nothing restarts a watcher whose `run` returned.
mod context;
mod inflight;
mod registry;
pub use context::*;
pub use inflight::*;
pub use registry::*;


use async_trait::async_trait;

#[async_trait]
pub trait Watcher: Send + 'static {
    /// Registry name, used in logs.
    fn name(&self) -> &'static str;

    /// Binds the watcher to the daemon's shared context.
    fn init(
        &mut self,
        ctx: ExecutionContext,
    );

    /// Runs until cancellation or a watcher-fatal error.
    ///
    /// Errors never escape: they are logged and end this watcher only.
    async fn run(self: Box<Self>);
}
