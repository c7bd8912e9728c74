use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use super::*;
use crate::constants::APP_ERROR_WATCHER;
use crate::constants::LIVENESS_WATCHER;
use crate::test_utils::memory_context;
use crate::test_utils::wait_until;
use crate::test_utils::watchers_config;
use crate::test_utils::LifecycleCounters;
use crate::test_utils::RecordingWatcher;
use crate::test_utils::TEST_TOPIC;
use crate::watchers::register_builtin_watchers;
use crate::Error;
use crate::RegistryError;

struct PanickingWatcher;

#[async_trait]
impl Watcher for PanickingWatcher {
    fn name(&self) -> &'static str {
        "panicking"
    }

    fn init(
        &mut self,
        _ctx: ExecutionContext,
    ) {
    }

    async fn run(self: Box<Self>) {
        panic!("watcher bug");
    }
}

fn recording_registry(counters: Arc<LifecycleCounters>) -> WatcherRegistry {
    let mut builder = WatcherRegistry::builder();
    let a = counters.clone();
    let b = counters;
    builder
        .register("recording.a", move || Box::new(RecordingWatcher::new("recording.a", a.clone())) as Box<dyn Watcher>)
        .register("recording.b", move || Box::new(RecordingWatcher::new("recording.b", b.clone())) as Box<dyn Watcher>)
        .register("panicking", || Box::new(PanickingWatcher) as Box<dyn Watcher>);
    builder.build()
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn start_initializes_and_spawns_each_watcher() {
    let counters = Arc::new(LifecycleCounters::default());
    let (ctx, _) = memory_context(1, watchers_config(8));
    let mut monitor = Monitor::new(recording_registry(counters.clone()), ctx.clone());

    assert_eq!(monitor.start(&names(&["recording.a", "recording.b"])).unwrap(), 2);
    assert_eq!(ctx.inflight().in_flight(), 2);
    assert_eq!(LifecycleCounters::get(&counters.initialized), 2);
    wait_until(Duration::from_secs(1), "watchers running", || {
        counters.running.load(Ordering::SeqCst) == 2
    })
    .await;

    timeout(Duration::from_secs(1), monitor.shutdown()).await.unwrap();
    assert_eq!(LifecycleCounters::get(&counters.finished), 2);
    assert_eq!(ctx.inflight().in_flight(), 0);
}

#[tokio::test]
async fn unknown_watcher_name_starts_nothing() {
    let counters = Arc::new(LifecycleCounters::default());
    let (ctx, _) = memory_context(1, watchers_config(8));
    let mut monitor = Monitor::new(recording_registry(counters.clone()), ctx.clone());

    let err = monitor.start(&names(&["recording.a", "typo"])).unwrap_err();

    assert!(matches!(err, Error::Registry(RegistryError::NotFound(_))));
    assert_eq!(ctx.inflight().in_flight(), 0);
    assert_eq!(LifecycleCounters::get(&counters.initialized), 0);
}

#[tokio::test]
async fn repeated_names_start_one_instance() {
    let counters = Arc::new(LifecycleCounters::default());
    let (ctx, _) = memory_context(1, watchers_config(8));
    let mut monitor = Monitor::new(recording_registry(counters.clone()), ctx.clone());

    assert_eq!(monitor.start(&names(&["recording.a", "recording.a"])).unwrap(), 1);
    assert_eq!(LifecycleCounters::get(&counters.created), 1);
    monitor.shutdown().await;
}

#[tokio::test]
async fn panicking_watcher_does_not_take_down_siblings() {
    let counters = Arc::new(LifecycleCounters::default());
    let (ctx, _) = memory_context(1, watchers_config(8));
    let mut monitor = Monitor::new(recording_registry(counters.clone()), ctx.clone());

    monitor.start(&names(&["panicking", "recording.a"])).unwrap();
    wait_until(Duration::from_secs(1), "panicking watcher released", || {
        ctx.inflight().in_flight() == 1
    })
    .await;
    assert_eq!(LifecycleCounters::get(&counters.finished), 0);

    timeout(Duration::from_secs(1), monitor.shutdown()).await.unwrap();
    assert_eq!(LifecycleCounters::get(&counters.finished), 1);
}

#[tokio::test]
async fn builtin_watchers_run_side_by_side() {
    let (ctx, transport) = memory_context(2, watchers_config(16));
    let mut builder = WatcherRegistry::builder();
    register_builtin_watchers(&mut builder);
    let mut monitor = Monitor::new(builder.build(), ctx.clone());

    let started = monitor
        .start(&names(&[APP_ERROR_WATCHER, LIVENESS_WATCHER]))
        .unwrap();
    assert_eq!(started, 2);

    transport.append(TEST_TOPIC, 1, "send msg error").unwrap();
    wait_until(Duration::from_secs(2), "error counted", || {
        ctx.metrics().app_errors().get() == 1
    })
    .await;

    timeout(Duration::from_secs(2), monitor.run_until(async {})).await.unwrap();
    assert_eq!(ctx.inflight().in_flight(), 0);
    for partition in 0..2 {
        assert_eq!(transport.open_stream_count(TEST_TOPIC, partition), 0);
    }
}
