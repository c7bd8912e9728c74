use std::time::Duration;

use kguard::builtin_registry;
use kguard::constants::APP_ERROR_WATCHER;
use kguard::constants::LIVENESS_WATCHER;
use kguard::Error;
use kguard::Monitor;
use kguard::RegistryError;
use tokio::time::timeout;

use crate::common::build_daemon;
use crate::common::wait_until;
use crate::common::watchers_config;
use crate::common::PARTITIONS;
use crate::common::TOPIC;

fn all_watchers() -> Vec<String> {
    vec![APP_ERROR_WATCHER.to_string(), LIVENESS_WATCHER.to_string()]
}

#[tokio::test]
async fn daemon_publishes_both_metrics_and_stops_cleanly() {
    let daemon = build_daemon(watchers_config(20), &["gw-1"]);
    let ctx = daemon.ctx.clone();
    let mut monitor = Monitor::new(builtin_registry(), daemon.ctx.clone());
    assert_eq!(monitor.start(&all_watchers()).unwrap(), 2);

    wait_until(Duration::from_secs(2), "every partition subscribed", || {
        (0..PARTITIONS).all(|p| daemon.transport.open_stream_count(TOPIC, p) == 1)
    })
    .await;

    daemon.transport.append(TOPIC, 0, "user 42 logged in").unwrap();
    daemon
        .transport
        .append(TOPIC, 1, "ERROR send msg error: broker timeout")
        .unwrap();
    daemon
        .transport
        .append(TOPIC, 2, "java.io.IOException: StatusLine is null")
        .unwrap();
    daemon.transport.append(TOPIC, 2, "heartbeat ok").unwrap();

    wait_until(Duration::from_secs(2), "errors counted", || {
        ctx.metrics().app_errors().get() == 2
    })
    .await;

    daemon
        .directory
        .set_live_gateways(vec!["gw-1".into(), "gw-2".into(), "gw-3".into()]);
    wait_until(Duration::from_secs(2), "gateway gauge refreshed", || {
        ctx.metrics().live_gateways().get() == 3
    })
    .await;

    let exposition = ctx.metrics().render().unwrap();
    assert!(exposition.contains("kateway_apperr{markers_version=\"1\"} 2"));
    assert!(exposition.contains("kateway_live 3"));

    timeout(Duration::from_secs(2), monitor.shutdown())
        .await
        .expect("shutdown should complete");
    assert_eq!(ctx.inflight().in_flight(), 0);
    for partition in 0..PARTITIONS {
        assert_eq!(daemon.transport.open_stream_count(TOPIC, partition), 0);
    }
}

#[tokio::test]
async fn unknown_watcher_aborts_startup() {
    let daemon = build_daemon(watchers_config(20), &[]);
    let mut monitor = Monitor::new(builtin_registry(), daemon.ctx.clone());

    let names = vec![APP_ERROR_WATCHER.to_string(), "kateway.unknown".to_string()];
    let err = monitor.start(&names).unwrap_err();

    assert!(matches!(err, Error::Registry(RegistryError::NotFound(name)) if name == "kateway.unknown"));
    assert_eq!(daemon.ctx.inflight().in_flight(), 0);
    assert_eq!(daemon.transport.connection_count(), 0);
}

#[tokio::test]
async fn misconfigured_error_watcher_leaves_liveness_running() {
    let mut settings = watchers_config(20);
    settings.apperr.cluster = None;
    let daemon = build_daemon(settings, &["gw-1", "gw-2"]);
    let ctx = daemon.ctx.clone();
    let mut monitor = Monitor::new(builtin_registry(), daemon.ctx.clone());
    monitor.start(&all_watchers()).unwrap();

    wait_until(Duration::from_secs(2), "error watcher disabled itself", || {
        ctx.inflight().in_flight() == 1
    })
    .await;
    assert_eq!(daemon.transport.connection_count(), 0);

    daemon.directory.set_live_gateways(vec!["gw-1".into()]);
    wait_until(Duration::from_secs(2), "gauge follows directory", || {
        ctx.metrics().live_gateways().get() == 1
    })
    .await;

    timeout(Duration::from_secs(2), monitor.shutdown())
        .await
        .expect("shutdown should complete");
}
