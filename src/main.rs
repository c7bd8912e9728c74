use std::sync::Arc;

use kguard::builtin_registry;
use kguard::start_server;
use kguard::ExecutionContext;
use kguard::LogConfig;
use kguard::MemoryTransport;
use kguard::Monitor;
use kguard::Result;
use kguard::Settings;
use kguard::StaticDirectory;
use kguard::WatcherMetrics;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let settings = Settings::new()?.validate()?;

    // Initializing Logs
    let _guard = init_observability(&settings.log)?;
    info!("{:?}", settings);

    let metrics = Arc::new(WatcherMetrics::new()?);
    let directory = Arc::new(StaticDirectory::new(settings.directory.clone()));
    let transport = Arc::new(MemoryTransport::from_directory(&settings.directory));
    let ctx = ExecutionContext::new(directory, transport, settings.watchers.clone(), metrics.clone());

    let metrics_server = if settings.monitoring.prometheus_enabled {
        let port = settings.monitoring.prometheus_port;
        let shutdown = ctx.shutdown_token().clone();
        Some(tokio::spawn(async move {
            if let Err(e) = start_server(port, metrics, shutdown).await {
                error!("metrics server stops: {}", e);
            }
        }))
    } else {
        None
    };

    let mut monitor = Monitor::new(builtin_registry(), ctx);
    let started = monitor.start(&settings.watchers.enabled)?;
    info!("{} watchers started. Waiting for CTRL+C signal...", started);

    monitor.run_until(shutdown_signal()).await;

    if let Some(handle) = metrics_server {
        if let Err(e) = handle.await {
            error!("metrics server ended abnormally: {}", e);
        }
    }

    info!("Exiting program.");
    Ok(())
}

async fn shutdown_signal() {
    let (mut sigint, mut sigterm) = match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
        (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
        (Err(e), _) | (_, Err(e)) => {
            error!("unix signal handlers unavailable, falling back to Ctrl+C: {}", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Ctrl+C handler failed: {}", e);
            }
            return;
        }
    };

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }
}

/// Stdout logging, or a daily rolling file under `log_dir` when configured.
///
/// `RUST_LOG` wins over the configured level.
pub fn init_observability(log: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));

    match &log.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, "kguard.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(filter);
            tracing_subscriber::registry().with(file_layer).init();
            Ok(Some(guard))
        }
        None => {
            let stdout_layer = tracing_subscriber::fmt::layer().with_filter(filter);
            tracing_subscriber::registry().with(stdout_layer).init();
            Ok(None)
        }
    }
}
