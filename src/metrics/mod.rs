use std::convert::Infallible;
use std::sync::Arc;

use prometheus::Encoder;
use prometheus::IntCounter;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

use crate::constants::APP_ERROR_COUNTER;
use crate::constants::APP_ERROR_MARKERS_VERSION;
use crate::constants::LIVE_GATEWAY_GAUGE;
use crate::Error;
use crate::Result;


/// Metrics published by the built-in watchers.
///
/// Each daemon run owns one instance and one [`Registry`]; watchers reach it
/// through the execution context.
pub struct WatcherMetrics {
    registry: Registry,
    app_errors: IntCounter,
    live_gateways: IntGauge,
}

impl WatcherMetrics {
    pub fn new() -> Result<Self> {
        Self::with_registry(Registry::new())
    }

    pub fn with_registry(registry: Registry) -> Result<Self> {
        // marker list changes start a new series
        let app_errors = IntCounter::with_opts(
            Opts::new(
                APP_ERROR_COUNTER,
                "Application pub/sub errors found in the client log topic",
            )
            .const_label("markers_version", APP_ERROR_MARKERS_VERSION.to_string()),
        )?;
        let live_gateways = IntGauge::with_opts(Opts::new(
            LIVE_GATEWAY_GAUGE,
            "Gateway instances registered as live in the cluster directory",
        ))?;

        registry.register(Box::new(app_errors.clone()))?;
        registry.register(Box::new(live_gateways.clone()))?;

        Ok(Self {
            registry,
            app_errors,
            live_gateways,
        })
    }

    pub fn app_errors(&self) -> &IntCounter {
        &self.app_errors
    }

    pub fn live_gateways(&self) -> &IntGauge {
        &self.live_gateways
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> Result<String> {
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::Fatal(format!("metrics are not utf8: {}", e)))
    }
}

/// Serves `GET /metrics` until `shutdown` is cancelled.
pub async fn start_server(
    port: u16,
    metrics: Arc<WatcherMetrics>,
    shutdown: CancellationToken,
) -> Result<()> {
    let metrics_route = warp::path!("metrics")
        .and(warp::get())
        .and(with_metrics(metrics))
        .and_then(metrics_handler);

    let (addr, server) = warp::serve(metrics_route)
        .try_bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            shutdown.cancelled().await;
        })
        .map_err(|e| Error::Fatal(format!("metrics server bind on port {} failed: {}", port, e)))?;

    info!("metrics server listening on {}", addr);
    server.await;
    info!("metrics server stopped");
    Ok(())
}

fn with_metrics(
    metrics: Arc<WatcherMetrics>
) -> impl Filter<Extract = (Arc<WatcherMetrics>,), Error = Infallible> + Clone {
    warp::any().map(move || metrics.clone())
}

async fn metrics_handler(
    metrics: Arc<WatcherMetrics>
) -> std::result::Result<impl Reply, Rejection> {
    let body = match metrics.render() {
        Ok(body) => body,
        Err(e) => {
            error!("could not encode metrics: {}", e);
            String::default()
        }
    };
    Ok(body)
}
