// -
// Watcher names

/// Registry name of the application error log watcher
pub const APP_ERROR_WATCHER: &str = "kateway.apperr";
/// Registry name of the gateway liveness watcher
pub const LIVENESS_WATCHER: &str = "kateway.engine";

// -
// Metric keys

pub const APP_ERROR_COUNTER: &str = "kateway_apperr";
pub const LIVE_GATEWAY_GAUGE: &str = "kateway_live";

// -
// Application error markers

/// Error signatures emitted by the Java pub/sub client library.
///
/// A payload is an application error if it contains any of these markers.
/// Bump [`APP_ERROR_MARKERS_VERSION`] whenever the list changes. It is
/// exported as the `markers_version` label of `kateway_apperr`, so dashboards
/// can tell counter regimes apart.
pub const APP_ERROR_MARKERS: &[&[u8]] = &[b"send msg error", b"StatusLine is null"];
pub const APP_ERROR_MARKERS_VERSION: u32 = 1;

/// Upper bound of payload bytes echoed into a warning log line
pub(crate) const MAX_PAYLOAD_PREVIEW_BYTES: usize = 512;
