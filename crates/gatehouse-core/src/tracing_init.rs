//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set and parseable; otherwise `default_filter` is
/// used (e.g. `"gatehouse_server=info,tower_http=info"`). With `log_json`
/// every event is one flattened JSON object per line.
///
/// Calling this twice is harmless: the second call leaves the first
/// subscriber in place.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let json_layer = log_json.then(|| fmt::layer().json().flatten_event(true));
    let text_layer = (!log_json).then(fmt::layer);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init();
}
