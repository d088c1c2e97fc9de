use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes the tracing pipeline for a service binary.
///
/// Configuration is driven by environment variables:
/// - `RUST_LOG` filters events (default `info`)
/// - `LOG_FORMAT=json` switches to newline-delimited JSON for log shippers
pub fn init_telemetry(service_name: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = Registry::default().with(env_filter);

    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        let fmt_layer = tracing_subscriber::fmt::layer().json().flatten_event(true);
        registry.with(fmt_layer).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::debug!(service = service_name, "telemetry initialized");
}
