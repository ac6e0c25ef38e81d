// Telemetry module for structured logging and metrics

use anyhow::Result;
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize structured logging with JSON formatting
///
/// Log levels come from `RUST_LOG` when set, falling back to the configured
/// level.
pub fn init_logging(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {}", e))?;

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_target(true)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    tracing::info!(
        log_level = log_level,
        "Structured logging initialized with JSON formatting"
    );

    Ok(())
}

/// Initialize the Prometheus metrics exporter and register all metrics:
/// - triggers_fired_total: Counter for published trigger fires
/// - triggers_rejected_total: Counter for configurations rejected at registration
pub fn init_metrics(metrics_port: u16) -> Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", metrics_port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid metrics port: {}", e))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    describe_counter!(
        "triggers_fired_total",
        "Total number of trigger fire events published"
    );
    describe_counter!(
        "triggers_rejected_total",
        "Total number of trigger configurations rejected at registration"
    );

    tracing::info!(
        metrics_port = metrics_port,
        "Prometheus metrics exporter initialized"
    );

    Ok(())
}

/// Record a published trigger fire
#[inline]
pub fn record_trigger_fired(trigger_id: &str, channel: &str) {
    counter!(
        "triggers_fired_total",
        "trigger_id" => trigger_id.to_string(),
        "channel" => channel.to_string()
    )
    .increment(1);
}

/// Record a trigger configuration rejected at registration time
#[inline]
pub fn record_trigger_rejected(reason: &str) {
    counter!("triggers_rejected_total", "reason" => reason.to_string()).increment(1);
}
