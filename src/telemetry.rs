use metrics::{describe_counter, Unit};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "metrics-exporter")]
use metrics_exporter_prometheus::PrometheusBuilder;

/// Diagnostics go to stderr so stdout carries only the priced records.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn describe_metrics() {
    describe_counter!("pricer_events_total", Unit::Count, "Feed events applied to the book");
    describe_counter!("pricer_events_rejected_total", Unit::Count, "Feed records skipped, by error kind");
    describe_counter!("pricer_emissions_total", Unit::Count, "Quote changes written, by side");
}

#[cfg(feature = "metrics-exporter")]
pub fn init_metrics() -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], 9000))
        .install()?;
    describe_metrics();

    tracing::info!("Prometheus exporter listening on http://0.0.0.0:9000/metrics");
    metrics::gauge!("pricer_up").set(1.0);
    Ok(())
}

#[cfg(not(feature = "metrics-exporter"))]
pub fn init_metrics() -> anyhow::Result<()> {
    // No recorder installed; the counters are no-ops
    describe_metrics();
    Ok(())
}
