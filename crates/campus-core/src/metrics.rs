//! Prometheus metrics for the dashboard.
//!
//! Metrics are recorded with the `metrics` facade wherever they happen
//! (upstream client, data sources, session registry, state store). Nothing is
//! exported unless a recorder is installed with [`init_metrics`] and served
//! with [`start_metrics_server`]; without one the macros are no-ops.
//!
//! # Naming
//!
//! - Prefix: area (`upstream_`, `datasource_`, `sessions_`, `store_`)
//! - Suffix: `_total` for counters
//! - Labels: low cardinality only (`strategy`, `outcome`, `endpoint`, `op`)

use std::net::SocketAddr;

use axum::{Router, routing::get};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and register metric descriptions.
///
/// Fails if a recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(handle)
}

/// Like [`init_metrics`] but returns `None` if a recorder is already
/// installed. Useful in tests.
pub fn try_init_metrics() -> Option<PrometheusHandle> {
    init_metrics().ok()
}

/// Serve `/metrics` on `port` in a background task.
///
/// The listener is bound before returning so a taken port is reported to the
/// caller.
pub async fn start_metrics_server(port: u16, handle: PrometheusHandle) -> std::io::Result<()> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on http://{}/metrics", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "metrics server stopped");
        }
    });

    Ok(())
}

fn register_metrics() {
    // =========================================================================
    // Upstream API
    // =========================================================================

    describe_counter!(
        "upstream_requests_total",
        "Requests to the demo API (labels: endpoint, outcome)"
    );

    // =========================================================================
    // Data sources
    // =========================================================================

    describe_counter!(
        "datasource_loads_total",
        "Data loads served to views (label: strategy)"
    );
    describe_counter!(
        "datasource_revalidations_total",
        "Background refreshes of built data (label: outcome)"
    );
    describe_counter!(
        "datasource_fallback_fetches_total",
        "Pages fetched on demand because they were not pre-built"
    );
    describe_counter!(
        "datasource_discarded_total",
        "Post-render results discarded because the caller was gone"
    );

    // =========================================================================
    // Sessions
    // =========================================================================

    describe_counter!("sessions_mounted_total", "State stores mounted");
    describe_gauge!("sessions_active", "Currently mounted state stores");
    describe_counter!(
        "store_mutations_total",
        "State store mutations (label: op)"
    );
}
