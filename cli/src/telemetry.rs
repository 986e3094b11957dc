// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Logging and metrics setup

use anyhow::{Context, Result};
use clap::ValueEnum;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

use conclave_core::domain::config::ObservabilityConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Initialize tracing subscriber for logging. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Text => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }

    Ok(())
}

/// Expose Prometheus metrics when the manifest enables them.
///
/// Returns the scrape address, or `None` when metrics are off.
pub fn install_metrics_exporter(
    observability: Option<&ObservabilityConfig>,
    bind_address: &str,
) -> Result<Option<SocketAddr>> {
    let Some(metrics) = observability.and_then(|o| o.metrics.as_ref()) else {
        return Ok(None);
    };
    if !metrics.enabled {
        return Ok(None);
    }

    let addr: SocketAddr = format!("{}:{}", bind_address, metrics.port)
        .parse()
        .with_context(|| format!("Invalid metrics address {}:{}", bind_address, metrics.port))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    describe_metrics();
    info!("Prometheus metrics listening on http://{}/metrics", addr);
    Ok(Some(addr))
}

fn describe_metrics() {
    metrics::describe_counter!("conclave_cycles_total", "Research cycles started");
    metrics::describe_counter!("conclave_tool_calls_total", "Architect tool calls dispatched, by tool");
    metrics::describe_counter!("conclave_tool_failures_total", "Architect tool calls that failed, by tool");
    metrics::describe_gauge!("conclave_knowledge_nodes", "Nodes in the knowledge graph");
    metrics::describe_gauge!("conclave_stagnation_counter", "Consecutive stagnant cycles");
}
