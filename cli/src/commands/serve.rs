// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP control server
//!
//! Serves the mission API and SSE event stream. The mission starts Idle; a
//! client drives it through `/v1/mission/start` or `/v1/mission/resume`.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use conclave_core::application::mission_factory::build_scheduler;
use conclave_core::domain::config::MissionConfigManifest;
use conclave_core::infrastructure::event_bus::EventBus;
use conclave_core::presentation::api;

use crate::telemetry::install_metrics_exporter;

pub async fn serve(config_path: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let manifest = MissionConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    manifest.validate().context("Configuration validation failed")?;

    let network = &manifest.spec.network;
    let host = host.unwrap_or_else(|| network.bind_address.clone());
    let port = port.unwrap_or(network.port);

    install_metrics_exporter(manifest.spec.observability.as_ref(), &host)?;

    let scheduler = build_scheduler(&manifest, EventBus::with_default_capacity())?;
    let app = api::app(scheduler.clone());

    let addr = format!("{}:{}", host, port);
    info!("Conclave control server listening on {}", addr);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    if scheduler.stop().await {
        info!("Mission stopped on shutdown");
    }
    info!("Control server shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
