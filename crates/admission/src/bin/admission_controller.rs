/*
 * 5D Labs Agent Platform - Admission Controller Service
 * Copyright (C) 2025 5D Labs
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

//! Admission Controller Service
//!
//! Answers "can a new workflow start now?" from live cluster state and runs
//! workflow stop requests on a background worker pool.

use std::sync::Arc;
use std::time::Duration;

use admission::{
    server::{self, AppState},
    AdmissionConfig, CancellationCoordinator, CancellationQueue, ConditionRegistry,
    HttpJobControllerClient, KubeClusterProbe, KubeTaskScheduler, ReadinessEvaluator,
};
use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Workflow admission gate and cancellation service
#[derive(Parser)]
#[command(name = "admission-controller")]
#[command(version)]
struct Cli {
    /// Path to the mounted configuration file
    #[arg(long, env = "ADMISSION_CONFIG_PATH", default_value = "/config/config.yaml")]
    config: String,

    /// Address to serve HTTP on (overrides server.bindAddress)
    #[arg(long, env = "ADMISSION_BIND_ADDRESS")]
    bind: Option<String>,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,admission=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    info!(
        "Starting Admission Controller Service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = AdmissionConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;
    config.validate().context("Invalid admission configuration")?;

    let client = kube::Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let probe = Arc::new(KubeClusterProbe::new(client.clone()));
    let registry = ConditionRegistry::with_builtins(probe, &config.capacity)?;
    let evaluator = Arc::new(ReadinessEvaluator::new(
        &config.readiness.condition_groups,
        &registry,
    )?);
    let groups: Vec<&str> = evaluator.group_names().collect();
    info!(groups = ?groups, "Readiness conditions resolved");

    let coordinator = Arc::new(CancellationCoordinator::new(
        Arc::new(KubeTaskScheduler::new(client, &config.scheduler)),
        Arc::new(HttpJobControllerClient::new(&config.job_controller)?),
    ));
    let (cancellations, workers) = CancellationQueue::start(coordinator, &config.cancellation);

    let app = server::router(
        AppState {
            evaluator,
            cancellations,
        },
        Duration::from_secs(config.server.request_timeout_seconds),
    );

    let bind = cli.bind.unwrap_or(config.server.bind_address);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!("Admission controller listening on {}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    workers.shutdown().await;
    info!("Admission controller stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
