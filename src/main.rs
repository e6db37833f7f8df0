// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use external_dns_operator::{
    config::OperatorConfig,
    constants::TOKIO_WORKER_THREADS,
    context::Context,
    controller::{run_externaldns_controller, run_mirror_controller},
    health::{run_health_server, run_metrics_server},
};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::Client;
use std::sync::Arc;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    // Parse before the runtime starts so `--help` and bad flags exit immediately
    let config = OperatorConfig::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("external-dns-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

/// Initialize logging.
///
/// Respects `RUST_LOG` (default `info`) and `RUST_LOG_FORMAT` (`json` or text).
fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(config: OperatorConfig) -> Result<()> {
    init_logging();

    info!("Starting ExternalDNS Operator");
    debug!(
        operator_namespace = %config.operator_namespace,
        operand_namespace = %config.operand_namespace,
        trusted_ca = ?config.trusted_ca_configmap,
        workers = config.workers,
        queue_capacity = config.queue_capacity,
        "Operator configuration"
    );

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let metrics_addr = config.metrics_bind_address;
    let health_addr = config.health_bind_address;
    let ctx = Arc::new(Context::new(client, config)?);

    // Readiness flips once the ExternalDNS cache has synced
    info!("Starting all controllers");

    // Controllers should never exit - if one does, log it and exit the main process
    tokio::select! {
        result = run_metrics_server(ctx.metrics.clone(), metrics_addr) => {
            error!("CRITICAL: Metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
        result = run_health_server(ctx.health.clone(), health_addr) => {
            error!("CRITICAL: Health server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Health server exited unexpectedly without error")
        }
        result = run_mirror_controller::<ConfigMap>(ctx.clone()) => {
            error!("CRITICAL: ConfigMap mirror controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("ConfigMap mirror controller exited unexpectedly without error")
        }
        result = run_externaldns_controller(ctx.clone()) => {
            error!("CRITICAL: ExternalDNS controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("ExternalDNS controller exited unexpectedly without error")
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, stopping");
            Ok(())
        }
    }
}
