// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all controllers.
//!
//! Every controller receives an `Arc<Context>` holding:
//! - Kubernetes client
//! - Validated operator configuration
//! - Static mirror registry built from that configuration
//! - Metrics registry
//! - Readiness state served on `/readyz`
//!
//! Nothing here is global; tests and multiple operator instances in one process each
//! build their own.

use crate::config::OperatorConfig;
use crate::health::HealthState;
use crate::metrics::Metrics;
use crate::mirror::MirrorRegistry;
use anyhow::{Context as _, Result};
use kube::Client;
use std::sync::Arc;

/// Shared context passed to all controllers.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Operator configuration, validated at construction
    pub config: Arc<OperatorConfig>,

    /// Statically configured mirrors (trusted CA bundle)
    pub registry: Arc<MirrorRegistry>,

    /// Metrics registry for observability
    pub metrics: Metrics,

    /// Flipped to ready once the controllers' caches have synced
    pub health: Arc<HealthState>,
}

impl Context {
    /// Validate `config` and derive everything the controllers share.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or metrics cannot be registered.
    pub fn new(client: Client, config: OperatorConfig) -> Result<Self> {
        config.validate().context("invalid operator configuration")?;
        let registry = config
            .mirror_registry()
            .context("invalid mirror configuration")?;
        let metrics = Metrics::new().context("failed to register metrics")?;

        Ok(Self {
            client,
            config: Arc::new(config),
            registry: Arc::new(registry),
            metrics,
            health: Arc::new(HealthState::new()),
        })
    }
}
