// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the ExternalDNS operator.
//!
//! All metrics carry the `external_dns_operator_` prefix and live in a registry owned
//! by [`Metrics`]. The struct is cheap to clone (every collector is reference
//! counted) and is handed to components through the controller context.
//!
//! # Metrics
//!
//! - `reconciliations_total{kind,outcome}` - Completed reconciliations
//! - `reconciliation_duration_seconds{kind}` - Time spent per reconciliation
//! - `errors_total{kind,error_type}` - Failed reconciliations by category
//! - `requeues_total{kind,reason}` - Requeues scheduled by controllers
//! - `queue_depth{kind}` - Keys waiting for a mirror worker
//!
//! # Example
//!
//! ```rust
//! use external_dns_operator::metrics::Metrics;
//! use std::time::Duration;
//!
//! let metrics = Metrics::new().unwrap();
//! metrics.record_reconciliation("ConfigMap", "created", Duration::from_millis(12));
//!
//! let text = metrics.gather().unwrap();
//! assert!(text.contains("external_dns_operator_reconciliations_total"));
//! ```

use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Namespace prefix for all operator metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "external_dns_operator";

/// Operator metrics and the registry they are exported from.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    reconciliations: CounterVec,
    duration: HistogramVec,
    errors: CounterVec,
    requeues: CounterVec,
    queue_depth: IntGaugeVec,
}

impl Metrics {
    /// Create and register every collector in a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a collector is rejected by the registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let reconciliations = CounterVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_reconciliations_total"),
                "Total number of reconciliations by kind and outcome",
            ),
            &["kind", "outcome"],
        )?;
        let duration = HistogramVec::new(
            HistogramOpts::new(
                format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
                "Duration of reconciliations in seconds by kind",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
            &["kind"],
        )?;
        let errors = CounterVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_errors_total"),
                "Total number of failed reconciliations by kind and error type",
            ),
            &["kind", "error_type"],
        )?;
        let requeues = CounterVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_requeues_total"),
                "Total number of requeue operations by kind and reason",
            ),
            &["kind", "reason"],
        )?;
        let queue_depth = IntGaugeVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_queue_depth"),
                "Keys waiting for a mirror worker by kind",
            ),
            &["kind"],
        )?;

        registry.register(Box::new(reconciliations.clone()))?;
        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(errors.clone()))?;
        registry.register(Box::new(requeues.clone()))?;
        registry.register(Box::new(queue_depth.clone()))?;

        Ok(Self {
            registry,
            reconciliations,
            duration,
            errors,
            requeues,
            queue_depth,
        })
    }

    /// Record a successful reconciliation and its duration.
    pub fn record_reconciliation(&self, kind: &str, outcome: &str, duration: Duration) {
        self.reconciliations
            .with_label_values(&[kind, outcome])
            .inc();
        self.duration
            .with_label_values(&[kind])
            .observe(duration.as_secs_f64());
    }

    /// Record a failed reconciliation, its error category and duration.
    pub fn record_error(&self, kind: &str, error_type: &str, duration: Duration) {
        self.reconciliations
            .with_label_values(&[kind, "error"])
            .inc();
        self.errors.with_label_values(&[kind, error_type]).inc();
        self.duration
            .with_label_values(&[kind])
            .observe(duration.as_secs_f64());
    }

    /// Record a requeue scheduled by a controller.
    pub fn record_requeue(&self, kind: &str, reason: &str) {
        self.requeues.with_label_values(&[kind, reason]).inc();
    }

    /// Gauge tracking the mirror queue depth for `kind`.
    #[must_use]
    pub fn queue_depth(&self, kind: &str) -> IntGauge {
        self.queue_depth.with_label_values(&[kind])
    }

    /// Gather and encode all metrics in Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
    }
}
