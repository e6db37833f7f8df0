// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Exponential backoff for failed reconciliations and Kubernetes API calls.
//!
//! Two schedules are provided:
//!
//! - [`queue_backoff`] drives per-key redelivery in the mirror work queue. It never
//!   gives up: a key keeps being retried at the capped interval until it succeeds.
//! - [`default_backoff`] bounds in-reconciler API retries (status patches) to
//!   five minutes, after which the error is handed back to the controller.

use anyhow::{anyhow, Result};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

const MAX_ELAPSED_TIME_SECS: u64 = 300;
const INITIAL_INTERVAL_MILLIS: u64 = 100;
const MAX_INTERVAL_SECS: u64 = 30;
const BACKOFF_MULTIPLIER: f64 = 2.0;
/// ±10% jitter so keys failing together do not retry in lockstep.
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// Exponential backoff with jitter and an optional elapsed-time limit.
///
/// The interval for attempt `n` (starting at zero) is
/// `min(initial_interval * multiplier^n, max_interval)`, then jittered.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    /// `None` retries forever
    pub max_elapsed_time: Option<Duration>,
    pub multiplier: f64,
    pub randomization_factor: f64,
    attempts: u32,
    started: Instant,
}

impl ExponentialBackoff {
    fn new(
        initial_interval: Duration,
        max_interval: Duration,
        max_elapsed_time: Option<Duration>,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            initial_interval,
            max_interval,
            max_elapsed_time,
            multiplier,
            randomization_factor,
            attempts: 0,
            started: Instant::now(),
        }
    }

    /// Disable jitter, for deterministic schedules in tests.
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.randomization_factor = 0.0;
        self
    }

    /// Un-jittered interval the next call to [`next_backoff`](Self::next_backoff) is based on.
    #[must_use]
    pub fn current_interval(&self) -> Duration {
        let exponent = i32::try_from(self.attempts).unwrap_or(i32::MAX);
        let secs = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);
        if secs.is_finite() && secs < self.max_interval.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.max_interval
        }
    }

    /// Next interval to wait, or `None` once the elapsed-time limit is exceeded.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self
            .max_elapsed_time
            .is_some_and(|limit| self.started.elapsed() >= limit)
        {
            return None;
        }
        let interval = self.current_interval();
        self.attempts = self.attempts.saturating_add(1);
        Some(self.jitter(interval))
    }

    fn jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 {
            return interval;
        }
        // Uniform in [1 - factor, 1 + factor)
        let scale = 1.0 - self.randomization_factor
            + rand::random::<f64>() * 2.0 * self.randomization_factor;
        interval.mul_f64(scale.max(0.0))
    }
}

/// Backoff for bounded Kubernetes API retries.
///
/// # Configuration
///
/// - **Initial interval**: 100ms
/// - **Max interval**: 30 seconds
/// - **Max elapsed time**: 5 minutes total
/// - **Multiplier**: 2.0 (exponential growth)
/// - **Randomization**: ±10% (prevents thundering herd)
#[must_use]
pub fn default_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(MAX_INTERVAL_SECS),
        Some(Duration::from_secs(MAX_ELAPSED_TIME_SECS)),
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Backoff for work queue redelivery: same curve as [`default_backoff`], no limit.
///
/// Retries occur at approximately 100ms, 200ms, 400ms, ... 25.6s, then every 30s
/// until the key reconciles successfully.
#[must_use]
pub fn queue_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(MAX_INTERVAL_SECS),
        None,
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Retry a Kubernetes API call with exponential backoff.
///
/// Retries transient errors (HTTP 429, 5xx, transport failures) and fails
/// immediately on other client errors.
///
/// # Errors
///
/// Returns the error if it is not retryable, or once five minutes have elapsed.
pub async fn retry_api_call<T, F, Fut>(mut operation: F, operation_name: &str) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, kube::Error>>,
{
    let mut backoff = default_backoff();
    let mut attempt: u32 = 1;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = operation_name, attempt, "API call recovered after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !is_retryable_error(&err) {
            error!(operation = operation_name, error = %err, "API call failed, not retryable");
            return Err(err.into());
        }

        let Some(delay) = backoff.next_backoff() else {
            error!(operation = operation_name, attempt, error = %err, "API call retries exhausted");
            return Err(anyhow!("{operation_name} failed after {attempt} attempts: {err}"));
        };

        warn!(
            operation = operation_name,
            attempt,
            retry_after = ?delay,
            error = %err,
            "API call failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Whether a Kubernetes error is transient (429, 5xx, transport).
pub(crate) fn is_retryable_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(api_err) => {
            api_err.code == 429 || (api_err.code >= 500 && api_err.code < 600)
        }
        kube::Error::Service(_) => true,
        _ => false,
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
