// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for `ExternalDNS` resources.
//!
//! Conditions follow the standard Kubernetes format:
//! - `type`: The aspect being reported (`Available`, `Degraded`)
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the status last flipped
//!
//! # Example
//!
//! ```rust
//! use external_dns_operator::reconcilers::status::create_condition;
//!
//! let condition = create_condition(
//!     "Available",
//!     "True",
//!     "OperandReady",
//!     "ExternalDNS deployment is configured"
//! );
//! assert_eq!(condition.r#type, "Available");
//! ```

use super::retry::retry_api_call;
use crate::crd::{Condition, ExternalDNS, ExternalDNSStatus};
use anyhow::Result;
use chrono::Utc;
use kube::api::Patch;
use kube::{api::PatchParams, Api, Client, ResourceExt};
use serde_json::json;
use tracing::debug;

/// Condition type reporting that the operand is configured.
pub const CONDITION_AVAILABLE: &str = "Available";

/// Condition type reporting that the last reconciliation failed.
pub const CONDITION_DEGRADED: &str = "Degraded";

/// Create a new Kubernetes condition with the current timestamp.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in a mutable conditions list (in-memory, no API call).
///
/// The `lastTransitionTime` is preserved when the status value does not change.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

/// Compare two condition lists ignoring `lastTransitionTime`.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    new.iter().all(|new_cond| {
        current.iter().any(|curr_cond| {
            curr_cond.r#type == new_cond.r#type
                && curr_cond.status == new_cond.status
                && curr_cond.reason == new_cond.reason
                && curr_cond.message == new_cond.message
        })
    })
}

/// Collects status changes for one `ExternalDNS` during a reconciliation and writes
/// them in a single API call, only when something semantically changed.
///
/// Skipping no-op writes keeps the controller from reacting to its own status
/// updates in a tight loop.
pub struct ExternalDNSStatusUpdater {
    name: String,
    current_status: Option<ExternalDNSStatus>,
    new_status: ExternalDNSStatus,
}

impl ExternalDNSStatusUpdater {
    #[must_use]
    pub fn new(extdns: &ExternalDNS) -> Self {
        let current_status = extdns.status.clone();
        let new_status = current_status.clone().unwrap_or_default();

        Self {
            name: extdns.name_any(),
            current_status,
            new_status,
        }
    }

    /// Update or add a condition (in-memory only, no API call).
    pub fn set_condition(
        &mut self,
        condition_type: &str,
        status: &str,
        reason: &str,
        message: &str,
    ) {
        update_condition_in_memory(
            &mut self.new_status.conditions,
            condition_type,
            status,
            reason,
            message,
        );
    }

    /// Mark the operand available and clear any previous degradation.
    pub fn set_available(&mut self, message: &str) {
        self.set_condition(CONDITION_AVAILABLE, "True", "OperandReady", message);
        self.set_condition(CONDITION_DEGRADED, "False", "ReconcileSucceeded", "");
    }

    /// Mark the resource degraded with `reason`.
    pub fn set_degraded(&mut self, reason: &str, message: &str) {
        self.set_condition(CONDITION_AVAILABLE, "False", reason, message);
        self.set_condition(CONDITION_DEGRADED, "True", reason, message);
    }

    pub fn set_observed_generation(&mut self, generation: Option<i64>) {
        self.new_status.observed_generation = generation;
    }

    /// Record the zones the operand was configured with.
    pub fn set_zones(&mut self, zones: &[String]) {
        zones.clone_into(&mut self.new_status.zones);
    }

    /// Whether the collected status differs from the one last written.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        match &self.current_status {
            None => true,
            Some(current) => {
                current.observed_generation != self.new_status.observed_generation
                    || current.zones != self.new_status.zones
                    || !conditions_equal(&current.conditions, &self.new_status.conditions)
            }
        }
    }

    #[must_use]
    pub fn status(&self) -> &ExternalDNSStatus {
        &self.new_status
    }

    /// Write the collected status if it changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the Kubernetes API call fails.
    pub async fn apply(&self, client: &Client) -> Result<()> {
        if !self.has_changes() {
            debug!("ExternalDNS {} status unchanged, skipping update", self.name);
            return Ok(());
        }

        let api: Api<ExternalDNS> = Api::all(client.clone());
        let body = json!({ "status": self.new_status });
        let patch = Patch::Merge(&body);
        let params = PatchParams::default();

        retry_api_call(
            || api.patch_status(&self.name, &params, &patch),
            "patch ExternalDNS status",
        )
        .await?;

        debug!(
            "Updated ExternalDNS {} status: {} condition(s)",
            self.name,
            self.new_status.conditions.len()
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
