// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation logic.
//!
//! # Reconciliation Architecture
//!
//! Every reconciler follows the standard controller pattern:
//!
//! 1. **Observe** - Read the current state from the API server
//! 2. **Derive** - Compute the desired state from the source of truth
//! 3. **Converge** - Issue the minimal writes closing the gap
//! 4. **Report** - Record the outcome (metrics, status conditions)
//!
//! # Available Reconcilers
//!
//! - [`reconcile_mirror`] - Copies one mirror source into its target
//! - [`reconcile_externaldns`] - Mirrors credentials and applies the ExternalDNS operand

pub mod externaldns;
pub mod mirror;
pub mod resources;
pub mod retry;
pub mod status;

pub use externaldns::reconcile_externaldns;
pub use mirror::{reconcile_mirror, reconcile_mirror_recorded, ReconcileOutcome};
