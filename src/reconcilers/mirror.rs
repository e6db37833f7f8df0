// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Mirror reconciliation: observe → diff → converge for one source key.
//!
//! Every invocation re-reads both objects from the store; nothing observed in an
//! earlier cycle is trusted. The outcome is one of:
//!
//! | Source | Target            | Writes  | Outcome        |
//! |--------|-------------------|---------|----------------|
//! | absent | any               | none    | `SourceAbsent` |
//! | P      | absent            | create  | `Created`      |
//! | P      | payload == D(P)   | none    | `Unchanged`    |
//! | P      | payload != D(P)   | update  | `Updated`      |
//!
//! The target is never deleted here, even when the source is gone.
//!
//! # Example
//!
//! ```rust
//! use external_dns_operator::mirror::{MirrorKind, MirrorSpec, ObjectKey};
//! use external_dns_operator::mirror::derive::Projection;
//! use external_dns_operator::reconcilers::mirror::{reconcile_mirror, ReconcileOutcome};
//! use external_dns_operator::store::memory::MemoryStore;
//! use k8s_openapi::api::core::v1::ConfigMap;
//!
//! # async fn example() -> Result<(), external_dns_operator::errors::MirrorError> {
//! let store: MemoryStore<ConfigMap> = MemoryStore::new();
//! let mirror = MirrorSpec {
//!     kind: MirrorKind::ConfigMap,
//!     source: ObjectKey::new("external-dns-operator", "trusted-ca"),
//!     target: ObjectKey::new("external-dns", "external-dns-trusted-ca-bundle"),
//!     projection: Projection::identity(),
//!     owner: None,
//! };
//!
//! // No source yet: nothing to do, and not an error.
//! let outcome = reconcile_mirror(&store, &mirror).await?;
//! assert_eq!(outcome, ReconcileOutcome::SourceAbsent);
//! # Ok(())
//! # }
//! ```

use crate::errors::MirrorError;
use crate::metrics::Metrics;
use crate::mirror::derive::desired_target;
use crate::mirror::resource::MirrorResource;
use crate::mirror::MirrorSpec;
use crate::store::ObjectStore;
use std::time::Instant;
use tracing::{debug, info};

/// Result of a successful mirror reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Source does not exist; nothing was read beyond it and nothing was written.
    SourceAbsent,
    /// Target did not exist and was created.
    Created,
    /// Target payload differed and was replaced.
    Updated,
    /// Target payload already matched; nothing was written.
    Unchanged,
}

impl ReconcileOutcome {
    /// Label used for the `reconciliations_total` metric.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::SourceAbsent => "source_absent",
            ReconcileOutcome::Created => "created",
            ReconcileOutcome::Updated => "updated",
            ReconcileOutcome::Unchanged => "unchanged",
        }
    }

    /// Whether the reconciliation wrote to the store.
    #[must_use]
    pub fn wrote(&self) -> bool {
        matches!(self, ReconcileOutcome::Created | ReconcileOutcome::Updated)
    }
}

/// Converge the target of `mirror` onto the projection of its source.
///
/// Issues at most one write: a create if the target is missing, or an update if its
/// payload differs. When updating, only the payload of the live target is replaced;
/// labels, annotations, owner references and the `resourceVersion` read in this cycle
/// are kept, so a concurrent writer surfaces as a conflict and is resolved by the next
/// cycle.
///
/// # Errors
///
/// Returns [`MirrorError::Store`] if any store call fails, and
/// [`MirrorError::Derivation`] if the source payload does not satisfy the projection.
/// Both are retryable; this function never retries on its own.
pub async fn reconcile_mirror<K, S>(
    store: &S,
    mirror: &MirrorSpec,
) -> Result<ReconcileOutcome, MirrorError>
where
    K: MirrorResource,
    S: ObjectStore<K> + ?Sized,
{
    debug_assert_eq!(
        mirror.kind,
        K::MIRROR_KIND,
        "mirror {} reconciled as the wrong resource kind",
        mirror.source
    );
    let kind = K::MIRROR_KIND.as_str();

    let Some(source) = store.get(&mirror.source).await? else {
        debug!(
            kind,
            source = %mirror.source,
            "Mirror source not found, nothing to do"
        );
        return Ok(ReconcileOutcome::SourceAbsent);
    };

    let desired: K = desired_target(&source, mirror)?;

    match store.get(&mirror.target).await? {
        None => {
            store.create(&desired).await?;
            info!(
                "Created {} {} from {}",
                kind, mirror.target, mirror.source
            );
            Ok(ReconcileOutcome::Created)
        }
        Some(current) if current.payload_eq(&desired) => {
            debug!(
                kind,
                target = %mirror.target,
                "Mirror target already up to date"
            );
            Ok(ReconcileOutcome::Unchanged)
        }
        Some(mut current) => {
            current.set_payload(desired.payload());
            store.update(&current).await?;
            info!(
                "Updated {} {} from {}",
                kind, mirror.target, mirror.source
            );
            Ok(ReconcileOutcome::Updated)
        }
    }
}

/// [`reconcile_mirror`], recording the outcome and duration under the kind of `K`.
///
/// # Errors
///
/// Returns whatever [`reconcile_mirror`] returns, after counting it in `errors_total`.
pub async fn reconcile_mirror_recorded<K, S>(
    store: &S,
    mirror: &MirrorSpec,
    metrics: &Metrics,
) -> Result<ReconcileOutcome, MirrorError>
where
    K: MirrorResource,
    S: ObjectStore<K> + ?Sized,
{
    let kind = K::MIRROR_KIND.as_str();
    let start = Instant::now();
    match reconcile_mirror::<K, S>(store, mirror).await {
        Ok(outcome) => {
            metrics.record_reconciliation(kind, outcome.as_str(), start.elapsed());
            Ok(outcome)
        }
        Err(e) => {
            metrics.record_error(kind, e.error_type(), start.elapsed());
            Err(e)
        }
    }
}

#[cfg(test)]
#[path = "mirror_tests.rs"]
mod mirror_tests;
