// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the mirror engine and operator configuration.
//!
//! This module provides specialized error types for:
//! - Object store operations (get/create/update against the Kubernetes API)
//! - Desired-state derivation from a malformed source payload
//! - Mirror reconciliation (the union of the two above)
//! - Static mirror configuration and `ExternalDNS` spec validation
//!
//! Every [`MirrorError`] is retryable: the work queue re-delivers the key with
//! backoff and never enters a terminal "give up" state.

use crate::mirror::ObjectKey;
use thiserror::Error;

/// Object store operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Get,
    Create,
    Update,
}

impl std::fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            StoreOperation::Get => "get",
            StoreOperation::Create => "create",
            StoreOperation::Update => "update",
        };
        f.write_str(op)
    }
}

/// Errors returned by an [`ObjectStore`](crate::store::ObjectStore).
///
/// "Not found" on `get` is not an error: stores return `Ok(None)` instead.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The Kubernetes API rejected or failed the request (network, timeout, conflict, 5xx).
    #[error("failed to {operation} {kind} {key}: {source}")]
    Api {
        operation: StoreOperation,
        kind: &'static str,
        key: ObjectKey,
        #[source]
        source: kube::Error,
    },

    /// The store could not serve the request for a non-API reason.
    #[error("failed to {operation} {kind} {key}: {reason}")]
    Unavailable {
        operation: StoreOperation,
        kind: &'static str,
        key: ObjectKey,
        reason: String,
    },

    /// An update targeted an object that no longer exists.
    #[error("cannot update {kind} {key}: object does not exist")]
    NotFound { kind: &'static str, key: ObjectKey },

    /// The object handed to the store carries no name or namespace.
    #[error("{kind} is missing metadata.name or metadata.namespace")]
    MissingName { kind: &'static str },
}

/// Errors produced while deriving a target payload from a source payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DerivationError {
    /// The source payload lacks a key the projection requires.
    #[error("source {source_key} is missing required key '{key}'")]
    MissingKey { source_key: ObjectKey, key: String },

    /// None of the projection's alternative key sets is complete.
    #[error("source {source_key} has none of the key sets {alternatives}")]
    NoAlternative {
        source_key: ObjectKey,
        alternatives: String,
    },
}

/// Errors surfaced by a single mirror reconciliation.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Derivation(#[from] DerivationError),
}

impl MirrorError {
    /// Category label used for the `errors_total` metric.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            MirrorError::Store(_) => "store_error",
            MirrorError::Derivation(_) => "derivation_error",
        }
    }
}

/// Errors detected while building the static mirror configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must not be empty")]
    EmptyValue { field: &'static str },

    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("mirror source {source_key} is already registered for {kind}")]
    DuplicateSource { kind: String, source_key: ObjectKey },

    #[error("mirror target {target} is already claimed by source {existing}")]
    DuplicateTarget {
        target: ObjectKey,
        existing: ObjectKey,
    },

    #[error("mirror source and target are the same object {key}")]
    SelfMirror { key: ObjectKey },
}

/// Validation failures for an `ExternalDNS` spec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("provider {provider} requires spec.provider.credentials")]
    MissingCredentials { provider: String },

    #[error("provider Infoblox requires spec.provider.infoblox")]
    MissingInfobloxConfig,

    #[error("hostnameAnnotation Ignore requires at least one fqdnTemplate")]
    MissingFqdnTemplate,

    #[error("domain filter {index} with matchType {match_type} requires '{field}'")]
    IncompleteDomainFilter {
        index: usize,
        match_type: String,
        field: &'static str,
    },

    #[error("zone at index {index} is empty")]
    EmptyZone { index: usize },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
