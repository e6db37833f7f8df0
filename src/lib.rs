// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # ExternalDNS Operator for Kubernetes
//!
//! A Kubernetes operator that deploys and configures ExternalDNS from a cluster-scoped
//! `ExternalDNS` custom resource, and keeps the configuration it depends on mirrored
//! from the operator namespace into the operand namespace.
//!
//! ## Overview
//!
//! - A desired-state mirror engine copies `ConfigMap`s (trusted CA bundle) and
//!   `Secret`s (provider credentials) across namespaces. A single reconciliation reads
//!   the source, derives the target and issues at most one write.
//! - An `ExternalDNS` controller validates each resource, mirrors its credentials and
//!   renders the operand `Deployment`.
//!
//! ## Modules
//!
//! - [`mirror`] - Mirror identities, registry and desired-state derivation
//! - [`store`] - Object store capability (Kubernetes API and in-memory)
//! - [`reconcilers`] - Mirror and `ExternalDNS` reconciliation logic
//! - [`queue`] - Coalescing work queue with per-key backoff
//! - [`watch`] - Watch event translation and routing
//! - [`controller`] - Watch-to-reconcile wiring for both controllers
//! - [`crd`] - The `ExternalDNS` custom resource
//! - [`operand`] - Builders for the ExternalDNS `Deployment` and `ServiceAccount`
//! - [`config`] - Operator configuration (flags and environment)
//!
//! ## Example
//!
//! ```rust
//! use external_dns_operator::mirror::derive::{derive_payload, KeyMapping, Projection};
//! use external_dns_operator::mirror::ObjectKey;
//! use std::collections::BTreeMap;
//!
//! let source = ObjectKey::new("external-dns-operator", "gcp-creds");
//! let payload = BTreeMap::from([("service_account.json".to_string(), "{}".to_string())]);
//! let projection = Projection::select(vec![KeyMapping::rename(
//!     "service_account.json",
//!     "gcp-credentials.json",
//! )]);
//!
//! let derived = derive_payload(&source, &payload, &projection).unwrap();
//! assert!(derived.contains_key("gcp-credentials.json"));
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod crd;
pub mod errors;
pub mod health;
pub mod labels;
pub mod metrics;
pub mod mirror;
pub mod operand;
pub mod queue;
pub mod reconcilers;
pub mod selector;
pub mod store;
pub mod watch;
