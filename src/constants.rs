// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the ExternalDNS operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "externaldns.olm.openshift.io/v1beta1";

/// Kind name for `ExternalDNS` resource
pub const KIND_EXTERNAL_DNS: &str = "ExternalDNS";

/// Field manager used for every write issued by the operator
pub const FIELD_MANAGER: &str = "external-dns-operator";

// ============================================================================
// Namespace Defaults
// ============================================================================

/// Default namespace the operator runs in (holds source objects)
pub const DEFAULT_OPERATOR_NAMESPACE: &str = "external-dns-operator";

/// Default namespace the operands run in (holds mirrored target objects)
pub const DEFAULT_OPERAND_NAMESPACE: &str = "external-dns";

// ============================================================================
// Mirror Constants
// ============================================================================

/// Name of the mirrored trusted CA `ConfigMap` in the operand namespace
pub const TRUSTED_CA_TARGET_NAME: &str = "external-dns-trusted-ca-bundle";

/// Key holding the PEM bundle inside a trusted CA `ConfigMap`
pub const TRUSTED_CA_BUNDLE_KEY: &str = "ca-bundle.crt";

/// Prefix of the mirrored credentials `Secret` (suffix is the `ExternalDNS` name)
pub const CREDENTIALS_SECRET_PREFIX: &str = "external-dns-credentials-";

// ============================================================================
// Operand Constants
// ============================================================================

/// Default external-dns image
pub const DEFAULT_EXTERNAL_DNS_IMAGE: &str = "registry.k8s.io/external-dns/external-dns:v0.14.2";

/// Prefix for operand resource names (`Deployment`, `ServiceAccount`)
pub const OPERAND_NAME_PREFIX: &str = "external-dns-";

/// Name of the container when no zones are configured
pub const CONTAINER_NAME_EXTERNAL_DNS: &str = "external-dns";

/// Mount path for provider credential files
pub const CREDENTIALS_MOUNT_PATH: &str = "/etc/kubernetes";

/// Credentials Secret key holding an AWS shared credentials file
pub const AWS_SHARED_CREDENTIALS_KEY: &str = "credentials";

/// Mount path for the trusted CA bundle
pub const TRUSTED_CA_MOUNT_PATH: &str = "/etc/pki/ca-trust/extracted/pem";

/// File name the trusted CA bundle is projected to
pub const TRUSTED_CA_FILE_NAME: &str = "tls-ca-bundle.pem";

/// Metrics port exposed by each external-dns container (incremented per zone)
pub const OPERAND_METRICS_START_PORT: i32 = 7979;

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue duration while waiting on a dependency such as a missing credentials secret
pub const DEPENDENCY_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue duration once an `ExternalDNS` is available (5 minutes)
pub const READY_REQUEUE_DURATION_SECS: u64 = 300;

// ============================================================================
// Work Queue Constants
// ============================================================================

/// Default number of concurrent mirror reconciliations
pub const DEFAULT_MIRROR_WORKERS: usize = 4;

/// Default capacity of the bounded watch → queue channel
pub const DEFAULT_MIRROR_QUEUE_CAPACITY: usize = 128;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics / Health Server Constants
// ============================================================================

/// Default bind address for the Prometheus metrics HTTP server
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Default bind address for the health check HTTP server
pub const DEFAULT_HEALTH_BIND_ADDRESS: &str = "0.0.0.0:8081";
