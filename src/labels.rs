// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across all reconcilers.
//!
//! This module defines standard Kubernetes labels and operator-specific labels/annotations
//! to ensure consistency across all resources created by the controller.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component name within the architecture
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of the application
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for a unique name identifying the instance of an application
pub const K8S_INSTANCE: &str = "app.kubernetes.io/instance";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Value for `app.kubernetes.io/managed-by` on every object the operator writes
pub const MANAGED_BY_OPERATOR: &str = "external-dns-operator";

/// Application name for operand workloads
pub const APP_NAME_EXTERNAL_DNS: &str = "external-dns";

/// Component value for operand workloads
pub const COMPONENT_OPERAND: &str = "operand";

/// Component value for mirrored objects
pub const COMPONENT_MIRROR: &str = "mirror";

// ============================================================================
// Operator-Specific Annotations
// ============================================================================

/// Annotation on a mirrored target recording its source (`namespace/name`)
pub const MIRROR_SOURCE_ANNOTATION: &str = "externaldns.olm.openshift.io/mirror-source";

/// Pod template annotation carrying the hash of the mirrored credentials payload
pub const CREDENTIALS_HASH_ANNOTATION: &str =
    "externaldns.olm.openshift.io/credentials-secret-hash";

/// Label on operand objects naming the owning `ExternalDNS`
pub const OWNING_EXTERNAL_DNS_LABEL: &str = "externaldns.olm.openshift.io/owning-externaldns";
