// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definition for the `ExternalDNS` operand.
//!
//! An [`ExternalDNS`] object is cluster-scoped. Each one results in an ExternalDNS
//! deployment in the operand namespace, configured for one DNS provider and one
//! source of hostnames.
//!
//! # Example
//!
//! ```rust
//! use external_dns_operator::crd::{
//!     ExternalDNSProvider, ExternalDNSSource, ExternalDNSSpec, ProviderType, SecretReference,
//!     SourceType,
//! };
//!
//! let spec = ExternalDNSSpec {
//!     provider: ExternalDNSProvider {
//!         r#type: ProviderType::Aws,
//!         credentials: Some(SecretReference {
//!             name: "aws-access-key".to_string(),
//!         }),
//!         infoblox: None,
//!     },
//!     source: ExternalDNSSource {
//!         r#type: SourceType::Service,
//!         ..Default::default()
//!     },
//!     zones: vec!["Z04015592QJX3EK1YYYYY".to_string()],
//!     domains: vec![],
//! };
//! assert_eq!(spec.provider.r#type.as_arg(), "aws");
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label selector to match Kubernetes resources.
///
/// A label selector is a label query over a set of resources. The result of matchLabels and
/// matchExpressions are `ANDed`. An empty label selector matches all objects.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Map of {key,value} pairs. A single {key,value} in the matchLabels map is equivalent
    /// to an element of matchExpressions, whose key field is "key", the operator is "In",
    /// and the values array contains only "value". All requirements must be satisfied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_labels: Option<BTreeMap<String, String>>,

    /// List of label selector requirements. All requirements must be satisfied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_expressions: Option<Vec<LabelSelectorRequirement>>,
}

/// A label selector requirement is a selector that contains values, a key, and an operator
/// that relates the key and values.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct LabelSelectorRequirement {
    /// The label key that the selector applies to.
    pub key: String,

    /// Operator represents a key's relationship to a set of values.
    /// Valid operators are In, `NotIn`, Exists and `DoesNotExist`.
    pub operator: String,

    /// An array of string values. If the operator is In or `NotIn`,
    /// the values array must be non-empty. If the operator is Exists or `DoesNotExist`,
    /// the values array must be empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

impl LabelSelector {
    /// Render the selector in the string form accepted by `--label-filter`.
    ///
    /// Returns `None` for an empty selector. Expressions with an unknown operator are
    /// skipped.
    #[must_use]
    pub fn to_selector_string(&self) -> Option<String> {
        let mut terms: Vec<String> = self
            .match_labels
            .iter()
            .flatten()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();

        for expr in self.match_expressions.iter().flatten() {
            let values = expr.values.clone().unwrap_or_default().join(",");
            let term = match expr.operator.as_str() {
                "In" => format!("{} in ({values})", expr.key),
                "NotIn" => format!("{} notin ({values})", expr.key),
                "Exists" => expr.key.clone(),
                "DoesNotExist" => format!("!{}", expr.key),
                _ => continue,
            };
            terms.push(term);
        }

        if terms.is_empty() {
            None
        } else {
            Some(terms.join(","))
        }
    }
}

/// Condition represents an observation of a resource's current state.
///
/// Conditions are used in status subresources to communicate the state of
/// a resource to users and controllers.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition: Available or Degraded.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// DNS provider the operand talks to.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
pub enum ProviderType {
    #[serde(rename = "AWS")]
    Aws,
    Azure,
    #[serde(rename = "GCP")]
    Gcp,
    Infoblox,
    BlueCat,
}

impl ProviderType {
    /// Name as written in the custom resource.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Aws => "AWS",
            ProviderType::Azure => "Azure",
            ProviderType::Gcp => "GCP",
            ProviderType::Infoblox => "Infoblox",
            ProviderType::BlueCat => "BlueCat",
        }
    }

    /// Value of the operand's `--provider` flag.
    #[must_use]
    pub fn as_arg(&self) -> &'static str {
        match self {
            ProviderType::Aws => "aws",
            ProviderType::Azure => "azure",
            ProviderType::Gcp => "google",
            ProviderType::Infoblox => "infoblox",
            ProviderType::BlueCat => "bluecat",
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a Secret in the operator namespace.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct SecretReference {
    pub name: String,
}

/// Connection settings for an Infoblox grid.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfobloxConfig {
    /// Grid manager host, e.g. `gridmaster.example.com`.
    pub grid_host: String,

    /// WAPI port.
    #[schemars(range(min = 1, max = 65535))]
    pub wapi_port: i32,

    /// WAPI version, e.g. `2.3.1`.
    pub wapi_version: String,
}

/// Provider section of the spec.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDNSProvider {
    pub r#type: ProviderType,

    /// Secret holding provider credentials, mirrored into the operand namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<SecretReference>,

    /// Required when `type` is `Infoblox`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infoblox: Option<InfobloxConfig>,
}

/// Kind of cluster resource hostnames are read from.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum SourceType {
    #[default]
    Service,
    Route,
    #[serde(rename = "CRD")]
    Crd,
}

impl SourceType {
    /// Value of the operand's `--source` flag.
    #[must_use]
    pub fn as_arg(&self) -> &'static str {
        match self {
            SourceType::Service => "service",
            SourceType::Route => "openshift-route",
            SourceType::Crd => "crd",
        }
    }
}

/// Whether the `external-dns.alpha.kubernetes.io/hostname` annotation is honoured.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum HostnameAnnotationPolicy {
    #[default]
    Allow,
    /// Ignore the annotation; hostnames come from `fqdnTemplate` only.
    Ignore,
}

/// Service-source specific options.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSourceOptions {
    /// Service types to publish, e.g. `LoadBalancer`, `NodePort`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_type: Vec<String>,
}

/// Source section of the spec.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDNSSource {
    pub r#type: SourceType,

    /// Limit the source to one namespace; all namespaces when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_filter: Option<LabelSelector>,

    #[serde(default)]
    pub hostname_annotation: HostnameAnnotationPolicy,

    /// Go templates producing hostnames, e.g. `{{.Name}}.example.com`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fqdn_template: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceSourceOptions>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum DomainFilterType {
    Include,
    Exclude,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum DomainMatchType {
    Exact,
    Pattern,
}

impl std::fmt::Display for DomainMatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainMatchType::Exact => f.write_str("Exact"),
            DomainMatchType::Pattern => f.write_str("Pattern"),
        }
    }
}

/// One domain filter entry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDNSDomain {
    pub filter_type: DomainFilterType,
    pub match_type: DomainMatchType,

    /// Domain name, required for `Exact`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Regular expression, required for `Pattern`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// `ExternalDNS` describes one managed ExternalDNS deployment.
///
/// # Example
///
/// ```yaml
/// apiVersion: externaldns.olm.openshift.io/v1beta1
/// kind: ExternalDNS
/// metadata:
///   name: sample-aws
/// spec:
///   provider:
///     type: AWS
///     credentials:
///       name: aws-access-key
///   source:
///     type: Service
///     service:
///       serviceType: [LoadBalancer]
///   zones:
///     - Z04015592QJX3EK1YYYYY
///   domains:
///     - filterType: Include
///       matchType: Exact
///       name: example.com
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "externaldns.olm.openshift.io",
    version = "v1beta1",
    kind = "ExternalDNS",
    shortname = "extdns",
    doc = "ExternalDNS describes a managed ExternalDNS deployment publishing cluster hostnames to one DNS provider.",
    printcolumn = r#"{"name":"Provider","type":"string","jsonPath":".spec.provider.type"}"#,
    printcolumn = r#"{"name":"Source","type":"string","jsonPath":".spec.source.type"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[kube(status = "ExternalDNSStatus")]
#[serde(rename_all = "camelCase")]
pub struct ExternalDNSSpec {
    pub provider: ExternalDNSProvider,

    pub source: ExternalDNSSource,

    /// Hosted zone IDs to manage; one operand container is run per zone.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<ExternalDNSDomain>,
}

/// `ExternalDNS` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDNSStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    /// Zones the operand was configured with.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
