// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! ExternalDNS Kubernetes resource builders
//!
//! This module builds the `ServiceAccount` and `Deployment` running ExternalDNS for
//! one [`ExternalDNS`] resource. All functions are pure and easily testable.
//!
//! # Layout
//!
//! - One container per zone in `spec.zones`, each restricted with `--zone-id-filter`;
//!   a single unrestricted container when no zone is listed.
//! - Provider credentials come from the mirrored Secret
//!   `external-dns-credentials-<name>`, as environment variables or a mounted file
//!   depending on the provider.
//! - The trusted CA bundle, when configured, is mounted where the operand's TLS stack
//!   looks for it.
//! - The pod template carries a hash of the credentials so rotating them rolls the pods.

use crate::constants::{
    API_GROUP_VERSION, AWS_SHARED_CREDENTIALS_KEY, CONTAINER_NAME_EXTERNAL_DNS,
    CREDENTIALS_MOUNT_PATH, CREDENTIALS_SECRET_PREFIX, KIND_EXTERNAL_DNS,
    OPERAND_METRICS_START_PORT, OPERAND_NAME_PREFIX, TRUSTED_CA_BUNDLE_KEY, TRUSTED_CA_FILE_NAME,
    TRUSTED_CA_MOUNT_PATH,
};
use crate::crd::{
    DomainFilterType, DomainMatchType, ExternalDNS, HostnameAnnotationPolicy, ProviderType,
    SourceType,
};
use crate::labels::{
    APP_NAME_EXTERNAL_DNS, COMPONENT_OPERAND, CREDENTIALS_HASH_ANNOTATION, K8S_COMPONENT,
    K8S_INSTANCE, K8S_MANAGED_BY, K8S_NAME, MANAGED_BY_OPERATOR, OWNING_EXTERNAL_DNS_LABEL,
};
use k8s_openapi::api::{
    apps::v1::{Deployment, DeploymentSpec},
    core::v1::{
        Capabilities, ConfigMapVolumeSource, Container, EnvVar, EnvVarSource, KeyToPath,
        PodSecurityContext, PodSpec, PodTemplateSpec, SecretKeySelector, SecretVolumeSource,
        SecurityContext, ServiceAccount, Volume, VolumeMount,
    },
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use k8s_openapi::ByteString;
use kube::ResourceExt;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

const VOLUME_CREDENTIALS: &str = "credentials";
const VOLUME_TRUSTED_CA: &str = "trusted-ca";

/// Settings that come from the operator rather than from the `ExternalDNS` spec.
#[derive(Clone, Debug, Default)]
pub struct OperandSettings<'a> {
    /// Namespace the operand runs in
    pub namespace: &'a str,
    /// ExternalDNS container image
    pub image: &'a str,
    /// Name of the mirrored CA bundle `ConfigMap` in the operand namespace
    pub trusted_ca_configmap: Option<&'a str>,
    /// Hash of the mirrored credentials payload
    pub credentials_hash: Option<&'a str>,
}

/// Name shared by the operand `Deployment` and `ServiceAccount`.
#[must_use]
pub fn operand_name(extdns_name: &str) -> String {
    format!("{OPERAND_NAME_PREFIX}{extdns_name}")
}

/// Name of the mirrored credentials Secret in the operand namespace.
#[must_use]
pub fn credentials_secret_name(extdns_name: &str) -> String {
    format!("{CREDENTIALS_SECRET_PREFIX}{extdns_name}")
}

/// Inverse of [`credentials_secret_name`].
#[must_use]
pub fn extdns_name_from_credentials_secret(secret_name: &str) -> Option<&str> {
    secret_name
        .strip_prefix(CREDENTIALS_SECRET_PREFIX)
        .filter(|name| !name.is_empty())
}

/// Stable digest of a Secret payload.
///
/// Keys are visited in sorted order and separated from values, so equal payloads
/// always hash equal and `{"ab": "c"}` differs from `{"a": "bc"}`.
#[must_use]
pub fn credentials_hash(payload: &BTreeMap<String, ByteString>) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in payload {
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(&value.0);
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Labels carried by every object created for `extdns_name`.
#[must_use]
pub fn build_labels(extdns_name: &str) -> BTreeMap<String, String> {
    let mut labels = build_selector_labels(extdns_name);
    labels.insert(K8S_COMPONENT.into(), COMPONENT_OPERAND.into());
    labels.insert(K8S_MANAGED_BY.into(), MANAGED_BY_OPERATOR.into());
    labels.insert(OWNING_EXTERNAL_DNS_LABEL.into(), extdns_name.into());
    labels
}

fn build_selector_labels(extdns_name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(K8S_NAME.into(), APP_NAME_EXTERNAL_DNS.into());
    labels.insert(K8S_INSTANCE.into(), extdns_name.into());
    labels
}

/// Owner reference to the `ExternalDNS`, so its deletion garbage-collects the operand.
#[must_use]
pub fn build_owner_reference(extdns: &ExternalDNS) -> OwnerReference {
    OwnerReference {
        api_version: API_GROUP_VERSION.to_string(),
        kind: KIND_EXTERNAL_DNS.to_string(),
        name: extdns.name_any(),
        uid: extdns.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

#[must_use]
pub fn build_service_account(namespace: &str, extdns: &ExternalDNS) -> ServiceAccount {
    let name = extdns.name_any();
    ServiceAccount {
        metadata: ObjectMeta {
            name: Some(operand_name(&name)),
            namespace: Some(namespace.into()),
            labels: Some(build_labels(&name)),
            owner_references: Some(vec![build_owner_reference(extdns)]),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Command-line arguments for one operand container.
///
/// `zone` restricts the container to one hosted zone; `index` picks a distinct
/// metrics port so containers in the same pod do not collide.
#[must_use]
pub fn build_container_args(extdns: &ExternalDNS, zone: Option<&str>, index: usize) -> Vec<String> {
    let spec = &extdns.spec;
    let metrics_port = OPERAND_METRICS_START_PORT + i32::try_from(index).unwrap_or(0);

    let mut args = vec![
        format!("--metrics-address=127.0.0.1:{metrics_port}"),
        format!("--txt-owner-id={}", operand_name(&extdns.name_any())),
        format!("--provider={}", spec.provider.r#type.as_arg()),
        format!("--source={}", spec.source.r#type.as_arg()),
        "--policy=sync".to_string(),
        "--registry=txt".to_string(),
    ];

    if let Some(zone) = zone {
        args.push(format!("--zone-id-filter={zone}"));
    }

    for domain in &spec.domains {
        let arg = match (domain.filter_type, domain.match_type) {
            (DomainFilterType::Include, DomainMatchType::Exact) => {
                domain.name.as_ref().map(|v| format!("--domain-filter={v}"))
            }
            (DomainFilterType::Exclude, DomainMatchType::Exact) => {
                domain.name.as_ref().map(|v| format!("--exclude-domains={v}"))
            }
            (DomainFilterType::Include, DomainMatchType::Pattern) => domain
                .pattern
                .as_ref()
                .map(|v| format!("--regex-domain-filter={v}")),
            (DomainFilterType::Exclude, DomainMatchType::Pattern) => domain
                .pattern
                .as_ref()
                .map(|v| format!("--regex-domain-exclusion={v}")),
        };
        args.extend(arg);
    }

    let source = &spec.source;
    if let Some(namespace) = &source.namespace {
        args.push(format!("--namespace={namespace}"));
    }
    if let Some(filter) = source
        .label_filter
        .as_ref()
        .and_then(crate::crd::LabelSelector::to_selector_string)
    {
        args.push(format!("--label-filter={filter}"));
    }
    if !source.fqdn_template.is_empty() {
        args.push(format!("--fqdn-template={}", source.fqdn_template.join(",")));
    }
    if source.hostname_annotation == HostnameAnnotationPolicy::Ignore {
        args.push("--ignore-hostname-annotation".to_string());
    }
    if source.r#type == SourceType::Service {
        for service_type in source.service.iter().flat_map(|s| &s.service_type) {
            args.push(format!("--service-type-filter={service_type}"));
        }
    }

    args.extend(provider_args(extdns));
    args
}

fn provider_args(extdns: &ExternalDNS) -> Vec<String> {
    let provider = &extdns.spec.provider;
    match provider.r#type {
        ProviderType::Azure => vec![format!("--azure-config-file={CREDENTIALS_MOUNT_PATH}/azure.json")],
        ProviderType::BlueCat => {
            vec![format!("--bluecat-config-file={CREDENTIALS_MOUNT_PATH}/bluecat.json")]
        }
        ProviderType::Infoblox => provider
            .infoblox
            .as_ref()
            .map(|ib| {
                vec![
                    format!("--infoblox-grid-host={}", ib.grid_host),
                    format!("--infoblox-wapi-port={}", ib.wapi_port),
                    format!("--infoblox-wapi-version={}", ib.wapi_version),
                ]
            })
            .unwrap_or_default(),
        ProviderType::Aws | ProviderType::Gcp => Vec::new(),
    }
}

fn secret_env(name: &str, secret: &str, key: &str, optional: bool) -> EnvVar {
    EnvVar {
        name: name.into(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret.into(),
                key: key.into(),
                optional: Some(optional),
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Environment variables wiring provider credentials into a container.
fn build_credentials_env(provider: ProviderType, secret: &str) -> Vec<EnvVar> {
    match provider {
        // Either the access keys or a shared credentials file may be present.
        ProviderType::Aws => vec![
            secret_env("AWS_ACCESS_KEY_ID", secret, "aws_access_key_id", true),
            secret_env("AWS_SECRET_ACCESS_KEY", secret, "aws_secret_access_key", true),
            EnvVar {
                name: "AWS_SHARED_CREDENTIALS_FILE".into(),
                value: Some(format!("{CREDENTIALS_MOUNT_PATH}/{AWS_SHARED_CREDENTIALS_KEY}")),
                ..Default::default()
            },
        ],
        ProviderType::Infoblox => vec![
            secret_env(
                "EXTERNAL_DNS_INFOBLOX_WAPI_USERNAME",
                secret,
                "EXTERNAL_DNS_INFOBLOX_WAPI_USERNAME",
                false,
            ),
            secret_env(
                "EXTERNAL_DNS_INFOBLOX_WAPI_PASSWORD",
                secret,
                "EXTERNAL_DNS_INFOBLOX_WAPI_PASSWORD",
                false,
            ),
        ],
        ProviderType::Gcp => vec![EnvVar {
            name: "GOOGLE_APPLICATION_CREDENTIALS".into(),
            value: Some(format!("{CREDENTIALS_MOUNT_PATH}/gcp-credentials.json")),
            ..Default::default()
        }],
        ProviderType::Azure | ProviderType::BlueCat => Vec::new(),
    }
}

/// Whether the provider reads its credentials from a mounted file.
fn mounts_credentials(provider: ProviderType) -> bool {
    matches!(
        provider,
        ProviderType::Aws | ProviderType::Azure | ProviderType::Gcp | ProviderType::BlueCat
    )
}

fn build_volumes(
    provider: ProviderType,
    credentials_secret: Option<&str>,
    trusted_ca: Option<&str>,
) -> Vec<Volume> {
    let mut volumes = Vec::new();
    if let Some(secret) = credentials_secret.filter(|_| mounts_credentials(provider)) {
        volumes.push(Volume {
            name: VOLUME_CREDENTIALS.into(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(secret.into()),
                ..Default::default()
            }),
            ..Default::default()
        });
    }
    if let Some(configmap) = trusted_ca {
        volumes.push(Volume {
            name: VOLUME_TRUSTED_CA.into(),
            config_map: Some(ConfigMapVolumeSource {
                name: configmap.into(),
                items: Some(vec![KeyToPath {
                    key: TRUSTED_CA_BUNDLE_KEY.into(),
                    path: TRUSTED_CA_FILE_NAME.into(),
                    ..Default::default()
                }]),
                // The bundle may not be injected yet; pods must still start.
                optional: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        });
    }
    volumes
}

fn build_volume_mounts(volumes: &[Volume]) -> Vec<VolumeMount> {
    volumes
        .iter()
        .map(|volume| VolumeMount {
            name: volume.name.clone(),
            mount_path: if volume.name == VOLUME_TRUSTED_CA {
                TRUSTED_CA_MOUNT_PATH.into()
            } else {
                CREDENTIALS_MOUNT_PATH.into()
            },
            read_only: Some(true),
            ..Default::default()
        })
        .collect()
}

/// Build the operand `Deployment` for `extdns`.
#[must_use]
pub fn build_deployment(extdns: &ExternalDNS, settings: &OperandSettings<'_>) -> Deployment {
    let name = extdns.name_any();
    let deployment_name = operand_name(&name);
    let provider = extdns.spec.provider.r#type;
    let credentials_secret = extdns
        .spec
        .provider
        .credentials
        .as_ref()
        .map(|_| credentials_secret_name(&name));

    debug!(
        name = %deployment_name,
        namespace = %settings.namespace,
        provider = %provider,
        zones = extdns.spec.zones.len(),
        "Building Deployment for ExternalDNS"
    );

    let volumes = build_volumes(
        provider,
        credentials_secret.as_deref(),
        settings.trusted_ca_configmap,
    );
    let volume_mounts = build_volume_mounts(&volumes);
    let env = credentials_secret
        .as_deref()
        .map(|secret| build_credentials_env(provider, secret))
        .unwrap_or_default();

    let zones: Vec<Option<&str>> = if extdns.spec.zones.is_empty() {
        vec![None]
    } else {
        extdns.spec.zones.iter().map(|z| Some(z.as_str())).collect()
    };

    let containers = zones
        .iter()
        .enumerate()
        .map(|(index, zone)| Container {
            name: if zone.is_some() {
                format!("{CONTAINER_NAME_EXTERNAL_DNS}-{index}")
            } else {
                CONTAINER_NAME_EXTERNAL_DNS.into()
            },
            image: Some(settings.image.into()),
            image_pull_policy: Some("IfNotPresent".into()),
            args: Some(build_container_args(extdns, *zone, index)),
            env: if env.is_empty() { None } else { Some(env.clone()) },
            volume_mounts: if volume_mounts.is_empty() {
                None
            } else {
                Some(volume_mounts.clone())
            },
            security_context: Some(SecurityContext {
                run_as_non_root: Some(true),
                allow_privilege_escalation: Some(false),
                capabilities: Some(Capabilities {
                    drop: Some(vec!["ALL".to_string()]),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        })
        .collect();

    let labels = build_labels(&name);
    let annotations = settings.credentials_hash.map(|hash| {
        BTreeMap::from([(CREDENTIALS_HASH_ANNOTATION.to_string(), hash.to_string())])
    });

    Deployment {
        metadata: ObjectMeta {
            name: Some(deployment_name.clone()),
            namespace: Some(settings.namespace.into()),
            labels: Some(labels.clone()),
            owner_references: Some(vec![build_owner_reference(extdns)]),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(build_selector_labels(&name)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    annotations,
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers,
                    volumes: if volumes.is_empty() { None } else { Some(volumes) },
                    service_account_name: Some(deployment_name),
                    security_context: Some(PodSecurityContext {
                        run_as_non_root: Some(true),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
#[path = "operand_tests.rs"]
mod operand_tests;
