// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration from command-line flags and environment variables.
//!
//! Every flag can also be set through its environment variable, which is how the
//! operator Deployment passes them. The resulting [`OperatorConfig`] is validated once
//! at startup and then shared read-only through the controller context.

use crate::constants::{
    DEFAULT_EXTERNAL_DNS_IMAGE, DEFAULT_HEALTH_BIND_ADDRESS, DEFAULT_METRICS_BIND_ADDRESS,
    DEFAULT_MIRROR_QUEUE_CAPACITY, DEFAULT_MIRROR_WORKERS, DEFAULT_OPERAND_NAMESPACE,
    DEFAULT_OPERATOR_NAMESPACE, TRUSTED_CA_TARGET_NAME,
};
use crate::errors::ConfigError;
use crate::mirror::derive::Projection;
use crate::mirror::{MirrorConfig, MirrorKind, MirrorRegistry, MirrorSpec, ObjectKey, TargetNameRule};
use clap::Parser;
use std::net::SocketAddr;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "external-dns-operator",
    version,
    about = "Manages ExternalDNS deployments and mirrors their configuration across namespaces"
)]
pub struct OperatorConfig {
    /// Namespace the operator runs in; mirror sources are read from here
    #[arg(long, env = "OPERATOR_NAMESPACE", default_value = DEFAULT_OPERATOR_NAMESPACE)]
    pub operator_namespace: String,

    /// Namespace ExternalDNS deployments and mirrored objects are written to
    #[arg(long, env = "OPERAND_NAMESPACE", default_value = DEFAULT_OPERAND_NAMESPACE)]
    pub operand_namespace: String,

    /// Name of the trusted CA bundle ConfigMap in the operator namespace
    #[arg(long, env = "TRUSTED_CA_CONFIGMAP_NAME")]
    pub trusted_ca_configmap: Option<String>,

    /// ExternalDNS container image
    #[arg(long, env = "RELATED_IMAGE_EXTERNAL_DNS", default_value = DEFAULT_EXTERNAL_DNS_IMAGE)]
    pub external_dns_image: String,

    /// Address the Prometheus metrics endpoint listens on
    #[arg(long, env = "METRICS_BIND_ADDRESS", default_value = DEFAULT_METRICS_BIND_ADDRESS)]
    pub metrics_bind_address: SocketAddr,

    /// Address the liveness and readiness endpoints listen on
    #[arg(long, env = "HEALTH_BIND_ADDRESS", default_value = DEFAULT_HEALTH_BIND_ADDRESS)]
    pub health_bind_address: SocketAddr,

    /// Mirror keys reconciled concurrently
    #[arg(long, env = "MIRROR_WORKERS", default_value_t = DEFAULT_MIRROR_WORKERS)]
    pub workers: usize,

    /// Buffered watch events before watchers wait on the mirror queue
    #[arg(long, env = "MIRROR_QUEUE_CAPACITY", default_value_t = DEFAULT_MIRROR_QUEUE_CAPACITY)]
    pub queue_capacity: usize,
}

impl OperatorConfig {
    /// Check the values clap cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an empty namespace or CA ConfigMap name, a zero worker
    /// count or queue capacity, or a trusted CA mirror that would copy onto itself.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.operator_namespace.is_empty() {
            return Err(ConfigError::EmptyValue {
                field: "operator-namespace",
            });
        }
        if self.operand_namespace.is_empty() {
            return Err(ConfigError::EmptyValue {
                field: "operand-namespace",
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::ZeroValue { field: "workers" });
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroValue {
                field: "queue-capacity",
            });
        }
        if let Some(spec) = self.trusted_ca_mirror() {
            if spec.source.name.is_empty() {
                return Err(ConfigError::EmptyValue {
                    field: "trusted-ca-configmap",
                });
            }
            if spec.source == spec.target {
                return Err(ConfigError::SelfMirror { key: spec.source });
            }
        }
        Ok(())
    }

    /// The trusted CA bundle mirror, if a CA ConfigMap is configured.
    #[must_use]
    pub fn trusted_ca_mirror(&self) -> Option<MirrorSpec> {
        let name = self.trusted_ca_configmap.as_ref()?;
        let config = MirrorConfig {
            source_namespace: self.operator_namespace.clone(),
            target_namespace: self.operand_namespace.clone(),
            source_name: name.clone(),
            target_name: TargetNameRule::Fixed(TRUSTED_CA_TARGET_NAME.to_string()),
        };
        Some(MirrorSpec::from_config(
            MirrorKind::ConfigMap,
            &config,
            Projection::identity(),
        ))
    }

    /// Key of the mirrored CA bundle in the operand namespace, if configured.
    #[must_use]
    pub fn trusted_ca_target(&self) -> Option<ObjectKey> {
        self.trusted_ca_mirror().map(|spec| spec.target)
    }

    /// Build the static mirror table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configured mirrors conflict.
    pub fn mirror_registry(&self) -> Result<MirrorRegistry, ConfigError> {
        let mut registry = MirrorRegistry::default();
        if let Some(spec) = self.trusted_ca_mirror() {
            registry.register(spec)?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
