// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cross-namespace mirror definitions and event routing.
//!
//! A mirror is a `(source, target, projection)` triple: the source object lives in the
//! operator namespace, the target in the operand namespace, and the projection is the
//! data rule turning the source payload into the target payload.
//!
//! # Routing
//!
//! Two watch streams feed one key space. Whichever side changes, the request key is
//! always the **source** identity:
//!
//! - Source side: `(namespace, name)` must match a registered source exactly.
//! - Target side: `(namespace, name)` must match a registered target exactly, and is
//!   mapped back to its source through a reverse table built at registration time.
//!
//! Anything else is rejected, so an unrelated object never schedules a reconciliation.
//!
//! # Example
//!
//! ```rust
//! use external_dns_operator::mirror::{
//!     MirrorConfig, MirrorKind, MirrorRegistry, MirrorSpec, ObjectKey, Side, TargetNameRule,
//! };
//! use external_dns_operator::mirror::derive::Projection;
//!
//! let config = MirrorConfig {
//!     source_namespace: "external-dns-operator".to_string(),
//!     target_namespace: "external-dns".to_string(),
//!     source_name: "trusted-ca".to_string(),
//!     target_name: TargetNameRule::Fixed("external-dns-trusted-ca-bundle".to_string()),
//! };
//! let mut registry = MirrorRegistry::default();
//! registry
//!     .register(MirrorSpec::from_config(MirrorKind::ConfigMap, &config, Projection::identity()))
//!     .unwrap();
//!
//! let routed = registry.route(
//!     MirrorKind::ConfigMap,
//!     Side::Target,
//!     &ObjectKey::new("external-dns", "external-dns-trusted-ca-bundle"),
//! );
//! assert_eq!(routed, Some(ObjectKey::new("external-dns-operator", "trusted-ca")));
//! ```

pub mod derive;
pub mod resource;

use crate::errors::ConfigError;
use derive::Projection;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;
use std::collections::{BTreeSet, HashMap};

/// Identity of a namespaced object: `(namespace, name)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of a Kubernetes object, or `None` if it has no namespace.
    #[must_use]
    pub fn from_object<K: ResourceExt>(obj: &K) -> Option<Self> {
        Some(Self::new(obj.namespace()?, obj.name_any()))
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Kind tag selecting the registration table entry for a mirrored resource type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MirrorKind {
    ConfigMap,
    Secret,
}

impl MirrorKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MirrorKind::ConfigMap => "ConfigMap",
            MirrorKind::Secret => "Secret",
        }
    }
}

impl std::fmt::Display for MirrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which end of a mirror a watch stream observes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Source,
    Target,
}

/// Deterministic rule turning a source name into a target name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetNameRule {
    /// Always the given name.
    Fixed(String),
}

impl TargetNameRule {
    /// Target name for a mirror whose source is `_source_name`.
    #[must_use]
    pub fn resolve(&self, _source_name: &str) -> String {
        match self {
            TargetNameRule::Fixed(name) => name.clone(),
        }
    }
}

/// Static description of one mirror, as read from operator configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorConfig {
    pub source_namespace: String,
    pub target_namespace: String,
    pub source_name: String,
    pub target_name: TargetNameRule,
}

/// A fully resolved mirror: concrete source and target identities plus the projection.
#[derive(Clone, Debug, PartialEq)]
pub struct MirrorSpec {
    pub kind: MirrorKind,
    pub source: ObjectKey,
    pub target: ObjectKey,
    pub projection: Projection,
    /// Owner reference stamped on the target when it is created.
    pub owner: Option<OwnerReference>,
}

impl MirrorSpec {
    /// Resolve a [`MirrorConfig`] into concrete identities.
    #[must_use]
    pub fn from_config(kind: MirrorKind, config: &MirrorConfig, projection: Projection) -> Self {
        Self {
            kind,
            source: ObjectKey::new(&config.source_namespace, &config.source_name),
            target: ObjectKey::new(
                &config.target_namespace,
                config.target_name.resolve(&config.source_name),
            ),
            projection,
            owner: None,
        }
    }

    #[must_use]
    pub fn with_owner(mut self, owner: OwnerReference) -> Self {
        self.owner = Some(owner);
        self
    }
}

/// Registration table of all statically configured mirrors.
///
/// Lookups are keyed by `(kind, identity)` in both directions; registering a mirror
/// whose source or target is already claimed fails so the reverse mapping stays total
/// and unambiguous.
#[derive(Clone, Debug, Default)]
pub struct MirrorRegistry {
    mirrors: Vec<MirrorSpec>,
    by_source: HashMap<(MirrorKind, ObjectKey), usize>,
    by_target: HashMap<(MirrorKind, ObjectKey), usize>,
}

impl MirrorRegistry {
    /// Add a mirror to the table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a name is empty, the source and target are the same
    /// object, or either identity is already registered for this kind.
    pub fn register(&mut self, spec: MirrorSpec) -> Result<(), ConfigError> {
        if spec.source.name.is_empty() || spec.source.namespace.is_empty() {
            return Err(ConfigError::EmptyValue {
                field: "mirror source",
            });
        }
        if spec.target.name.is_empty() || spec.target.namespace.is_empty() {
            return Err(ConfigError::EmptyValue {
                field: "mirror target",
            });
        }
        if spec.source == spec.target {
            return Err(ConfigError::SelfMirror { key: spec.source });
        }
        if self
            .by_source
            .contains_key(&(spec.kind, spec.source.clone()))
        {
            return Err(ConfigError::DuplicateSource {
                kind: spec.kind.to_string(),
                source_key: spec.source,
            });
        }
        if let Some(&existing) = self.by_target.get(&(spec.kind, spec.target.clone())) {
            return Err(ConfigError::DuplicateTarget {
                target: spec.target,
                existing: self.mirrors[existing].source.clone(),
            });
        }

        let index = self.mirrors.len();
        self.by_source
            .insert((spec.kind, spec.source.clone()), index);
        self.by_target
            .insert((spec.kind, spec.target.clone()), index);
        self.mirrors.push(spec);
        Ok(())
    }

    /// Map an observed object to the source key it must reconcile, if any.
    #[must_use]
    pub fn route(&self, kind: MirrorKind, side: Side, key: &ObjectKey) -> Option<ObjectKey> {
        let table = match side {
            Side::Source => &self.by_source,
            Side::Target => &self.by_target,
        };
        table
            .get(&(kind, key.clone()))
            .map(|&index| self.mirrors[index].source.clone())
    }

    /// The mirror whose source is `source`.
    #[must_use]
    pub fn get(&self, kind: MirrorKind, source: &ObjectKey) -> Option<&MirrorSpec> {
        self.by_source
            .get(&(kind, source.clone()))
            .map(|&index| &self.mirrors[index])
    }

    /// All mirrors registered for `kind`.
    pub fn mirrors_of(&self, kind: MirrorKind) -> impl Iterator<Item = &MirrorSpec> {
        self.mirrors.iter().filter(move |m| m.kind == kind)
    }

    /// Distinct namespaces that must be watched on `side` for `kind`.
    #[must_use]
    pub fn namespaces(&self, kind: MirrorKind, side: Side) -> BTreeSet<String> {
        self.mirrors_of(kind)
            .map(|m| match side {
                Side::Source => m.source.namespace.clone(),
                Side::Target => m.target.namespace.clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mirrors.len()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
