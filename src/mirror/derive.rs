// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Desired-state derivation for mirrored objects.
//!
//! Everything here is pure: no I/O, and the same source always yields the same target.
//! Payloads are `BTreeMap`s, so iteration order (and therefore serialization) is
//! deterministic across calls and process restarts.
//!
//! The per-kind filtering rule is a [`Projection`] value rather than code, so a new
//! mirror kind only needs a new projection, never a change to the reconciliation core.

use super::resource::{MirrorPayload, MirrorResource};
use super::{MirrorSpec, ObjectKey};
use crate::errors::DerivationError;
use crate::labels::{
    COMPONENT_MIRROR, K8S_COMPONENT, K8S_MANAGED_BY, MANAGED_BY_OPERATOR,
    MIRROR_SOURCE_ANNOTATION,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Copy `from` in the source payload to `to` in the target payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyMapping {
    pub from: String,
    pub to: String,
}

impl KeyMapping {
    /// Keep `key` under the same name.
    #[must_use]
    pub fn keep(key: &str) -> Self {
        Self {
            from: key.to_string(),
            to: key.to_string(),
        }
    }

    /// Copy `from` under the name `to`.
    #[must_use]
    pub fn rename(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Data rule describing how a source payload becomes a target payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Projection {
    /// `None` copies every key unchanged; `Some` copies only the listed keys.
    pub mappings: Option<Vec<KeyMapping>>,
    /// Source keys that must be present, otherwise derivation fails.
    pub required: Vec<String>,
    /// Alternative key sets; when non-empty, at least one set must be fully present.
    pub any_of: Vec<Vec<String>>,
}

impl Projection {
    /// Copy the whole payload unchanged.
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Copy only the listed keys, renaming where the mapping says so.
    #[must_use]
    pub fn select(mappings: Vec<KeyMapping>) -> Self {
        Self {
            mappings: Some(mappings),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn require<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Require at least one of `alternatives` to be present in full.
    #[must_use]
    pub fn require_any<I, S>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.any_of.extend(
            alternatives
                .into_iter()
                .map(|set| set.into_iter().map(Into::into).collect()),
        );
        self
    }
}

/// Apply `projection` to a source payload.
///
/// # Errors
///
/// Returns [`DerivationError::MissingKey`] if a required key is absent from `payload`,
/// and [`DerivationError::NoAlternative`] if none of the `any_of` sets is complete.
pub fn derive_payload<V: Clone>(
    source: &ObjectKey,
    payload: &BTreeMap<String, V>,
    projection: &Projection,
) -> Result<BTreeMap<String, V>, DerivationError> {
    if let Some(missing) = projection
        .required
        .iter()
        .find(|key| !payload.contains_key(key.as_str()))
    {
        return Err(DerivationError::MissingKey {
            source_key: source.clone(),
            key: missing.clone(),
        });
    }

    let complete = |set: &Vec<String>| set.iter().all(|key| payload.contains_key(key));
    if !projection.any_of.is_empty() && !projection.any_of.iter().any(complete) {
        return Err(DerivationError::NoAlternative {
            source_key: source.clone(),
            alternatives: projection
                .any_of
                .iter()
                .map(|set| set.join("+"))
                .collect::<Vec<_>>()
                .join(" | "),
        });
    }

    let derived = match &projection.mappings {
        None => payload.clone(),
        Some(mappings) => mappings
            .iter()
            .filter_map(|m| payload.get(&m.from).map(|v| (m.to.clone(), v.clone())))
            .collect(),
    };
    Ok(derived)
}

/// Metadata for a freshly created target: identity, ownership labels, source annotation.
#[must_use]
pub fn target_metadata(mirror: &MirrorSpec) -> ObjectMeta {
    let labels = BTreeMap::from([
        (K8S_MANAGED_BY.to_string(), MANAGED_BY_OPERATOR.to_string()),
        (K8S_COMPONENT.to_string(), COMPONENT_MIRROR.to_string()),
    ]);
    let annotations = BTreeMap::from([(
        MIRROR_SOURCE_ANNOTATION.to_string(),
        mirror.source.to_string(),
    )]);

    ObjectMeta {
        name: Some(mirror.target.name.clone()),
        namespace: Some(mirror.target.namespace.clone()),
        labels: Some(labels),
        annotations: Some(annotations),
        owner_references: mirror.owner.clone().map(|owner| vec![owner]),
        ..Default::default()
    }
}

/// Compute the desired target object for `source` under `mirror`.
///
/// # Errors
///
/// Returns [`DerivationError`] if the source payload does not satisfy the projection.
pub fn desired_target<K: MirrorResource>(
    source: &K,
    mirror: &MirrorSpec,
) -> Result<K, DerivationError> {
    let payload: MirrorPayload<K::Value> =
        derive_payload(&mirror.source, &source.payload(), &mirror.projection)?;
    Ok(K::from_parts(target_metadata(mirror), payload))
}

#[cfg(test)]
#[path = "derive_tests.rs"]
mod derive_tests;
