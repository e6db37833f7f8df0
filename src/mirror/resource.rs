// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resource types that can be mirrored.
//!
//! [`MirrorResource`] abstracts over the payload field of each mirrored kind so the
//! reconciliation core can stay generic. Only the payload participates in equality;
//! labels, annotations and resource versions are ignored.

use super::MirrorKind;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::core::NamespaceResourceScope;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Payload of a mirrored object: an ordered key → value map.
pub type MirrorPayload<V> = BTreeMap<String, V>;

/// A namespaced Kubernetes resource whose payload can be mirrored.
pub trait MirrorResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + DeserializeOwned
    + Serialize
    + Send
    + Sync
    + 'static
{
    /// Payload value type (`String` for `ConfigMap`, `ByteString` for `Secret`).
    type Value: Clone + Debug + PartialEq + Send + Sync;

    /// Kind tag used to look up mirrors in the registry.
    const MIRROR_KIND: MirrorKind;

    /// Current payload; an absent payload is the empty map.
    fn payload(&self) -> MirrorPayload<Self::Value>;

    /// Replace the payload, leaving every other field untouched.
    fn set_payload(&mut self, payload: MirrorPayload<Self::Value>);

    /// Build a new object from metadata and payload.
    fn from_parts(metadata: ObjectMeta, payload: MirrorPayload<Self::Value>) -> Self;

    /// Payload equality, the only comparison that may trigger an update.
    fn payload_eq(&self, other: &Self) -> bool {
        self.payload() == other.payload()
    }
}

impl MirrorResource for ConfigMap {
    type Value = String;
    const MIRROR_KIND: MirrorKind = MirrorKind::ConfigMap;

    fn payload(&self) -> MirrorPayload<String> {
        self.data.clone().unwrap_or_default()
    }

    fn set_payload(&mut self, payload: MirrorPayload<String>) {
        self.data = Some(payload);
    }

    fn from_parts(metadata: ObjectMeta, payload: MirrorPayload<String>) -> Self {
        ConfigMap {
            metadata,
            data: Some(payload),
            ..Default::default()
        }
    }
}

impl MirrorResource for Secret {
    type Value = ByteString;
    const MIRROR_KIND: MirrorKind = MirrorKind::Secret;

    fn payload(&self) -> MirrorPayload<ByteString> {
        self.data.clone().unwrap_or_default()
    }

    fn set_payload(&mut self, payload: MirrorPayload<ByteString>) {
        self.data = Some(payload);
    }

    fn from_parts(metadata: ObjectMeta, payload: MirrorPayload<ByteString>) -> Self {
        Secret {
            metadata,
            data: Some(payload),
            type_: Some("Opaque".to_string()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod resource_tests;
