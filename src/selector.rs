// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Secret → `ExternalDNS` watch mapping.
//!
//! The `ExternalDNS` controller watches Secrets in two namespaces and must turn each
//! Secret event into the `ExternalDNS` resources to reconcile:
//!
//! - **Operator namespace**: a credentials source. The mapper queries the reflector's
//!   in-memory cache of `ExternalDNS` objects for every resource referencing it.
//! - **Operand namespace**: a mirrored copy named `external-dns-credentials-<x>`. The
//!   owning resource `<x>` is derived from the name alone, so tampering with or deleting
//!   the copy triggers a repair.
//!
//! Both mappers are synchronous and never call the API server.

use crate::config::OperatorConfig;
use crate::crd::ExternalDNS;
use crate::mirror::ObjectKey;
use crate::operand::extdns_name_from_credentials_secret;
use crate::reconcilers::externaldns::references_secret;
use k8s_openapi::api::core::v1::Secret;
use kube::runtime::reflector::{ObjectRef, Store};
use std::sync::Arc;

/// Find every `ExternalDNS` in `store` affected by a change to `secret`.
#[must_use]
pub fn find_externaldns_for_secret(
    store: &Store<ExternalDNS>,
    config: &OperatorConfig,
    secret: &Secret,
) -> Vec<ObjectRef<ExternalDNS>> {
    externaldns_for_secret(store.state(), config, secret)
}

/// [`find_externaldns_for_secret`] over an explicit set of resources.
pub fn externaldns_for_secret<I>(
    resources: I,
    config: &OperatorConfig,
    secret: &Secret,
) -> Vec<ObjectRef<ExternalDNS>>
where
    I: IntoIterator<Item = Arc<ExternalDNS>>,
{
    let Some(key) = ObjectKey::from_object(secret) else {
        return Vec::new();
    };

    let mut refs: Vec<ObjectRef<ExternalDNS>> = resources
        .into_iter()
        .filter(|extdns| references_secret(config, extdns, &key))
        .map(|extdns| ObjectRef::from_obj(&*extdns))
        .collect();

    if key.namespace == config.operand_namespace {
        if let Some(name) = extdns_name_from_credentials_secret(&key.name) {
            let owner = ObjectRef::new(name);
            if !refs.contains(&owner) {
                refs.push(owner);
            }
        }
    }
    refs
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod selector_tests;
