// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic create-or-update helper for operand resources.
//!
//! The operand `ServiceAccount` and `Deployment` are fully described by the operator,
//! so they are written with server-side apply under the operator's field manager.
//! Fields owned by other managers (for example an HPA scaling replicas) are left alone.
//!
//! # Example
//!
//! ```rust,no_run
//! use external_dns_operator::reconcilers::resources::create_or_apply;
//! use k8s_openapi::api::core::v1::ServiceAccount;
//! use kube::Client;
//! use anyhow::Result;
//!
//! async fn example(client: &Client, namespace: &str, sa: ServiceAccount) -> Result<()> {
//!     create_or_apply(client, namespace, &sa, "external-dns-operator").await?;
//!     Ok(())
//! }
//! ```

use anyhow::{anyhow, Result};
use kube::api::{Patch, PatchParams, PostParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use tracing::{debug, info};

/// Result of [`create_or_apply`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Applied,
}

/// Name of a resource about to be written.
///
/// # Errors
///
/// Returns an error if the resource has no name in its metadata.
pub fn resource_name<T: Resource>(resource: &T) -> Result<&str> {
    resource
        .meta()
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| anyhow!("Resource must have a name"))
}

/// Create a resource, or server-side apply it if it already exists.
///
/// # Errors
///
/// Returns an error if:
/// - The resource has no name in its metadata
/// - API operations fail
pub async fn create_or_apply<T>(
    client: &Client,
    namespace: &str,
    resource: &T,
    field_manager: &str,
) -> Result<ApplyOutcome>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let name = resource_name(resource)?;
    let api: Api<T> = Api::namespaced(client.clone(), namespace);

    debug!(
        namespace = %namespace,
        name = %name,
        kind = %T::kind(&()),
        "Creating or updating resource with Apply strategy"
    );

    if api.get_opt(name).await?.is_some() {
        api.patch(
            name,
            &PatchParams::apply(field_manager).force(),
            &Patch::Apply(resource),
        )
        .await?;
        debug!("Applied {} {}/{}", T::kind(&()), namespace, name);
        Ok(ApplyOutcome::Applied)
    } else {
        let params = PostParams {
            field_manager: Some(field_manager.to_string()),
            ..Default::default()
        };
        api.create(&params, resource).await?;
        info!("Created {} {}/{}", T::kind(&()), namespace, name);
        Ok(ApplyOutcome::Created)
    }
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod resources_tests;
