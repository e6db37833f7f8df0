// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `ExternalDNS` reconciliation logic.
//!
//! For each `ExternalDNS` resource this module:
//!
//! 1. Validates the spec (replacing an admission webhook)
//! 2. Mirrors the provider credentials Secret from the operator namespace into the
//!    operand namespace through the shared mirror core
//! 3. Applies the operand `ServiceAccount` and `Deployment`
//! 4. Reports `Available` / `Degraded` conditions back on the resource

use super::mirror::{reconcile_mirror_recorded, ReconcileOutcome};
use super::resources::create_or_apply;
use super::status::ExternalDNSStatusUpdater;
use crate::config::OperatorConfig;
use crate::constants::{
    AWS_SHARED_CREDENTIALS_KEY, DEPENDENCY_REQUEUE_DURATION_SECS, FIELD_MANAGER,
    READY_REQUEUE_DURATION_SECS,
};
use crate::context::Context;
use crate::crd::{
    DomainMatchType, ExternalDNS, ExternalDNSSpec, HostnameAnnotationPolicy, ProviderType,
};
use crate::errors::ValidationError;
use crate::mirror::derive::{KeyMapping, Projection};
use crate::mirror::resource::MirrorResource;
use crate::mirror::{MirrorConfig, MirrorKind, MirrorSpec, ObjectKey, TargetNameRule};
use crate::operand::{
    build_deployment, build_owner_reference, build_service_account, credentials_hash,
    credentials_secret_name, OperandSettings,
};
use crate::store::{KubeStore, ObjectStore};
use anyhow::{Context as _, Result};
use k8s_openapi::api::core::v1::Secret;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Condition reason for a spec rejected by [`validate`].
pub const REASON_INVALID_SPEC: &str = "InvalidSpec";

/// Condition reason while the referenced credentials Secret does not exist.
pub const REASON_CREDENTIALS_NOT_FOUND: &str = "CredentialsNotFound";

/// Condition reason when the credentials Secret could not be mirrored.
pub const REASON_CREDENTIALS_MIRROR_FAILED: &str = "CredentialsMirrorFailed";

/// Condition reason when the operand resources could not be applied.
pub const REASON_OPERAND_FAILED: &str = "OperandApplyFailed";

/// Check an `ExternalDNS` spec for combinations the operand cannot run with.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn validate(spec: &ExternalDNSSpec) -> Result<(), ValidationError> {
    let provider = &spec.provider;
    if provider.credentials.as_ref().is_none_or(|c| c.name.is_empty()) {
        return Err(ValidationError::MissingCredentials {
            provider: provider.r#type.to_string(),
        });
    }
    if provider.r#type == ProviderType::Infoblox && provider.infoblox.is_none() {
        return Err(ValidationError::MissingInfobloxConfig);
    }

    if spec.source.hostname_annotation == HostnameAnnotationPolicy::Ignore
        && spec.source.fqdn_template.is_empty()
    {
        return Err(ValidationError::MissingFqdnTemplate);
    }

    for (index, domain) in spec.domains.iter().enumerate() {
        let (value, field) = match domain.match_type {
            DomainMatchType::Exact => (&domain.name, "name"),
            DomainMatchType::Pattern => (&domain.pattern, "pattern"),
        };
        if value.as_ref().is_none_or(String::is_empty) {
            return Err(ValidationError::IncompleteDomainFilter {
                index,
                match_type: domain.match_type.to_string(),
                field,
            });
        }
    }

    if let Some(index) = spec.zones.iter().position(|zone| zone.trim().is_empty()) {
        return Err(ValidationError::EmptyZone { index });
    }

    Ok(())
}

/// Keys copied from a provider's credentials Secret into the operand namespace.
#[must_use]
pub fn credentials_projection(provider: ProviderType) -> Projection {
    match provider {
        ProviderType::Aws => Projection::select(vec![
            KeyMapping::keep("aws_access_key_id"),
            KeyMapping::keep("aws_secret_access_key"),
            KeyMapping::keep(AWS_SHARED_CREDENTIALS_KEY),
        ])
        .require_any([
            vec!["aws_access_key_id", "aws_secret_access_key"],
            vec![AWS_SHARED_CREDENTIALS_KEY],
        ]),
        ProviderType::Azure => {
            Projection::select(vec![KeyMapping::keep("azure.json")]).require(["azure.json"])
        }
        ProviderType::Gcp => Projection::select(vec![KeyMapping::rename(
            "service_account.json",
            "gcp-credentials.json",
        )])
        .require(["service_account.json"]),
        ProviderType::Infoblox => Projection::select(vec![
            KeyMapping::keep("EXTERNAL_DNS_INFOBLOX_WAPI_USERNAME"),
            KeyMapping::keep("EXTERNAL_DNS_INFOBLOX_WAPI_PASSWORD"),
        ])
        .require([
            "EXTERNAL_DNS_INFOBLOX_WAPI_USERNAME",
            "EXTERNAL_DNS_INFOBLOX_WAPI_PASSWORD",
        ]),
        ProviderType::BlueCat => {
            Projection::select(vec![KeyMapping::keep("bluecat.json")]).require(["bluecat.json"])
        }
    }
}

/// Mirror of the credentials Secret referenced by `extdns`, if any.
///
/// The target is owned by the `ExternalDNS`, so deleting the resource garbage-collects
/// its copy of the credentials.
#[must_use]
pub fn credentials_mirror(config: &OperatorConfig, extdns: &ExternalDNS) -> Option<MirrorSpec> {
    let credentials = extdns.spec.provider.credentials.as_ref()?;
    let mirror_config = MirrorConfig {
        source_namespace: config.operator_namespace.clone(),
        target_namespace: config.operand_namespace.clone(),
        source_name: credentials.name.clone(),
        target_name: TargetNameRule::Fixed(credentials_secret_name(&extdns.name_any())),
    };
    let spec = MirrorSpec::from_config(
        MirrorKind::Secret,
        &mirror_config,
        credentials_projection(extdns.spec.provider.r#type),
    );
    Some(spec.with_owner(build_owner_reference(extdns)))
}

/// Whether `extdns` reads its credentials from the Secret at `key`.
#[must_use]
pub fn references_secret(config: &OperatorConfig, extdns: &ExternalDNS, key: &ObjectKey) -> bool {
    key.namespace == config.operator_namespace
        && extdns
            .spec
            .provider
            .credentials
            .as_ref()
            .is_some_and(|c| c.name == key.name)
}

/// Reconciles an `ExternalDNS` resource.
///
/// # Errors
///
/// Returns an error if mirroring the credentials, applying the operand or writing the
/// status fails. The controller's error policy requeues the resource.
pub async fn reconcile_externaldns(extdns: Arc<ExternalDNS>, ctx: Arc<Context>) -> Result<Action> {
    let name = extdns.name_any();
    let generation = extdns.metadata.generation;
    let config = &ctx.config;

    info!("Reconciling ExternalDNS: {}", name);
    debug!(
        name = %name,
        generation = ?generation,
        provider = %extdns.spec.provider.r#type,
        source = ?extdns.spec.source.r#type,
        zones = extdns.spec.zones.len(),
        "Starting ExternalDNS reconciliation"
    );

    let mut status = ExternalDNSStatusUpdater::new(&extdns);
    status.set_observed_generation(generation);

    if let Err(e) = validate(&extdns.spec) {
        warn!("ExternalDNS {} has an invalid spec: {}", name, e);
        status.set_degraded(REASON_INVALID_SPEC, &e.to_string());
        status.apply(&ctx.client).await?;
        return Ok(Action::await_change());
    }

    let store = KubeStore::new(ctx.client.clone());

    let hash = match credentials_mirror(config, &extdns) {
        None => None,
        Some(mirror) => match reconcile_mirror_recorded::<Secret, _>(
            &store,
            &mirror,
            &ctx.metrics,
        )
        .await
        {
            Ok(ReconcileOutcome::SourceAbsent) => {
                let message = format!("credentials secret {} not found", mirror.source);
                warn!("ExternalDNS {}: {}", name, message);
                status.set_degraded(REASON_CREDENTIALS_NOT_FOUND, &message);
                status.apply(&ctx.client).await?;
                return Ok(Action::requeue(Duration::from_secs(
                    DEPENDENCY_REQUEUE_DURATION_SECS,
                )));
            }
            Ok(outcome) => {
                debug!(name = %name, outcome = outcome.as_str(), "Credentials mirrored");
                mirrored_hash(&store, &mirror.target).await?
            }
            Err(e) => {
                status.set_degraded(REASON_CREDENTIALS_MIRROR_FAILED, &e.to_string());
                status.apply(&ctx.client).await?;
                return Err(e).context(format!("failed to mirror credentials for {name}"));
            }
        },
    };

    let trusted_ca = config.trusted_ca_target();
    let settings = OperandSettings {
        namespace: &config.operand_namespace,
        image: &config.external_dns_image,
        trusted_ca_configmap: trusted_ca.as_ref().map(|key| key.name.as_str()),
        credentials_hash: hash.as_deref(),
    };

    if let Err(e) = apply_operand(&ctx, &extdns, &settings).await {
        status.set_degraded(REASON_OPERAND_FAILED, &format!("{e:#}"));
        status.apply(&ctx.client).await?;
        return Err(e);
    }

    status.set_available("ExternalDNS deployment is configured");
    status.set_zones(&extdns.spec.zones);
    status.apply(&ctx.client).await?;

    info!("Successfully reconciled ExternalDNS: {}", name);
    Ok(Action::requeue(Duration::from_secs(
        READY_REQUEUE_DURATION_SECS,
    )))
}

/// Hash of the mirrored credentials payload, `None` if the copy is gone.
async fn mirrored_hash(store: &KubeStore, target: &ObjectKey) -> Result<Option<String>> {
    let secret: Option<Secret> = ObjectStore::<Secret>::get(store, target).await?;
    Ok(secret.map(|s| credentials_hash(&s.payload())))
}

async fn apply_operand(
    ctx: &Context,
    extdns: &ExternalDNS,
    settings: &OperandSettings<'_>,
) -> Result<()> {
    let namespace = settings.namespace;

    let service_account = build_service_account(namespace, extdns);
    create_or_apply(&ctx.client, namespace, &service_account, FIELD_MANAGER)
        .await
        .context("failed to apply operand ServiceAccount")?;

    let deployment = build_deployment(extdns, settings);
    create_or_apply(&ctx.client, namespace, &deployment, FIELD_MANAGER)
        .await
        .context("failed to apply operand Deployment")?;

    Ok(())
}

#[cfg(test)]
#[path = "externaldns_tests.rs"]
mod externaldns_tests;
