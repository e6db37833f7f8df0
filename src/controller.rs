// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Controller wiring: watch streams in, reconciliations out.
//!
//! Two kinds of controller run side by side:
//!
//! - [`run_mirror_controller`] drives the statically configured mirrors of one
//!   resource kind. One watcher is opened per distinct `(side, namespace)`; their
//!   events are routed to source keys and pumped into a [`WorkQueue`], whose workers
//!   call [`reconcile_mirror`](crate::reconcilers::reconcile_mirror) against the API server.
//! - [`run_externaldns_controller`] is a `kube::runtime::Controller` over the
//!   cluster-scoped `ExternalDNS` resource. It owns the operand objects and watches
//!   Secrets in the operator and operand namespaces.

use crate::constants::{ERROR_REQUEUE_DURATION_SECS, KIND_EXTERNAL_DNS};
use crate::context::Context;
use crate::crd::ExternalDNS;
use crate::errors::MirrorError;
use crate::health::HealthState;
use crate::mirror::resource::MirrorResource;
use crate::mirror::{ObjectKey, Side};
use crate::queue::WorkQueue;
use crate::reconcilers::externaldns::reconcile_externaldns;
use crate::reconcilers::mirror::reconcile_mirror_recorded;
use crate::selector::find_externaldns_for_secret;
use crate::store::KubeStore;
use crate::watch::{route_event, translate};
use anyhow::Result;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Secret, ServiceAccount};
use kube::runtime::controller::Action;
use kube::runtime::reflector::Store;
use kube::runtime::{watcher, Controller, WatchStreamExt};
use kube::{Api, ResourceExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Error returned to the controller runtime.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ReconcileError(#[from] anyhow::Error);

/// Run the mirror controller for resource kind `K` until its watches end.
///
/// Returns only once every watch stream has ended and the queue has drained. With no
/// mirror of kind `K` configured there is nothing to watch, and the controller idles.
///
/// # Errors
///
/// Currently infallible; the signature matches the other controllers.
pub async fn run_mirror_controller<K: MirrorResource>(ctx: Arc<Context>) -> Result<()> {
    let kind = K::MIRROR_KIND.as_str();

    if ctx.registry.mirrors_of(K::MIRROR_KIND).next().is_none() {
        info!("No {} mirrors configured, {} mirror controller idle", kind, kind);
        std::future::pending::<()>().await;
        return Ok(());
    }

    info!("Starting {} mirror controller", kind);

    let mut streams: Vec<BoxStream<'static, ObjectKey>> = Vec::new();
    for side in [Side::Source, Side::Target] {
        for namespace in ctx.registry.namespaces(K::MIRROR_KIND, side) {
            debug!(kind, namespace = %namespace, side = ?side, "Opening mirror watch");
            streams.push(routed_keys::<K>(&ctx, side, &namespace));
        }
    }
    let mut keys = stream::select_all(streams);

    let (handle, queue) = WorkQueue::new(kind, ctx.config.queue_capacity, ctx.config.workers);
    let queue = queue.with_depth_gauge(ctx.metrics.queue_depth(kind));

    let pump = async move {
        while let Some(key) = keys.next().await {
            if handle.enqueue(key).await.is_err() {
                break;
            }
        }
        debug!(kind, "Mirror watch streams ended");
    };

    let store = KubeStore::new(ctx.client.clone());
    let workers = queue.run(|source: ObjectKey| {
        let ctx = ctx.clone();
        let store = store.clone();
        async move { reconcile_source::<K>(&ctx, &store, &source).await }
    });

    tokio::join!(pump, workers);
    Ok(())
}

/// Watch `namespace` as `side` and yield the source key of every routed event.
fn routed_keys<K: MirrorResource>(
    ctx: &Context,
    side: Side,
    namespace: &str,
) -> BoxStream<'static, ObjectKey> {
    let api: Api<K> = Api::namespaced(ctx.client.clone(), namespace);
    let registry = ctx.registry.clone();
    let namespace = namespace.to_string();

    watcher(api, watcher::Config::default())
        .default_backoff()
        .filter_map(move |event| {
            let routed = match event {
                Ok(event) => translate(event).and_then(|e| route_event(&registry, side, &e)),
                Err(e) => {
                    warn!(
                        kind = K::MIRROR_KIND.as_str(),
                        namespace = %namespace,
                        error = %e,
                        "Mirror watch error"
                    );
                    None
                }
            };
            futures::future::ready(routed)
        })
        .boxed()
}

/// Reconcile one mirror source and record the outcome.
async fn reconcile_source<K: MirrorResource>(
    ctx: &Context,
    store: &KubeStore,
    source: &ObjectKey,
) -> Result<(), MirrorError> {
    let kind = K::MIRROR_KIND.as_str();
    let Some(mirror) = ctx.registry.get(K::MIRROR_KIND, source) else {
        debug!(kind, source = %source, "Key is not a registered mirror source");
        return Ok(());
    };

    reconcile_mirror_recorded::<K, _>(store, mirror, &ctx.metrics)
        .await
        .map(|_| ())
}

/// Run the `ExternalDNS` controller
///
/// # Errors
///
/// Currently infallible; the controller runs until its watches end.
pub async fn run_externaldns_controller(ctx: Arc<Context>) -> Result<()> {
    info!("Starting ExternalDNS controller");

    let client = ctx.client.clone();
    let config = ctx.config.clone();
    let api = Api::<ExternalDNS>::all(client.clone());
    let deployments = Api::<Deployment>::namespaced(client.clone(), &config.operand_namespace);
    let service_accounts =
        Api::<ServiceAccount>::namespaced(client.clone(), &config.operand_namespace);
    let operator_secrets = Api::<Secret>::namespaced(client.clone(), &config.operator_namespace);
    let operand_secrets = Api::<Secret>::namespaced(client.clone(), &config.operand_namespace);

    let controller = Controller::new(api, watcher::Config::default());
    let store = controller.store();

    let readiness = mark_ready_once_synced(store.clone(), ctx.health.clone());
    let source_store = store.clone();
    let source_config = config.clone();
    let target_store = store;
    let target_config = config;

    let run = controller
        .owns(deployments, watcher::Config::default())
        .owns(service_accounts, watcher::Config::default())
        .watches(operator_secrets, watcher::Config::default(), move |secret| {
            find_externaldns_for_secret(&source_store, &source_config, &secret)
        })
        .watches(operand_secrets, watcher::Config::default(), move |secret| {
            find_externaldns_for_secret(&target_store, &target_config, &secret)
        })
        .run(reconcile_externaldns_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()));

    tokio::join!(readiness, run);
    Ok(())
}

/// Mark the operator ready once the initial `ExternalDNS` list has been cached.
async fn mark_ready_once_synced(store: Store<ExternalDNS>, health: Arc<HealthState>) {
    match store.wait_until_ready().await {
        Ok(()) => health.mark_started(),
        Err(e) => warn!(error = %e, "ExternalDNS cache stopped before its initial sync"),
    }
}

/// Reconcile wrapper for `ExternalDNS`
async fn reconcile_externaldns_wrapper(
    extdns: Arc<ExternalDNS>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let name = extdns.name_any();

    match reconcile_externaldns(extdns, ctx.clone()).await {
        Ok(action) => {
            ctx.metrics
                .record_reconciliation(KIND_EXTERNAL_DNS, "success", start.elapsed());
            Ok(action)
        }
        Err(e) => {
            error!("Failed to reconcile ExternalDNS {}: {:#}", name, e);
            ctx.metrics
                .record_error(KIND_EXTERNAL_DNS, "reconcile_error", start.elapsed());
            Err(e.into())
        }
    }
}

/// Error policy for the `ExternalDNS` controller
fn error_policy(extdns: Arc<ExternalDNS>, err: &ReconcileError, ctx: Arc<Context>) -> Action {
    debug!(
        name = %extdns.name_any(),
        error = %err,
        "Requeueing ExternalDNS after error"
    );
    ctx.metrics.record_requeue(KIND_EXTERNAL_DNS, "error");
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
