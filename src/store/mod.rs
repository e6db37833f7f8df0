// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Object store capability used by the reconciliation core.
//!
//! The core needs exactly three operations, keyed by `(namespace, name)`:
//!
//! - `get` returns `Ok(None)` when the object does not exist
//! - `create` writes a new object
//! - `update` replaces an existing object (optimistic concurrency via `resourceVersion`)
//!
//! [`KubeStore`] implements them against the Kubernetes API; [`memory::MemoryStore`]
//! is an in-process implementation used by tests.

pub mod memory;

use crate::constants::FIELD_MANAGER;
use crate::errors::{StoreError, StoreOperation};
use crate::mirror::resource::MirrorResource;
use crate::mirror::ObjectKey;
use async_trait::async_trait;
use kube::api::PostParams;
use kube::{Api, Client, Resource};
use tracing::debug;

/// Get/Create/Update capability over objects of type `K`.
#[async_trait]
pub trait ObjectStore<K: MirrorResource>: Send + Sync {
    /// Fetch an object, `Ok(None)` if it does not exist.
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError>;

    /// Create a new object.
    async fn create(&self, obj: &K) -> Result<K, StoreError>;

    /// Replace an existing object.
    async fn update(&self, obj: &K) -> Result<K, StoreError>;
}

/// Identity of an object about to be written.
pub(crate) fn key_of<K: MirrorResource>(obj: &K) -> Result<ObjectKey, StoreError> {
    let meta = obj.meta();
    match (&meta.namespace, &meta.name) {
        (Some(namespace), Some(name)) => Ok(ObjectKey::new(namespace, name)),
        _ => Err(StoreError::MissingName {
            kind: K::MIRROR_KIND.as_str(),
        }),
    }
}

/// [`ObjectStore`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: MirrorResource>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl<K: MirrorResource> ObjectStore<K> for KubeStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError> {
        debug!(kind = K::MIRROR_KIND.as_str(), key = %key, "Fetching object");
        self.api::<K>(&key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(|source| StoreError::Api {
                operation: StoreOperation::Get,
                kind: K::MIRROR_KIND.as_str(),
                key: key.clone(),
                source,
            })
    }

    async fn create(&self, obj: &K) -> Result<K, StoreError> {
        let key = key_of(obj)?;
        self.api::<K>(&key.namespace)
            .create(&post_params(), obj)
            .await
            .map_err(|source| StoreError::Api {
                operation: StoreOperation::Create,
                kind: K::MIRROR_KIND.as_str(),
                key,
                source,
            })
    }

    async fn update(&self, obj: &K) -> Result<K, StoreError> {
        let key = key_of(obj)?;
        self.api::<K>(&key.namespace)
            .replace(&key.name, &post_params(), obj)
            .await
            .map_err(|source| StoreError::Api {
                operation: StoreOperation::Update,
                kind: K::MIRROR_KIND.as_str(),
                key,
                source,
            })
    }
}
