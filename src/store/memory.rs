// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`ObjectStore`] for tests and local experiments.
//!
//! Behaves like the API server where the core can observe it: `get` of a missing
//! object is `Ok(None)`, `create` of an existing object fails, and `update` with a stale
//! `resourceVersion` fails with a conflict. Every call is counted, and failures can be
//! injected per operation.

use super::{key_of, ObjectStore};
use crate::errors::{StoreError, StoreOperation};
use crate::mirror::resource::MirrorResource;
use crate::mirror::ObjectKey;
use async_trait::async_trait;
use kube::Resource;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct Inner<K> {
    objects: BTreeMap<ObjectKey, K>,
    gets: usize,
    creates: usize,
    updates: usize,
    injected: VecDeque<StoreOperation>,
    next_version: u64,
}

impl<K> Default for Inner<K> {
    fn default() -> Self {
        Self {
            objects: BTreeMap::new(),
            gets: 0,
            creates: 0,
            updates: 0,
            injected: VecDeque::new(),
            next_version: 1,
        }
    }
}

impl<K> Inner<K> {
    fn bump_version(&mut self) -> String {
        let version = self.next_version;
        self.next_version += 1;
        version.to_string()
    }

    /// Consume an injected failure for `op`, if one is queued first in line.
    fn take_failure(&mut self, op: StoreOperation) -> bool {
        if self.injected.front() == Some(&op) {
            self.injected.pop_front();
            true
        } else {
            false
        }
    }
}

/// Shared, cloneable in-memory object store.
#[derive(Clone)]
pub struct MemoryStore<K> {
    inner: Arc<Mutex<Inner<K>>>,
}

impl<K> Default for MemoryStore<K> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }
}

impl<K: MirrorResource> MemoryStore<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write an object as an external actor would, bypassing the counters.
    ///
    /// Objects without a name or namespace are ignored.
    pub fn insert(&self, mut obj: K) {
        let Ok(key) = key_of(&obj) else {
            return;
        };
        let mut inner = self.lock();
        obj.meta_mut().resource_version = Some(inner.bump_version());
        inner.objects.insert(key, obj);
    }

    /// Delete an object as an external actor would.
    pub fn remove(&self, key: &ObjectKey) -> Option<K> {
        self.lock().objects.remove(key)
    }

    /// Current copy of an object, bypassing the counters.
    #[must_use]
    pub fn object(&self, key: &ObjectKey) -> Option<K> {
        self.lock().objects.get(key).cloned()
    }

    /// Make the next call of `op` fail with [`StoreError::Unavailable`].
    ///
    /// Injected failures are consumed in FIFO order.
    pub fn fail_next(&self, op: StoreOperation) {
        self.lock().injected.push_back(op);
    }

    #[must_use]
    pub fn gets(&self) -> usize {
        self.lock().gets
    }

    #[must_use]
    pub fn creates(&self) -> usize {
        self.lock().creates
    }

    #[must_use]
    pub fn updates(&self) -> usize {
        self.lock().updates
    }

    /// Total number of mutating calls (creates + updates), failed ones included.
    #[must_use]
    pub fn writes(&self) -> usize {
        let inner = self.lock();
        inner.creates + inner.updates
    }
}

fn injected(op: StoreOperation, key: &ObjectKey, kind: &'static str) -> StoreError {
    StoreError::Unavailable {
        operation: op,
        kind,
        key: key.clone(),
        reason: "injected failure".to_string(),
    }
}

#[async_trait]
impl<K: MirrorResource> ObjectStore<K> for MemoryStore<K> {
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError> {
        let mut inner = self.lock();
        inner.gets += 1;
        if inner.take_failure(StoreOperation::Get) {
            return Err(injected(StoreOperation::Get, key, K::MIRROR_KIND.as_str()));
        }
        Ok(inner.objects.get(key).cloned())
    }

    async fn create(&self, obj: &K) -> Result<K, StoreError> {
        let key = key_of(obj)?;
        let mut inner = self.lock();
        inner.creates += 1;
        if inner.take_failure(StoreOperation::Create) {
            return Err(injected(StoreOperation::Create, &key, K::MIRROR_KIND.as_str()));
        }
        if inner.objects.contains_key(&key) {
            return Err(StoreError::Unavailable {
                operation: StoreOperation::Create,
                kind: K::MIRROR_KIND.as_str(),
                key,
                reason: "AlreadyExists".to_string(),
            });
        }
        let mut stored = obj.clone();
        stored.meta_mut().resource_version = Some(inner.bump_version());
        inner.objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn update(&self, obj: &K) -> Result<K, StoreError> {
        let key = key_of(obj)?;
        let mut inner = self.lock();
        inner.updates += 1;
        if inner.take_failure(StoreOperation::Update) {
            return Err(injected(StoreOperation::Update, &key, K::MIRROR_KIND.as_str()));
        }
        let Some(current) = inner.objects.get(&key) else {
            return Err(StoreError::NotFound {
                kind: K::MIRROR_KIND.as_str(),
                key,
            });
        };
        let sent_version = obj.meta().resource_version.as_ref();
        if sent_version.is_some() && sent_version != current.meta().resource_version.as_ref() {
            return Err(StoreError::Unavailable {
                operation: StoreOperation::Update,
                kind: K::MIRROR_KIND.as_str(),
                key,
                reason: "Conflict: resourceVersion is stale".to_string(),
            });
        }
        let mut stored = obj.clone();
        stored.meta_mut().resource_version = Some(inner.bump_version());
        inner.objects.insert(key, stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod memory_tests;
