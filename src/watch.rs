// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Translation of raw watch events into mirror reconciliation keys.
//!
//! The watcher cannot tell an add from a modify, so both arrive as
//! [`EventType::Applied`]. Neither the reconciler nor the router depends on the
//! distinction: every event for a routed object leads to the same full reconciliation.

use crate::mirror::resource::MirrorResource;
use crate::mirror::{MirrorRegistry, ObjectKey, Side};
use kube::runtime::watcher;

/// Kind of change observed on a watched object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventType {
    /// Object added, modified, or listed during a (re)list.
    Applied,
    Deleted,
}

/// A single object change.
#[derive(Clone, Debug)]
pub struct WatchEvent<K> {
    pub kind: EventType,
    pub object: K,
}

/// Flatten a watcher event; list boundary markers carry no object and are dropped.
#[must_use]
pub fn translate<K>(event: watcher::Event<K>) -> Option<WatchEvent<K>> {
    match event {
        watcher::Event::Apply(object) | watcher::Event::InitApply(object) => Some(WatchEvent {
            kind: EventType::Applied,
            object,
        }),
        watcher::Event::Delete(object) => Some(WatchEvent {
            kind: EventType::Deleted,
            object,
        }),
        watcher::Event::Init | watcher::Event::InitDone => None,
    }
}

/// Source key to reconcile for an event observed on `side`, if the object is mirrored.
///
/// Deletions route exactly like updates: a deleted target is recreated, and a deleted
/// source reconciles to a no-op.
#[must_use]
pub fn route_event<K: MirrorResource>(
    registry: &MirrorRegistry,
    side: Side,
    event: &WatchEvent<K>,
) -> Option<ObjectKey> {
    let key = ObjectKey::from_object(&event.object)?;
    registry.route(K::MIRROR_KIND, side, &key)
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod watch_tests;
