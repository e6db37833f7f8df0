// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `controller.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use kube::runtime::reflector;

    #[tokio::test]
    async fn test_not_ready_until_initial_list_completes() {
        let (store, mut writer) = reflector::store::<ExternalDNS>();
        let health = Arc::new(HealthState::new());

        let readiness = tokio::spawn(mark_ready_once_synced(store, health.clone()));
        writer.apply_watcher_event(&watcher::Event::Init);
        tokio::task::yield_now().await;
        assert!(!health.is_started());

        writer.apply_watcher_event(&watcher::Event::InitDone);
        readiness.await.unwrap();
        assert!(health.is_started());
    }

    #[tokio::test]
    async fn test_dropped_cache_never_marks_ready() {
        let (store, writer) = reflector::store::<ExternalDNS>();
        let health = Arc::new(HealthState::new());

        drop(writer);
        mark_ready_once_synced(store, health.clone()).await;

        assert!(!health.is_started());
    }
}
