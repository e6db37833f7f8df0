// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `queue.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::Semaphore;

    type Counts = Arc<Mutex<HashMap<String, usize>>>;

    fn bump(counts: &Counts, key: &str) -> usize {
        let mut counts = counts.lock().unwrap();
        let count = counts.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    fn count(counts: &Counts, key: &str) -> usize {
        counts.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    #[tokio::test]
    async fn test_pending_duplicates_coalesce() {
        let (handle, queue) = WorkQueue::<String>::new("test", 16, 2);
        for key in ["a", "a", "a", "b", "a"] {
            handle.enqueue(key.to_string()).await.unwrap();
        }
        drop(handle);

        let counts: Counts = Arc::default();
        let recorded = counts.clone();
        queue
            .run(move |key: String| {
                let recorded = recorded.clone();
                async move {
                    bump(&recorded, &key);
                    Ok::<(), String>(())
                }
            })
            .await;

        assert_eq!(count(&counts, "a"), 1);
        assert_eq!(count(&counts, "b"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_buffer_blocks_producer() {
        let (handle, queue) = WorkQueue::<String>::new("test", 2, 1);
        handle.enqueue("a".to_string()).await.unwrap();
        handle.enqueue("b".to_string()).await.unwrap();

        let third = tokio::time::timeout(Duration::from_secs(1), handle.enqueue("c".to_string()));
        assert!(third.await.is_err(), "third enqueue should wait for buffer space");

        // Once the queue runs, the buffer drains and the producer proceeds.
        let counts: Counts = Arc::default();
        let recorded = counts.clone();
        let produce = async move {
            handle.enqueue("c".to_string()).await.unwrap();
        };
        let consume = queue.run(move |key: String| {
            let recorded = recorded.clone();
            async move {
                bump(&recorded, &key);
                Ok::<(), String>(())
            }
        });
        tokio::join!(produce, consume);

        for key in ["a", "b", "c"] {
            assert_eq!(count(&counts, key), 1, "{key}");
        }
    }

    #[tokio::test]
    async fn test_event_during_run_triggers_exactly_one_rerun() {
        let (handle, queue) = WorkQueue::<String>::new("test", 16, 2);
        let counts: Counts = Arc::default();
        let gate = Arc::new(Semaphore::new(0));

        let recorded = counts.clone();
        let permits = gate.clone();
        let runner = tokio::spawn(queue.run(move |key: String| {
            let recorded = recorded.clone();
            let permits = permits.clone();
            async move {
                bump(&recorded, &key);
                permits.acquire().await.map(|p| p.forget()).map_err(|e| e.to_string())
            }
        }));

        handle.enqueue("a".to_string()).await.unwrap();
        wait_until(|| count(&counts, "a") == 1).await;

        // Three notifications while the first run is blocked collapse into one rerun.
        for _ in 0..3 {
            handle.enqueue("a".to_string()).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count(&counts, "a"), 1, "same key must not run concurrently");

        gate.add_permits(2);
        drop(handle);
        runner.await.unwrap();

        assert_eq!(count(&counts, "a"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_limit_bounds_concurrency() {
        let (handle, queue) = WorkQueue::<String>::new("test", 16, 2);
        for key in ["a", "b", "c", "d", "e"] {
            handle.enqueue(key.to_string()).await.unwrap();
        }
        drop(handle);

        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let total = Arc::new(AtomicUsize::new(0));
        let (a, p, t) = (active.clone(), peak.clone(), total.clone());

        queue
            .run(move |_key: String| {
                let (active, peak, total) = (a.clone(), p.clone(), t.clone());
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    total.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), String>(())
                }
            })
            .await;

        assert_eq!(total.load(Ordering::SeqCst), 5);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_key_is_retried_with_backoff() {
        let (handle, queue) = WorkQueue::<String>::new("test", 16, 1);
        let counts: Counts = Arc::default();

        let recorded = counts.clone();
        let runner = tokio::spawn(queue.run(move |key: String| {
            let recorded = recorded.clone();
            async move {
                if bump(&recorded, &key) < 3 {
                    Err("store unavailable".to_string())
                } else {
                    Ok(())
                }
            }
        }));

        let started = tokio::time::Instant::now();
        handle.enqueue("a".to_string()).await.unwrap();
        wait_until(|| count(&counts, "a") == 3).await;

        // Two retries: ~100ms then ~200ms, each within ±10%.
        assert!(started.elapsed() >= Duration::from_millis(270));

        drop(handle);
        runner.await.unwrap();
        assert_eq!(count(&counts, "a"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_key_does_not_block_others() {
        let (handle, queue) = WorkQueue::<String>::new("test", 16, 1);
        let counts: Counts = Arc::default();

        let recorded = counts.clone();
        let runner = tokio::spawn(queue.run(move |key: String| {
            let recorded = recorded.clone();
            async move {
                bump(&recorded, &key);
                if key == "bad" {
                    Err("derivation failed".to_string())
                } else {
                    Ok(())
                }
            }
        }));

        handle.enqueue("bad".to_string()).await.unwrap();
        handle.enqueue("good".to_string()).await.unwrap();
        wait_until(|| count(&counts, "good") == 1 && count(&counts, "bad") >= 2).await;

        drop(handle);
        runner.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_terminates_with_failing_key() {
        let (handle, queue) = WorkQueue::<String>::new("test", 16, 1);
        handle.enqueue("a".to_string()).await.unwrap();
        drop(handle);

        let counts: Counts = Arc::default();
        let recorded = counts.clone();
        queue
            .run(move |key: String| {
                let recorded = recorded.clone();
                async move {
                    bump(&recorded, &key);
                    Err::<(), _>("always failing".to_string())
                }
            })
            .await;

        // Whether the first failure lands before or after the close is observed decides
        // if one retry still runs; either way the loop returns.
        assert!((1..=2).contains(&count(&counts, "a")));
    }

    #[tokio::test]
    async fn test_enqueue_after_queue_stopped_fails() {
        let (handle, queue) = WorkQueue::<String>::new("test", 1, 1);
        drop(queue);

        assert_eq!(handle.enqueue("a".to_string()).await, Err(QueueClosed));
    }

    #[tokio::test]
    async fn test_depth_gauge_reports_zero_after_drain() {
        let gauge = IntGauge::new("test_queue_depth", "test").unwrap();
        let (handle, queue) = WorkQueue::<String>::new("test", 16, 1);
        let queue = queue.with_depth_gauge(gauge.clone());
        handle.enqueue("a".to_string()).await.unwrap();
        drop(handle);

        queue.run(|_key: String| async { Ok::<(), String>(()) }).await;

        assert_eq!(gauge.get(), 0);
    }
}
