// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Keyed work queue with coalescing, per-key serialization and retry backoff.
//!
//! Producers (watch streams) push keys through a bounded channel; a full buffer makes
//! the producer wait. A single [`WorkQueue::run`] loop owns all scheduling state, so no
//! lock is ever held across a reconciliation.
//!
//! # Scheduling rules
//!
//! - A key already waiting to run is not queued twice.
//! - A key that arrives while it is running is marked dirty and runs exactly once more
//!   after the current run completes.
//! - At most `workers` distinct keys run at the same time; one key never runs twice
//!   at the same time.
//! - A failed key is re-delivered after its own exponential backoff; success resets it.
//!   There is no retry limit.
//!
//! # Shutdown
//!
//! Once every [`QueueHandle`] is dropped, the loop finishes pending, in-flight and
//! scheduled retries, then returns. Failures after that point are logged and not
//! rescheduled, so shutdown always terminates.

use crate::reconcilers::retry::{queue_backoff, ExponentialBackoff};
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use prometheus::IntGauge;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Returned by [`QueueHandle::enqueue`] once the queue has stopped.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("work queue is closed")]
pub struct QueueClosed;

/// Cloneable producer side of a [`WorkQueue`].
#[derive(Debug)]
pub struct QueueHandle<K> {
    tx: mpsc::Sender<K>,
}

impl<K> Clone for QueueHandle<K> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<K> QueueHandle<K> {
    /// Request a reconciliation of `key`, waiting while the buffer is full.
    ///
    /// # Errors
    ///
    /// Returns [`QueueClosed`] if the queue loop has exited.
    pub async fn enqueue(&self, key: K) -> Result<(), QueueClosed> {
        self.tx.send(key).await.map_err(|_| QueueClosed)
    }
}

/// Consumer side: owns the channel receiver and all scheduling state.
pub struct WorkQueue<K> {
    rx: mpsc::Receiver<K>,
    workers: usize,
    name: &'static str,
    depth: Option<IntGauge>,
}

/// Scheduling state, kept apart from the receiver so the run loop can borrow both.
struct State<K> {
    pending: VecDeque<K>,
    queued: HashSet<K>,
    running: HashSet<K>,
    dirty: HashSet<K>,
    /// Keys waiting on a retry timer, with the generation of their latest timer.
    waiting: HashMap<K, u64>,
    backoffs: HashMap<K, ExponentialBackoff>,
    generation: u64,
}

impl<K: Clone + Eq + Hash> State<K> {
    fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            queued: HashSet::new(),
            running: HashSet::new(),
            dirty: HashSet::new(),
            waiting: HashMap::new(),
            backoffs: HashMap::new(),
            generation: 0,
        }
    }

    /// Schedule `key` for a run as soon as a worker is free.
    fn offer(&mut self, key: K) {
        if self.running.contains(&key) {
            self.dirty.insert(key);
            return;
        }
        if self.queued.contains(&key) {
            return;
        }
        // A fresh request supersedes any scheduled retry.
        self.waiting.remove(&key);
        self.queued.insert(key.clone());
        self.pending.push_back(key);
    }

    fn next_ready(&mut self) -> Option<K> {
        let key = self.pending.pop_front()?;
        self.queued.remove(&key);
        self.running.insert(key.clone());
        Some(key)
    }

    fn retry_delay(&mut self, key: &K) -> Duration {
        let backoff = self
            .backoffs
            .entry(key.clone())
            .or_insert_with(queue_backoff);
        backoff.next_backoff().unwrap_or(backoff.max_interval)
    }

    fn schedule_retry(&mut self, key: K) -> u64 {
        self.generation += 1;
        self.waiting.insert(key, self.generation);
        self.generation
    }
}

async fn tagged<K, Fut, E>(key: K, fut: Fut) -> (K, Result<(), E>)
where
    Fut: Future<Output = Result<(), E>>,
{
    (key, fut.await)
}

async fn delayed<K>(key: K, generation: u64, delay: Duration) -> (K, u64) {
    tokio::time::sleep(delay).await;
    (key, generation)
}

impl<K> WorkQueue<K>
where
    K: Clone + Eq + Hash + Display + Send + 'static,
{
    /// Create a queue with a `capacity`-sized buffer and `workers` concurrent slots.
    ///
    /// Both values are clamped to at least 1.
    #[must_use]
    pub fn new(name: &'static str, capacity: usize, workers: usize) -> (QueueHandle<K>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let queue = Self {
            rx,
            workers: workers.max(1),
            name,
            depth: None,
        };
        (QueueHandle { tx }, queue)
    }

    /// Report the number of keys waiting for a worker to `gauge`.
    #[must_use]
    pub fn with_depth_gauge(mut self, gauge: IntGauge) -> Self {
        self.depth = Some(gauge);
        self
    }

    /// Drive `reconcile` for every key delivered to the queue until shutdown.
    pub async fn run<F, Fut, E>(mut self, reconcile: F)
    where
        F: Fn(K) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        let mut state: State<K> = State::new();
        let mut in_flight = FuturesUnordered::new();
        let mut timers: FuturesUnordered<BoxFuture<'static, (K, u64)>> = FuturesUnordered::new();
        let mut open = true;

        loop {
            while in_flight.len() < self.workers {
                let Some(key) = state.next_ready() else {
                    break;
                };
                in_flight.push(tagged(key.clone(), reconcile(key)));
            }
            if let Some(gauge) = &self.depth {
                gauge.set(i64::try_from(state.pending.len()).unwrap_or(i64::MAX));
            }

            if !open && state.pending.is_empty() && in_flight.is_empty() && timers.is_empty() {
                debug!(queue = self.name, "Work queue drained");
                return;
            }

            tokio::select! {
                received = self.rx.recv(), if open => match received {
                    Some(key) => {
                        state.offer(key);
                        // Take whatever else is already buffered so duplicates coalesce
                        // before any of them is dispatched.
                        while let Ok(key) = self.rx.try_recv() {
                            state.offer(key);
                        }
                    }
                    None => {
                        debug!(queue = self.name, "All queue handles dropped, draining");
                        open = false;
                    }
                },
                Some((key, result)) = in_flight.next(), if !in_flight.is_empty() => {
                    state.running.remove(&key);
                    let rerun = state.dirty.remove(&key);
                    match result {
                        Ok(()) => {
                            state.backoffs.remove(&key);
                        }
                        Err(e) if rerun => {
                            state.retry_delay(&key);
                            warn!(queue = self.name, key = %key, error = %e, "Reconciliation failed, rerunning for newer event");
                        }
                        Err(e) if !open => {
                            warn!(queue = self.name, key = %key, error = %e, "Reconciliation failed during shutdown, not retrying");
                        }
                        Err(e) => {
                            let delay = state.retry_delay(&key);
                            let generation = state.schedule_retry(key.clone());
                            warn!(queue = self.name, key = %key, error = %e, retry_after = ?delay, "Reconciliation failed, will retry");
                            timers.push(delayed(key.clone(), generation, delay).boxed());
                        }
                    }
                    if rerun {
                        state.offer(key);
                    }
                },
                Some((key, generation)) = timers.next(), if !timers.is_empty() => {
                    if state.waiting.get(&key) == Some(&generation) {
                        state.waiting.remove(&key);
                        state.offer(key);
                    }
                },
            }
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod queue_tests;
