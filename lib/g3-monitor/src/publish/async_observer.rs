/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use flume::{Receiver, Sender, TrySendError};
use log::debug;

use super::MetricObserver;
use crate::metric::Metric;

#[derive(Default, Debug, Eq, PartialEq)]
pub struct AsyncObserverSnapshot {
    pub received: u64,
    pub passed: u64,
    pub overflow: u64,
    pub expired: u64,
    pub closed: u64,
}

#[derive(Default)]
pub struct AsyncObserverStats {
    received: AtomicU64,
    passed: AtomicU64,
    overflow: AtomicU64,
    expired: AtomicU64,
    closed: AtomicU64,
}

impl AsyncObserverStats {
    pub fn snapshot(&self) -> AsyncObserverSnapshot {
        AsyncObserverSnapshot {
            received: self.received.load(Ordering::Relaxed),
            passed: self.passed.load(Ordering::Relaxed),
            overflow: self.overflow.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
        }
    }

    fn add_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    fn add_passed(&self) {
        self.passed.fetch_add(1, Ordering::Relaxed);
    }

    fn add_overflow(&self) {
        self.overflow.fetch_add(1, Ordering::Relaxed);
    }

    fn add_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    fn add_closed(&self) {
        self.closed.fetch_add(1, Ordering::Relaxed);
    }
}

struct MetricBatch {
    enqueued: Instant,
    metrics: Vec<Metric>,
}

/// Hands batches to a wrapped observer on a dedicated thread.
///
/// `update` never blocks. When the queue is full the oldest queued batch is
/// dropped to make room, and batches that waited longer than the expiry are
/// discarded by the worker instead of being published late.
pub struct AsyncMetricObserver {
    name: String,
    sender: Sender<MetricBatch>,
    receiver: Receiver<MetricBatch>,
    stats: Arc<AsyncObserverStats>,
}

impl AsyncMetricObserver {
    pub fn new(
        name: &str,
        observer: Arc<dyn MetricObserver>,
        queue_size: usize,
        expire_time: Duration,
    ) -> io::Result<Self> {
        let (sender, receiver) = flume::bounded::<MetricBatch>(queue_size.max(1));
        let stats = Arc::new(AsyncObserverStats::default());

        let worker = AsyncObserverWorker {
            observer,
            receiver: receiver.clone(),
            expire_time,
            stats: Arc::clone(&stats),
        };
        let _detached_thread = std::thread::Builder::new()
            .name(format!("metric-async-{name}"))
            .spawn(move || worker.run_to_end())?;

        Ok(AsyncMetricObserver {
            name: name.to_string(),
            sender,
            receiver,
            stats,
        })
    }

    pub fn get_stats(&self) -> Arc<AsyncObserverStats> {
        Arc::clone(&self.stats)
    }
}

impl MetricObserver for AsyncMetricObserver {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&self, metrics: Vec<Metric>) {
        self.stats.add_received();

        let mut batch = MetricBatch {
            enqueued: Instant::now(),
            metrics,
        };
        loop {
            match self.sender.try_send(batch) {
                Ok(_) => return,
                Err(TrySendError::Full(b)) => {
                    if self.receiver.try_recv().is_ok() {
                        self.stats.add_overflow();
                    }
                    batch = b;
                }
                Err(TrySendError::Disconnected(_)) => {
                    self.stats.add_closed();
                    return;
                }
            }
        }
    }
}

struct AsyncObserverWorker {
    observer: Arc<dyn MetricObserver>,
    receiver: Receiver<MetricBatch>,
    expire_time: Duration,
    stats: Arc<AsyncObserverStats>,
}

impl AsyncObserverWorker {
    fn run_to_end(self) {
        while let Ok(batch) = self.receiver.recv() {
            if batch.enqueued.elapsed() > self.expire_time {
                self.stats.add_expired();
                continue;
            }
            self.observer.update(batch.metrics);
            self.stats.add_passed();
        }
        debug!("async observer for {} quit", self.observer.name());
    }
}
