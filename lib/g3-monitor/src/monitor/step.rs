/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::{DataSourceType, MonitorConfig};
use crate::metric::Metric;

pub(super) const STATISTIC_COUNT: &str = "count";
pub(super) const STATISTIC_TOTAL_TIME: &str = "totalTime";
pub(super) const STATISTIC_MIN: &str = "min";
pub(super) const STATISTIC_MAX: &str = "max";

pub(super) struct StepSnapshot {
    pub(super) count: u64,
    pub(super) total: u64,
    pub(super) min: u64,
    pub(super) max: u64,
    pub(super) elapsed: Duration,
}

impl StepSnapshot {
    pub(super) fn emit(&self, config: &MonitorConfig, time: DateTime<Utc>, metrics: &mut Vec<Metric>) {
        metrics.push(Metric::new(
            config.with_type_statistic(DataSourceType::Normalized, STATISTIC_COUNT),
            time,
            self.per_second(self.count),
        ));
        metrics.push(Metric::new(
            config.with_type_statistic(DataSourceType::Normalized, STATISTIC_TOTAL_TIME),
            time,
            self.per_second(self.total),
        ));
        metrics.push(Metric::new(
            config.with_type_statistic(DataSourceType::Gauge, STATISTIC_MIN),
            time,
            self.min,
        ));
        metrics.push(Metric::new(
            config.with_type_statistic(DataSourceType::Gauge, STATISTIC_MAX),
            time,
            self.max,
        ));
    }

    pub(super) fn per_second(&self, v: u64) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { v as f64 / secs } else { 0.0 }
    }
}

/// Timer statistics accumulated between two polls.
pub(super) struct StepStats {
    count: AtomicU64,
    total: AtomicU64,
    min: AtomicU64,
    max: AtomicU64,
    last_poll: Mutex<Instant>,
}

impl Default for StepStats {
    fn default() -> Self {
        StepStats {
            count: AtomicU64::new(0),
            total: AtomicU64::new(0),
            min: AtomicU64::new(u64::MAX),
            max: AtomicU64::new(0),
            last_poll: Mutex::new(Instant::now()),
        }
    }
}

impl StepStats {
    pub(super) fn record(&self, v: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(v, Ordering::Relaxed);
        self.min.fetch_min(v, Ordering::Relaxed);
        self.max.fetch_max(v, Ordering::Relaxed);
    }

    pub(super) fn snapshot(&self) -> StepSnapshot {
        let elapsed = {
            let mut last_poll = self.last_poll.lock().unwrap();
            let now = Instant::now();
            let elapsed = now.saturating_duration_since(*last_poll);
            *last_poll = now;
            elapsed
        };

        let count = self.count.swap(0, Ordering::Relaxed);
        let total = self.total.swap(0, Ordering::Relaxed);
        let min = self.min.swap(u64::MAX, Ordering::Relaxed);
        let max = self.max.swap(0, Ordering::Relaxed);
        StepSnapshot {
            count,
            total,
            min: if min == u64::MAX { 0 } else { min },
            max,
            elapsed,
        }
    }
}
