/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use super::step::{STATISTIC_COUNT, StepStats};
use super::{DataSourceType, Monitor, MonitorConfig, TimeUnit, Timer};
use crate::metric::Metric;
use crate::tag::TAG_KEY_BUCKET;

const BUCKET_ALL: &str = "all";
const BUCKET_OVERFLOW: &str = "bucket_overflow";

/// Upper boundaries of the buckets, sorted and without duplicates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketConfig {
    buckets: Vec<u64>,
}

impl BucketConfig {
    pub fn new(buckets: &[u64]) -> Self {
        let mut buckets = buckets.to_vec();
        buckets.sort_unstable();
        buckets.dedup();
        BucketConfig { buckets }
    }

    #[inline]
    pub fn buckets(&self) -> &[u64] {
        &self.buckets
    }

    /// Index of the first bucket whose boundary is not below `value`,
    /// or the overflow index.
    fn index_of(&self, value: u64) -> usize {
        self.buckets.partition_point(|b| *b < value)
    }
}

pub struct BucketTimer {
    config: MonitorConfig,
    unit: TimeUnit,
    bucket_config: BucketConfig,
    bucket_names: Vec<String>,
    bucket_counts: Vec<AtomicU64>,
    stats: StepStats,
}

impl BucketTimer {
    pub fn new(config: MonitorConfig, bucket_config: BucketConfig, unit: TimeUnit) -> Self {
        let mut bucket_names: Vec<String> = bucket_config
            .buckets()
            .iter()
            .map(|b| format!("bucket_{b}{}", unit.suffix()))
            .collect();
        bucket_names.push(BUCKET_OVERFLOW.to_string());
        let bucket_counts = bucket_names.iter().map(|_| AtomicU64::new(0)).collect();
        BucketTimer {
            config,
            unit,
            bucket_config,
            bucket_names,
            bucket_counts,
            stats: StepStats::default(),
        }
    }

    #[inline]
    pub fn bucket_config(&self) -> &BucketConfig {
        &self.bucket_config
    }
}

impl Monitor for BucketTimer {
    fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn poll(&self, time: DateTime<Utc>, metrics: &mut Vec<Metric>) {
        let snapshot = self.stats.snapshot();
        let all = self.config.with_additional_tag(TAG_KEY_BUCKET, BUCKET_ALL);
        snapshot.emit(&all, time, metrics);

        for (name, count) in self.bucket_names.iter().zip(&self.bucket_counts) {
            let count = count.swap(0, Ordering::Relaxed);
            let config = self
                .config
                .with_additional_tag(TAG_KEY_BUCKET, name.as_str())
                .with_type_statistic(DataSourceType::Normalized, STATISTIC_COUNT);
            metrics.push(Metric::new(config, time, snapshot.per_second(count)));
        }
    }
}

impl Timer for BucketTimer {
    fn time_unit(&self) -> TimeUnit {
        self.unit
    }

    fn record_value(&self, value: u64) {
        self.stats.record(value);
        let index = self.bucket_config.index_of(value);
        self.bucket_counts[index].fetch_add(1, Ordering::Relaxed);
    }
}

impl fmt::Debug for BucketTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BucketTimer{{config={}, unit={:?}, buckets={:?}}}",
            self.config,
            self.unit,
            self.bucket_config.buckets()
        )
    }
}
