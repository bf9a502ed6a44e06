/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use foldhash::fast::FixedState;
use log::warn;

use crate::monitor::{
    BasicCounter, BasicTimer, BucketConfig, BucketTimer, Monitor, MonitorConfig,
    ResettingCounter, TimeUnit, Timer,
};
use crate::registry::MonitorRegistry;
use crate::tag::{
    METRIC_GROUP_BUCKETS, MetricTagMap, TAG_KEY_APPLICATION, TAG_KEY_CLASS,
    TAG_KEY_FULLY_QUALIFIED_CLASS_NAME, TAG_KEY_LINE_NUMBER, TAG_KEY_METRIC_GROUP,
    TAG_KEY_SUBSYSTEM,
};

type MonitorTable<T> = Mutex<HashMap<MonitorConfig, Arc<T>, FixedState>>;

fn new_table<T: ?Sized>() -> MonitorTable<T> {
    Mutex::new(HashMap::with_hasher(FixedState::with_seed(0)))
}

/// Creates counters and timers, registering each distinct one exactly once.
///
/// A second request for the same name and tags logs a warning and returns the
/// instance created by the first request. Under concurrent requests the first
/// insertion into the table wins and every caller gets that instance.
pub struct MetricObjects {
    registry: Arc<dyn MonitorRegistry>,
    basic_counters: MonitorTable<BasicCounter>,
    resetting_counters: MonitorTable<ResettingCounter>,
    timers: MonitorTable<dyn Timer>,
    duplicate_count: AtomicU64,
}

impl MetricObjects {
    pub fn new(registry: Arc<dyn MonitorRegistry>) -> Self {
        MetricObjects {
            registry,
            basic_counters: new_table(),
            resetting_counters: new_table(),
            timers: new_table(),
            duplicate_count: AtomicU64::new(0),
        }
    }

    /// How many registration requests returned an existing instance.
    pub fn duplicate_count(&self) -> u64 {
        self.duplicate_count.load(Ordering::Relaxed)
    }

    pub fn register_counter(
        &self,
        subsystem: &str,
        application: &str,
        class: &str,
        name: &str,
    ) -> Arc<BasicCounter> {
        let config = MonitorConfig::with_tags(name, standard_tags(subsystem, application, class));
        self.register_once(&self.basic_counters, "Counter", config, |config| {
            let counter = Arc::new(BasicCounter::new(config));
            let monitor: Arc<dyn Monitor> = counter.clone();
            (counter, monitor)
        })
    }

    pub fn register_resetting_counter(
        &self,
        subsystem: &str,
        application: &str,
        class: &str,
        name: &str,
    ) -> Arc<ResettingCounter> {
        let config = MonitorConfig::with_tags(name, standard_tags(subsystem, application, class));
        self.register_resetting(config)
    }

    /// Register a resetting counter for errors seen at one call site.
    pub fn register_error_counter(
        &self,
        metric_group: &str,
        subsystem: &str,
        fully_qualified_class_name: &str,
        line_number: &str,
        name: &str,
    ) -> Arc<ResettingCounter> {
        let tags = MetricTagMap::default()
            .with_tag(TAG_KEY_METRIC_GROUP, metric_group)
            .with_tag(TAG_KEY_LINE_NUMBER, line_number)
            .with_tag(TAG_KEY_SUBSYSTEM, subsystem)
            .with_tag(TAG_KEY_FULLY_QUALIFIED_CLASS_NAME, fully_qualified_class_name);
        self.register_resetting(MonitorConfig::with_tags(name, tags))
    }

    fn register_resetting(&self, config: MonitorConfig) -> Arc<ResettingCounter> {
        self.register_once(&self.resetting_counters, "Counter", config, |config| {
            let counter = Arc::new(ResettingCounter::new(config));
            let monitor: Arc<dyn Monitor> = counter.clone();
            (counter, monitor)
        })
    }

    pub fn register_basic_timer(
        &self,
        subsystem: &str,
        application: &str,
        class: &str,
        name: &str,
        unit: TimeUnit,
    ) -> Arc<dyn Timer> {
        let config = MonitorConfig::with_tags(name, standard_tags(subsystem, application, class));
        self.register_once(&self.timers, "Timer", config, |config| {
            let timer = Arc::new(BasicTimer::new(config, unit));
            let monitor: Arc<dyn Monitor> = timer.clone();
            (timer as Arc<dyn Timer>, monitor)
        })
    }

    pub fn register_bucket_timer(
        &self,
        subsystem: &str,
        application: &str,
        name: &str,
        unit: TimeUnit,
        buckets: &[u64],
    ) -> Arc<dyn Timer> {
        let tags = MetricTagMap::default()
            .with_tag(TAG_KEY_METRIC_GROUP, METRIC_GROUP_BUCKETS)
            .with_tag(TAG_KEY_SUBSYSTEM, subsystem)
            .with_tag(TAG_KEY_APPLICATION, application);
        let config = MonitorConfig::with_tags(name, tags);
        self.register_once(&self.timers, "Timer", config, |config| {
            let timer = Arc::new(BucketTimer::new(config, BucketConfig::new(buckets), unit));
            let monitor: Arc<dyn Monitor> = timer.clone();
            (timer as Arc<dyn Timer>, monitor)
        })
    }

    fn register_once<T, F>(
        &self,
        table: &MonitorTable<T>,
        kind: &str,
        config: MonitorConfig,
        create: F,
    ) -> Arc<T>
    where
        T: fmt::Debug + ?Sized,
        F: FnOnce(MonitorConfig) -> (Arc<T>, Arc<dyn Monitor>),
    {
        let mut ht = table.lock().unwrap();
        match ht.entry(config) {
            Entry::Occupied(o) => {
                let existing = Arc::clone(o.get());
                drop(ht);
                self.duplicate_count.fetch_add(1, Ordering::Relaxed);
                warn!("The {kind} {existing:?} has already been registered");
                existing
            }
            Entry::Vacant(v) => {
                let (created, monitor) = create(v.key().clone());
                v.insert(Arc::clone(&created));
                drop(ht);
                self.registry.register(monitor);
                created
            }
        }
    }
}

fn standard_tags(subsystem: &str, application: &str, class: &str) -> MetricTagMap {
    MetricTagMap::default()
        .with_tag(TAG_KEY_SUBSYSTEM, subsystem)
        .with_tag(TAG_KEY_APPLICATION, application)
        .with_tag(TAG_KEY_CLASS, class)
}
