/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

use super::{DataSourceType, Monitor, MonitorConfig};
use crate::metric::Metric;

pub trait Counter: Monitor {
    fn increment(&self) {
        self.increment_by(1);
    }

    fn increment_by(&self, amount: i64);

    /// The current value, without side effects.
    fn value(&self) -> i64;
}

/// A monotonic counter, published as a running total.
///
/// The rate transform in the publishing pipeline turns it into a per second
/// rate when rate publishing is enabled.
#[derive(Debug)]
pub struct BasicCounter {
    config: MonitorConfig,
    count: AtomicI64,
}

impl BasicCounter {
    pub fn new(config: MonitorConfig) -> Self {
        BasicCounter {
            config,
            count: AtomicI64::new(0),
        }
    }
}

impl Monitor for BasicCounter {
    fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn poll(&self, time: DateTime<Utc>, metrics: &mut Vec<Metric>) {
        let config = self.config.with_type(DataSourceType::Counter);
        metrics.push(Metric::new(config, time, self.value()));
    }
}

impl Counter for BasicCounter {
    fn increment_by(&self, amount: i64) {
        self.count.fetch_add(amount, Ordering::Relaxed);
    }

    fn value(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// A counter whose poll returns the count since the previous poll.
///
/// The read and the reset are one atomic swap, so increments racing with a
/// poll are reported by the next poll.
pub struct ResettingCounter {
    config: MonitorConfig,
    count: AtomicI64,
}

impl ResettingCounter {
    pub fn new(config: MonitorConfig) -> Self {
        ResettingCounter {
            config,
            count: AtomicI64::new(0),
        }
    }

    pub fn read(&self) -> i64 {
        self.count.swap(0, Ordering::AcqRel)
    }
}

impl Monitor for ResettingCounter {
    fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn poll(&self, time: DateTime<Utc>, metrics: &mut Vec<Metric>) {
        // not monotonic, so keep it away from the rate transform
        let config = self.config.with_type(DataSourceType::Gauge);
        metrics.push(Metric::new(config, time, self.read()));
    }
}

impl Counter for ResettingCounter {
    fn increment_by(&self, amount: i64) {
        self.count.fetch_add(amount, Ordering::AcqRel);
    }

    fn value(&self) -> i64 {
        self.count.load(Ordering::Acquire)
    }
}

impl PartialEq for ResettingCounter {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config && self.value() == other.value()
    }
}

impl fmt::Debug for ResettingCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ResettingCounter{{config={}, count={}}}",
            self.config,
            self.value()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn config() -> MonitorConfig {
        MonitorConfig::new("RETRIES")
    }

    #[test]
    fn resetting_read() {
        let counter = ResettingCounter::new(config());
        counter.increment_by(5);
        counter.increment_by(3);
        assert_eq!(counter.read(), 8);
        assert_eq!(counter.read(), 0);

        counter.increment();
        assert_eq!(counter.read(), 1);
    }

    #[test]
    fn resetting_wrap() {
        let counter = ResettingCounter::new(config());
        counter.increment_by(i64::MAX);
        counter.increment();
        assert_eq!(counter.read(), i64::MIN);
    }

    #[test]
    fn resetting_equality() {
        let a = ResettingCounter::new(config());
        let b = ResettingCounter::new(config());
        assert_eq!(a, b);

        a.increment();
        assert_ne!(a, b);
        b.increment();
        assert_eq!(a, b);

        let c = ResettingCounter::new(MonitorConfig::new("OTHER"));
        assert_ne!(ResettingCounter::new(config()), c);
    }

    #[test]
    fn resetting_concurrent() {
        let counter = Arc::new(ResettingCounter::new(config()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let counter = counter.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..10_000 {
                    counter.increment();
                }
            }));
        }

        let mut total = 0;
        while handles.iter().any(|h| !h.is_finished()) {
            total += counter.read();
        }
        for h in handles {
            h.join().unwrap();
        }
        total += counter.read();
        assert_eq!(total, 80_000);
    }

    #[test]
    fn resetting_poll() {
        let counter = ResettingCounter::new(config());
        counter.increment_by(4);

        let mut metrics = Vec::new();
        counter.poll(Utc::now(), &mut metrics);
        counter.poll(Utc::now(), &mut metrics);
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].config().data_source_type(), Some("GAUGE"));
        assert_eq!(metrics[0].value().as_f64(), 4.0);
        assert_eq!(metrics[1].value().as_f64(), 0.0);
    }

    #[test]
    fn basic_poll() {
        let counter = BasicCounter::new(config());
        counter.increment();
        counter.increment_by(9);

        let mut metrics = Vec::new();
        counter.poll(Utc::now(), &mut metrics);
        counter.poll(Utc::now(), &mut metrics);
        assert_eq!(metrics[0].config().data_source_type(), Some("COUNTER"));
        assert_eq!(metrics[0].value().as_f64(), 10.0);
        assert_eq!(metrics[1].value().as_f64(), 10.0);
        assert_eq!(counter.value(), 10);
    }
}
