/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use foldhash::fast::FixedState;

use super::MetricObserver;
use crate::metric::Metric;
use crate::monitor::{DataSourceType, MonitorConfig};

struct CounterValue {
    value: f64,
    time: DateTime<Utc>,
}

/// Turns `COUNTER` samples into per-second `RATE` samples before passing
/// them on. Everything else is forwarded untouched.
pub struct CounterToRateTransform {
    observer: Arc<dyn MetricObserver>,
    heartbeat: Duration,
    cache: Mutex<HashMap<MonitorConfig, CounterValue, FixedState>>,
}

impl CounterToRateTransform {
    pub fn new(observer: Arc<dyn MetricObserver>, heartbeat: Duration) -> Self {
        CounterToRateTransform {
            observer,
            heartbeat,
            cache: Mutex::new(HashMap::with_hasher(FixedState::with_seed(0))),
        }
    }

    fn heartbeat_secs(&self) -> f64 {
        self.heartbeat.as_secs_f64().max(1.0)
    }

    fn to_rate(
        &self,
        cache: &mut HashMap<MonitorConfig, CounterValue, FixedState>,
        metric: Metric,
    ) -> Metric {
        let (config, time, value) = metric.into_parts();
        let value = value.as_f64();

        let current = CounterValue { value, time };
        let rate = match cache.insert(config.clone(), current) {
            Some(prev) => {
                let delta = value - prev.value;
                let elapsed = (time - prev.time).num_milliseconds();
                if delta <= 0.0 {
                    // counter restarted
                    0.0
                } else if elapsed > 0 {
                    delta * 1000.0 / elapsed as f64
                } else {
                    delta / self.heartbeat_secs()
                }
            }
            None => value.max(0.0) / self.heartbeat_secs(),
        };

        Metric::new(config.with_type(DataSourceType::Rate), time, rate)
    }
}

impl MetricObserver for CounterToRateTransform {
    fn name(&self) -> &str {
        self.observer.name()
    }

    fn update(&self, metrics: Vec<Metric>) {
        let mut newest: Option<DateTime<Utc>> = None;
        let mut output = Vec::with_capacity(metrics.len());

        {
            let mut cache = self.cache.lock().unwrap();
            for metric in metrics {
                if metric.config().data_source_type() == Some(DataSourceType::Counter.as_str()) {
                    let time = metric.time();
                    if newest.is_none_or(|t| t < time) {
                        newest = Some(time);
                    }
                    output.push(self.to_rate(&mut cache, metric));
                } else {
                    output.push(metric);
                }
            }

            if let Some(now) = newest {
                let max_age = (self.heartbeat.as_millis() as i64).saturating_mul(2);
                cache.retain(|_, v| (now - v.time).num_milliseconds() <= max_age);
            }
        }

        self.observer.update(output);
    }
}
