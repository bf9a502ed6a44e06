/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use chrono::Utc;
use log::debug;

use super::MetricObserver;
use crate::metric::Metric;
use crate::registry::MonitorRegistry;

pub trait MetricPoller: Send + Sync {
    fn poll(&self) -> Vec<Metric>;
}

/// Polls every monitor held by a registry, all with the same timestamp.
pub struct MonitorRegistryMetricPoller {
    registry: Arc<dyn MonitorRegistry>,
}

impl MonitorRegistryMetricPoller {
    pub fn new(registry: Arc<dyn MonitorRegistry>) -> Self {
        MonitorRegistryMetricPoller { registry }
    }
}

impl MetricPoller for MonitorRegistryMetricPoller {
    fn poll(&self) -> Vec<Metric> {
        let time = Utc::now();
        let monitors = self.registry.monitors();
        let mut metrics = Vec::with_capacity(monitors.len() * 4);
        for monitor in monitors {
            monitor.poll(time, &mut metrics);
        }
        metrics
    }
}

/// One scheduled poll task: a poller and the observers fed by it.
pub struct PollRunnable {
    poller: Arc<dyn MetricPoller>,
    observers: Vec<Arc<dyn MetricObserver>>,
}

impl PollRunnable {
    pub fn new(poller: Arc<dyn MetricPoller>, observers: Vec<Arc<dyn MetricObserver>>) -> Self {
        PollRunnable { poller, observers }
    }

    pub fn run(&self) {
        let metrics = self.poller.poll();
        debug!(
            "polled {} metrics for {} observers",
            metrics.len(),
            self.observers.len()
        );
        if let Some((last, others)) = self.observers.split_last() {
            for observer in others {
                observer.update(metrics.clone());
            }
            last.update(metrics);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{BasicCounter, Counter, MonitorConfig, ResettingCounter};
    use crate::publish::observer::test::CollectObserver;
    use crate::registry::DefaultMonitorRegistry;

    #[test]
    fn poll_registry() {
        let registry = Arc::new(DefaultMonitorRegistry::default());
        let basic = Arc::new(BasicCounter::new(MonitorConfig::new("A")));
        let resetting = Arc::new(ResettingCounter::new(MonitorConfig::new("B")));
        registry.register(basic.clone());
        registry.register(resetting.clone());
        basic.increment_by(3);
        resetting.increment_by(4);

        let collect1 = Arc::new(CollectObserver::default());
        let collect2 = Arc::new(CollectObserver::default());
        let task = PollRunnable::new(
            Arc::new(MonitorRegistryMetricPoller::new(registry)),
            vec![collect1.clone(), collect2.clone()],
        );
        task.run();

        let metrics = collect1.take_all();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].time(), metrics[1].time());
        assert_eq!(metrics[0].value().as_f64(), 3.0);
        assert_eq!(metrics[1].value().as_f64(), 4.0);
        assert_eq!(collect2.take_all(), metrics);

        task.run();
        let metrics = collect1.take_all();
        assert_eq!(metrics[0].value().as_f64(), 3.0);
        assert_eq!(metrics[1].value().as_f64(), 0.0);
    }
}
