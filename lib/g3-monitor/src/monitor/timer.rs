/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::step::StepStats;
use super::{Monitor, MonitorConfig, TimeUnit};
use crate::metric::Metric;

pub trait Timer: Monitor {
    fn time_unit(&self) -> TimeUnit;

    /// Record a value already expressed in [`Timer::time_unit`].
    fn record_value(&self, value: u64);

    fn record(&self, duration: Duration) {
        self.record_value(self.time_unit().convert(duration));
    }
}

/// A timer publishing count, total time, min and max of each poll step.
pub struct BasicTimer {
    config: MonitorConfig,
    unit: TimeUnit,
    stats: StepStats,
}

impl BasicTimer {
    pub fn new(config: MonitorConfig, unit: TimeUnit) -> Self {
        BasicTimer {
            config,
            unit,
            stats: StepStats::default(),
        }
    }
}

impl Monitor for BasicTimer {
    fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn poll(&self, time: DateTime<Utc>, metrics: &mut Vec<Metric>) {
        self.stats.snapshot().emit(&self.config, time, metrics);
    }
}

impl Timer for BasicTimer {
    fn time_unit(&self) -> TimeUnit {
        self.unit
    }

    fn record_value(&self, value: u64) {
        self.stats.record(value);
    }
}

impl fmt::Debug for BasicTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BasicTimer{{config={}, unit={:?}}}", self.config, self.unit)
    }
}
