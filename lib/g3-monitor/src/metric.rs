/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;

use chrono::{DateTime, Utc};

use crate::monitor::MonitorConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Double(f64),
    Signed(i64),
    Unsigned(u64),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            MetricValue::Double(f) => *f,
            MetricValue::Signed(i) => *i as f64,
            MetricValue::Unsigned(u) => *u as f64,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Unsigned(u) => itoa::Buffer::new().format(*u).fmt(f),
            MetricValue::Signed(i) => itoa::Buffer::new().format(*i).fmt(f),
            MetricValue::Double(v) => {
                if v.is_finite() {
                    ryu::Buffer::new().format_finite(*v).fmt(f)
                } else {
                    // graphite has no representation for NaN or infinity
                    f.write_str("0")
                }
            }
        }
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        MetricValue::Signed(value)
    }
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        MetricValue::Unsigned(value)
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Double(value)
    }
}

/// A single polled sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    config: MonitorConfig,
    time: DateTime<Utc>,
    value: MetricValue,
}

impl Metric {
    pub fn new<V: Into<MetricValue>>(config: MonitorConfig, time: DateTime<Utc>, value: V) -> Self {
        Metric {
            config,
            time,
            value: value.into(),
        }
    }

    #[inline]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    #[inline]
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    #[inline]
    pub fn value(&self) -> MetricValue {
        self.value
    }

    pub(crate) fn into_parts(self) -> (MonitorConfig, DateTime<Utc>, MetricValue) {
        (self.config, self.time, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(MetricValue::Unsigned(10).to_string(), "10");
        assert_eq!(MetricValue::Signed(-10).to_string(), "-10");
        assert_eq!(MetricValue::Double(1.0).to_string(), "1.0");
        assert_eq!(MetricValue::Double(0.25).to_string(), "0.25");
        assert_eq!(MetricValue::Double(f64::NAN).to_string(), "0");
        assert_eq!(MetricValue::Double(f64::INFINITY).to_string(), "0");
    }

    #[test]
    fn as_f64() {
        assert_eq!(MetricValue::Signed(-3).as_f64(), -3.0);
        assert_eq!(MetricValue::Unsigned(3).as_f64(), 3.0);
        assert_eq!(MetricValue::Double(2.5).as_f64(), 2.5);
    }
}
