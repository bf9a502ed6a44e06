/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::metric::Metric;
use crate::tag::{MetricTagMap, TAG_KEY_STATISTIC, TAG_KEY_TYPE};

mod counter;
pub use counter::{BasicCounter, Counter, ResettingCounter};

mod timer;
pub use timer::{BasicTimer, Timer};

mod bucket;
pub use bucket::{BucketConfig, BucketTimer};

mod step;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataSourceType {
    Gauge,
    Counter,
    Rate,
    Normalized,
}

impl DataSourceType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DataSourceType::Gauge => "GAUGE",
            DataSourceType::Counter => "COUNTER",
            DataSourceType::Rate => "RATE",
            DataSourceType::Normalized => "NORMALIZED",
        }
    }
}

impl fmt::Display for DataSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Precision of the values recorded by a timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
}

impl TimeUnit {
    pub const fn suffix(&self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Microseconds => "us",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
        }
    }

    pub fn convert(&self, d: Duration) -> u64 {
        let v = match self {
            TimeUnit::Nanoseconds => d.as_nanos(),
            TimeUnit::Microseconds => d.as_micros(),
            TimeUnit::Milliseconds => d.as_millis(),
            TimeUnit::Seconds => d.as_secs() as u128,
        };
        u64::try_from(v).unwrap_or(u64::MAX)
    }
}

/// The identity of a monitor: its name and its tags.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonitorConfig {
    name: String,
    tags: MetricTagMap,
}

impl MonitorConfig {
    pub fn new<T: Into<String>>(name: T) -> Self {
        MonitorConfig {
            name: name.into(),
            tags: MetricTagMap::default(),
        }
    }

    pub fn with_tags<T: Into<String>>(name: T, tags: MetricTagMap) -> Self {
        MonitorConfig {
            name: name.into(),
            tags,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn tags(&self) -> &MetricTagMap {
        &self.tags
    }

    pub fn with_additional_tag<K, V>(&self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut config = self.clone();
        config.tags.insert(key, value);
        config
    }

    pub fn with_type(&self, r#type: DataSourceType) -> Self {
        self.with_additional_tag(TAG_KEY_TYPE, r#type.as_str())
    }

    pub(crate) fn with_type_statistic(&self, r#type: DataSourceType, statistic: &str) -> Self {
        self.with_type(r#type)
            .with_additional_tag(TAG_KEY_STATISTIC, statistic)
    }

    pub fn data_source_type(&self) -> Option<&str> {
        self.tags.get(TAG_KEY_TYPE)
    }
}

impl fmt::Display for MonitorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.tags)
    }
}

/// Anything that can be polled for samples.
pub trait Monitor: fmt::Debug + Send + Sync {
    fn config(&self) -> &MonitorConfig;

    /// Append the current samples of this monitor to `metrics`.
    fn poll(&self, time: DateTime<Utc>, metrics: &mut Vec<Metric>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::TAG_KEY_CLASS;

    #[test]
    fn time_unit_convert() {
        let d = Duration::from_millis(1500);
        assert_eq!(TimeUnit::Nanoseconds.convert(d), 1_500_000_000);
        assert_eq!(TimeUnit::Microseconds.convert(d), 1_500_000);
        assert_eq!(TimeUnit::Milliseconds.convert(d), 1500);
        assert_eq!(TimeUnit::Seconds.convert(d), 1);
        assert_eq!(TimeUnit::Nanoseconds.convert(Duration::MAX), u64::MAX);
    }

    #[test]
    fn config_identity() {
        let tags = MetricTagMap::default().with_tag(TAG_KEY_CLASS, "Worker");
        let a = MonitorConfig::with_tags("RETRIES", tags.clone());
        let b = MonitorConfig::with_tags("RETRIES", tags);
        assert_eq!(a, b);
        assert_ne!(a, MonitorConfig::new("RETRIES"));

        let typed = a.with_type(DataSourceType::Counter);
        assert_ne!(a, typed);
        assert_eq!(typed.data_source_type(), Some("COUNTER"));
        assert_eq!(a.data_source_type(), None);
        assert_eq!(typed.to_string(), "RETRIES{class=Worker, type=COUNTER}");
    }
}
