/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;
use std::fmt::{self, Write};

pub const TAG_KEY_METRIC_GROUP: &str = "metricGroup";
pub const TAG_KEY_SUBSYSTEM: &str = "subsystem";
pub const TAG_KEY_APPLICATION: &str = "application";
pub const TAG_KEY_FULLY_QUALIFIED_CLASS_NAME: &str = "fullyQualifiedClassName";
pub const TAG_KEY_CLASS: &str = "class";
pub const TAG_KEY_LINE_NUMBER: &str = "lineNumber";
pub const TAG_KEY_BUCKET: &str = "bucket";
pub const TAG_KEY_TYPE: &str = "type";
pub const TAG_KEY_STATISTIC: &str = "statistic";

pub const METRIC_GROUP_BUCKETS: &str = "buckets";

const EMPTY_TAG_PREFIX: &str = "EMPTY_TAG_";

/// An ordered set of tags.
///
/// Equality and hashing ignore insertion order, so two maps built from the
/// same pairs in different order identify the same metric. Values are never
/// empty: an empty value is replaced by `EMPTY_TAG_<key>` on insertion, which
/// keeps it distinct from a tag that is not present at all.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricTagMap {
    inner: BTreeMap<String, String>,
}

impl MetricTagMap {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<String>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let key = key.into();
        let mut value = value.into();
        if value.is_empty() {
            value = format!("{EMPTY_TAG_PREFIX}{key}");
        }
        self.inner.insert(key, value)
    }

    pub fn with_tag<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.insert(key, value);
        self
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(|v| v.as_str())
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for MetricTagMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = MetricTagMap::default();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl fmt::Display for MetricTagMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('{')?;
        let mut iter = self.inner.iter();
        if let Some((k, v)) = iter.next() {
            write!(f, "{k}={v}")?;
            for (k, v) in iter {
                write!(f, ", {k}={v}")?;
            }
        }
        f.write_char('}')
    }
}
