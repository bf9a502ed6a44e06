/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::borrow::Cow;

use crate::metric::Metric;
use crate::tag::{
    METRIC_GROUP_BUCKETS, MetricTagMap, TAG_KEY_APPLICATION, TAG_KEY_BUCKET, TAG_KEY_CLASS,
    TAG_KEY_FULLY_QUALIFIED_CLASS_NAME, TAG_KEY_LINE_NUMBER, TAG_KEY_METRIC_GROUP,
    TAG_KEY_STATISTIC, TAG_KEY_SUBSYSTEM, TAG_KEY_TYPE,
};

const MISSING_TAG_PREFIX: &str = "MISSING_TAG_";

pub trait NamingConvention: Send + Sync {
    fn name(&self, metric: &Metric) -> String;
}

/// The layout of the dotted name, chosen from the tags of a metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameShape {
    /// `subsystem.application.host.class.name.type`
    Standard,
    /// `metricGroup.subsystem.<third>.host.<fifth>.name.type`
    Extended {
        third: &'static str,
        fifth: &'static str,
    },
}

impl NameShape {
    pub fn of(tags: &MetricTagMap) -> Self {
        match tags.get(TAG_KEY_METRIC_GROUP) {
            None => NameShape::Standard,
            Some(METRIC_GROUP_BUCKETS) => NameShape::Extended {
                third: TAG_KEY_APPLICATION,
                fifth: TAG_KEY_BUCKET,
            },
            Some(_) => NameShape::Extended {
                third: TAG_KEY_FULLY_QUALIFIED_CLASS_NAME,
                fifth: TAG_KEY_LINE_NUMBER,
            },
        }
    }
}

/// Builds graphite names that InfluxDB's graphite listener can split back
/// into tags, one tag per dotted field.
pub struct GraphiteNamingConvention {
    host: String,
}

impl GraphiteNamingConvention {
    pub fn new(host: &str) -> Self {
        GraphiteNamingConvention {
            host: sanitize(host).into_owned(),
        }
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl NamingConvention for GraphiteNamingConvention {
    fn name(&self, metric: &Metric) -> String {
        let config = metric.config();
        let tags = config.tags();

        let mut name = String::with_capacity(128);
        let mut push_field = |s: &str| {
            if !name.is_empty() {
                name.push('.');
            }
            name.push_str(s);
        };
        match NameShape::of(tags) {
            NameShape::Standard => {
                push_field(&tag_field(tags, TAG_KEY_SUBSYSTEM));
                push_field(&tag_field(tags, TAG_KEY_APPLICATION));
                push_field(&self.host);
                push_field(&tag_field(tags, TAG_KEY_CLASS));
            }
            NameShape::Extended { third, fifth } => {
                push_field(&tag_field(tags, TAG_KEY_METRIC_GROUP));
                push_field(&tag_field(tags, TAG_KEY_SUBSYSTEM));
                push_field(&tag_field(tags, third));
                push_field(&self.host);
                push_field(&tag_field(tags, fifth));
            }
        }
        push_field(&sanitize(config.name()));

        let data_type = tag_field(tags, TAG_KEY_TYPE);
        match tags.get(TAG_KEY_STATISTIC) {
            Some(statistic) => push_field(&format!("{data_type}_{}", sanitize(statistic))),
            None => push_field(&data_type),
        }
        name
    }
}

fn tag_field<'a>(tags: &'a MetricTagMap, key: &str) -> Cow<'a, str> {
    match tags.get(key) {
        Some(v) => sanitize(v),
        None => Cow::Owned(format!("{MISSING_TAG_PREFIX}{key}")),
    }
}

fn sanitize(s: &str) -> Cow<'_, str> {
    let is_special = |c: char| matches!(c, ' ' | '.' | '\n' | '\r' | '\t');
    if s.contains(is_special) {
        Cow::Owned(s.replace(is_special, "_"))
    } else {
        Cow::Borrowed(s)
    }
}
