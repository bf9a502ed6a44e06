/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod tag;
pub use tag::*;

mod metric;
pub use metric::{Metric, MetricValue};

pub mod monitor;

mod registry;
pub use registry::{DefaultMonitorRegistry, MonitorRegistry};

mod objects;
pub use objects::MetricObjects;

mod naming;
pub use naming::{GraphiteNamingConvention, NameShape, NamingConvention};

mod config;
pub use config::GraphiteConfig;

pub mod publish;
pub use publish::MetricPublishing;
