/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use crate::metric::Metric;

/// A consumer of the samples produced by each poll.
pub trait MetricObserver: Send + Sync {
    fn name(&self) -> &str;

    fn update(&self, metrics: Vec<Metric>);
}
