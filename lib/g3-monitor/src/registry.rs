/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::{Arc, RwLock};

use crate::monitor::Monitor;

/// The set of monitors that will be polled for publishing.
pub trait MonitorRegistry: Send + Sync {
    fn register(&self, monitor: Arc<dyn Monitor>);

    fn monitors(&self) -> Vec<Arc<dyn Monitor>>;
}

#[derive(Default)]
pub struct DefaultMonitorRegistry {
    monitors: RwLock<Vec<Arc<dyn Monitor>>>,
}

impl DefaultMonitorRegistry {
    pub fn len(&self) -> usize {
        self.monitors.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MonitorRegistry for DefaultMonitorRegistry {
    fn register(&self, monitor: Arc<dyn Monitor>) {
        let mut monitors = self.monitors.write().unwrap();
        monitors.push(monitor);
    }

    fn monitors(&self) -> Vec<Arc<dyn Monitor>> {
        self.monitors.read().unwrap().clone()
    }
}
