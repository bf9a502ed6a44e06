/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use anyhow::anyhow;

mod yaml;

const GRAPHITE_DEFAULT_PORT: u16 = 2003;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_QUEUE_SIZE: usize = 10000;

/// Where and how often to publish.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphiteConfig {
    /// A host name, an IP address, or `${NAME}` to read it from the environment.
    pub(crate) address: String,
    pub(crate) port: u16,
    pub(crate) poll_interval: Duration,
    pub(crate) queue_size: usize,
    pub(crate) send_as_rate: bool,
    pub(crate) prefix: Option<String>,
    pub(crate) connect_timeout: Duration,
    pub(crate) write_timeout: Duration,
}

impl Default for GraphiteConfig {
    fn default() -> Self {
        GraphiteConfig::new("localhost")
    }
}

impl GraphiteConfig {
    pub fn new<T: Into<String>>(address: T) -> Self {
        GraphiteConfig {
            address: address.into(),
            port: GRAPHITE_DEFAULT_PORT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            queue_size: DEFAULT_QUEUE_SIZE,
            send_as_rate: false,
            prefix: None,
            connect_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
        }
    }

    #[inline]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[inline]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[inline]
    pub fn queue_size(&self) -> usize {
        self.queue_size
    }

    #[inline]
    pub fn send_as_rate(&self) -> bool {
        self.send_as_rate
    }

    #[inline]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn set_address<T: Into<String>>(&mut self, address: T) {
        self.address = address.into();
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }

    pub fn set_queue_size(&mut self, size: usize) {
        self.queue_size = size;
    }

    pub fn set_send_as_rate(&mut self, enable: bool) {
        self.send_as_rate = enable;
    }

    pub fn set_prefix<T: Into<String>>(&mut self, prefix: T) {
        self.prefix = Some(prefix.into());
    }

    pub fn set_connect_timeout(&mut self, timeout: Duration) {
        self.connect_timeout = timeout;
    }

    pub fn set_write_timeout(&mut self, timeout: Duration) {
        self.write_timeout = timeout;
    }

    pub fn check(&mut self) -> anyhow::Result<()> {
        if self.address.is_empty() {
            return Err(anyhow!("no graphite address has been set"));
        }
        if self.port == 0 {
            return Err(anyhow!("invalid graphite port 0"));
        }
        if self.queue_size == 0 {
            return Err(anyhow!("queue size should be greater than 0"));
        }
        if self.poll_interval < Duration::from_secs(1) {
            return Err(anyhow!("poll interval should be at least 1s"));
        }
        // sub-second precision is not supported by the publishing schedule
        self.poll_interval = Duration::from_secs(self.poll_interval.as_secs());
        if self.prefix.as_ref().is_some_and(|p| p.is_empty()) {
            self.prefix = None;
        }
        if let Some(prefix) = &self.prefix {
            if prefix.contains(char::is_whitespace) {
                return Err(anyhow!("graphite prefix {prefix:?} should not contain whitespace"));
            }
        }
        Ok(())
    }

    /// The poll interval in whole seconds, at least 1.
    pub(crate) fn poll_interval_secs(&self) -> u64 {
        self.poll_interval.as_secs().max(1)
    }
}
