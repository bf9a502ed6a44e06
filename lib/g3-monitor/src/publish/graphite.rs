/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt::Write;
use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use log::warn;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::runtime::Runtime;

use super::MetricObserver;
use crate::metric::Metric;
use crate::naming::NamingConvention;

#[derive(Default, Debug, Eq, PartialEq)]
pub struct GraphiteSnapshot {
    pub sent_batches: u64,
    pub sent_metrics: u64,
    pub failed_batches: u64,
}

struct GraphiteConnection {
    stream: Option<TcpStream>,
    last_error_report: u64,
}

/// Writes samples to a graphite server using the plaintext protocol.
pub struct GraphiteObserver {
    name: String,
    server: String,
    prefix: Option<String>,
    naming: Box<dyn NamingConvention>,
    connect_timeout: Duration,
    write_timeout: Duration,
    connection: Mutex<GraphiteConnection>,
    runtime: Runtime,
    create_instant: Instant,
    sent_batches: AtomicU64,
    sent_metrics: AtomicU64,
    failed_batches: AtomicU64,
}

impl GraphiteObserver {
    pub fn new(
        server: String,
        prefix: Option<String>,
        naming: Box<dyn NamingConvention>,
    ) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(GraphiteObserver {
            name: format!("graphite-{server}"),
            server,
            prefix,
            naming,
            connect_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
            connection: Mutex::new(GraphiteConnection {
                stream: None,
                last_error_report: u64::MAX,
            }),
            runtime,
            create_instant: Instant::now(),
            sent_batches: AtomicU64::new(0),
            sent_metrics: AtomicU64::new(0),
            failed_batches: AtomicU64::new(0),
        })
    }

    pub fn set_connect_timeout(&mut self, timeout: Duration) {
        self.connect_timeout = timeout;
    }

    pub fn set_write_timeout(&mut self, timeout: Duration) {
        self.write_timeout = timeout;
    }

    #[inline]
    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn snapshot(&self) -> GraphiteSnapshot {
        GraphiteSnapshot {
            sent_batches: self.sent_batches.load(Ordering::Relaxed),
            sent_metrics: self.sent_metrics.load(Ordering::Relaxed),
            failed_batches: self.failed_batches.load(Ordering::Relaxed),
        }
    }

    fn format_batch(&self, metrics: &[Metric]) -> String {
        let mut buf = String::with_capacity(metrics.len() * 128);
        for metric in metrics {
            if let Some(prefix) = &self.prefix {
                buf.push_str(prefix);
                buf.push('.');
            }
            buf.push_str(&self.naming.name(metric));
            let _ = writeln!(buf, " {} {}", metric.value(), metric.time().timestamp());
        }
        buf
    }

    async fn send(&self, stream: &mut Option<TcpStream>, data: &[u8]) -> anyhow::Result<()> {
        if stream.is_none() {
            let s = tokio::time::timeout(self.connect_timeout, TcpStream::connect(self.server.as_str()))
                .await
                .map_err(|_| anyhow!("timed out to connect to {}", self.server))?
                .map_err(|e| anyhow!("failed to connect to {}: {e}", self.server))?;
            *stream = Some(s);
        }
        let Some(s) = stream.as_mut() else {
            return Err(anyhow!("no connection to {}", self.server));
        };

        tokio::time::timeout(self.write_timeout, async {
            s.write_all(data).await?;
            s.flush().await
        })
        .await
        .map_err(|_| anyhow!("timed out to write to {}", self.server))?
        .map_err(|e| anyhow!("failed to write to {}: {e}", self.server))
    }
}

impl MetricObserver for GraphiteObserver {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&self, metrics: Vec<Metric>) {
        if metrics.is_empty() {
            return;
        }
        let data = self.format_batch(&metrics);

        let mut connection = self.connection.lock().unwrap();
        match self
            .runtime
            .block_on(self.send(&mut connection.stream, data.as_bytes()))
        {
            Ok(_) => {
                self.sent_batches.fetch_add(1, Ordering::Relaxed);
                self.sent_metrics
                    .fetch_add(metrics.len() as u64, Ordering::Relaxed);
            }
            Err(e) => {
                connection.stream = None;
                self.failed_batches.fetch_add(1, Ordering::Relaxed);
                let time_slice = self.create_instant.elapsed().as_secs() >> 6; // every 64s
                if connection.last_error_report != time_slice {
                    warn!("sending metrics error: {e:?}");
                    connection.last_error_report = time_slice;
                }
            }
        }
    }
}
