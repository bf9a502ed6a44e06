/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, anyhow};
use log::{info, warn};

use crate::config::GraphiteConfig;
use crate::naming::GraphiteNamingConvention;
use crate::registry::MonitorRegistry;

mod observer;
pub use observer::MetricObserver;

mod rate;
pub use rate::CounterToRateTransform;

mod async_observer;
pub use async_observer::{AsyncMetricObserver, AsyncObserverSnapshot, AsyncObserverStats};

mod graphite;
pub use graphite::{GraphiteObserver, GraphiteSnapshot};

mod poller;
pub use poller::{MetricPoller, MonitorRegistryMetricPoller, PollRunnable};

mod scheduler;
pub use scheduler::{PollScheduler, SchedulerError, ThreadPollScheduler};

mod env;
pub use env::{HOST_NAME_UNKNOWN, PublishEnv, SystemEnv};

/// Queued batches older than this many milliseconds per second of poll
/// interval are dropped instead of being published.
const EXPIRE_MILLIS_PER_POLL_SECOND: u64 = 2000;

/// Starts and stops the periodic publishing of every registered monitor to
/// graphite.
pub struct MetricPublishing {
    scheduler: Arc<dyn PollScheduler>,
    registry: Arc<dyn MonitorRegistry>,
    env: Arc<dyn PublishEnv>,
    lock: Mutex<()>,
}

impl MetricPublishing {
    pub fn new(registry: Arc<dyn MonitorRegistry>) -> Self {
        MetricPublishing::with_parts(
            Arc::new(ThreadPollScheduler::new()),
            registry,
            Arc::new(SystemEnv),
        )
    }

    pub fn with_parts(
        scheduler: Arc<dyn PollScheduler>,
        registry: Arc<dyn MonitorRegistry>,
        env: Arc<dyn PublishEnv>,
    ) -> Self {
        MetricPublishing {
            scheduler,
            registry,
            env,
            lock: Mutex::new(()),
        }
    }

    pub fn is_started(&self) -> bool {
        self.scheduler.is_started()
    }

    /// Start publishing. Does nothing if already started.
    pub fn start(&self, config: &GraphiteConfig) -> anyhow::Result<()> {
        let _guard = self.lock.lock().unwrap();
        if self.scheduler.is_started() {
            return Ok(());
        }

        let mut config = config.clone();
        config.check().context("invalid graphite config")?;
        let observer = self
            .create_graphite_observer(&config)
            .context("failed to create graphite observer")?;

        self.scheduler
            .start()
            .context("failed to start poll scheduler")?;
        let poller = Arc::new(MonitorRegistryMetricPoller::new(Arc::clone(&self.registry)));
        let task = PollRunnable::new(poller, vec![observer]);
        let period = Duration::from_secs(config.poll_interval_secs());
        if let Err(e) = self.scheduler.add_poller(task, period) {
            if let Err(stop_err) = self.scheduler.stop() {
                warn!("failed to stop poll scheduler after poller error: {stop_err}");
            }
            return Err(anyhow!(e).context("failed to add metric poller"));
        }
        Ok(())
    }

    /// Stop publishing. A stopped pipeline is left as is.
    pub fn stop(&self) {
        let _guard = self.lock.lock().unwrap();
        match self.scheduler.stop() {
            Ok(_) | Err(SchedulerError::NotStarted) => {}
            Err(e) => warn!("failed to stop metric publishing: {e}"),
        }
    }

    /// Build the observer chain ending with the graphite sink.
    pub fn create_graphite_observer(
        &self,
        config: &GraphiteConfig,
    ) -> anyhow::Result<Arc<dyn MetricObserver>> {
        let address = env::resolve_address(self.env.as_ref(), config.address())?;
        let host_name = env::local_host_name(self.env.as_ref());
        let server = format!("{address}:{}", config.port());

        let mut graphite = GraphiteObserver::new(
            server.clone(),
            config.prefix().map(|s| s.to_string()),
            Box::new(GraphiteNamingConvention::new(&host_name)),
        )
        .context("failed to create tokio runtime for graphite observer")?;
        graphite.set_connect_timeout(config.connect_timeout);
        graphite.set_write_timeout(config.write_timeout);
        let name = graphite.name().to_string();

        let expire_time = Duration::from_millis(
            config
                .poll_interval_secs()
                .saturating_mul(EXPIRE_MILLIS_PER_POLL_SECOND),
        );
        let observer: Arc<dyn MetricObserver> = Arc::new(
            AsyncMetricObserver::new(&name, Arc::new(graphite), config.queue_size(), expire_time)
                .context("failed to spawn async observer thread")?,
        );

        info!(
            "will publish metrics to graphite server {server}, send as rate: {}",
            config.send_as_rate()
        );
        if config.send_as_rate() {
            let heartbeat = Duration::from_secs(config.poll_interval_secs());
            Ok(Arc::new(CounterToRateTransform::new(observer, heartbeat)))
        } else {
            Ok(observer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::MetricObjects;
    use crate::monitor::Counter;
    use crate::registry::DefaultMonitorRegistry;
    use crate::publish::env::tests::FixedEnv;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeScheduler {
        started: AtomicBool,
        start_count: AtomicUsize,
        stop_count: AtomicUsize,
        add_count: AtomicUsize,
        reject_poller: AtomicBool,
    }

    impl PollScheduler for FakeScheduler {
        fn start(&self) -> Result<(), SchedulerError> {
            if self.started.swap(true, Ordering::AcqRel) {
                return Err(SchedulerError::AlreadyStarted);
            }
            self.start_count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn stop(&self) -> Result<(), SchedulerError> {
            if !self.started.swap(false, Ordering::AcqRel) {
                return Err(SchedulerError::NotStarted);
            }
            self.stop_count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn add_poller(&self, _task: PollRunnable, _period: Duration) -> Result<(), SchedulerError> {
            if !self.started.load(Ordering::Acquire) {
                return Err(SchedulerError::NotStarted);
            }
            if self.reject_poller.load(Ordering::Relaxed) {
                return Err(SchedulerError::Spawn(std::io::Error::other("no thread")));
            }
            self.add_count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn is_started(&self) -> bool {
            self.started.load(Ordering::Acquire)
        }
    }

    fn graphite_env() -> Arc<FixedEnv> {
        let mut env = FixedEnv::default();
        env.vars
            .insert("GRAPHITE_HOST".to_string(), "10.0.0.5".to_string());
        env.host = Some("web01".to_string());
        Arc::new(env)
    }

    #[test]
    fn concurrent_start() {
        let scheduler = Arc::new(FakeScheduler::default());
        let publishing = Arc::new(MetricPublishing::with_parts(
            scheduler.clone(),
            Arc::new(DefaultMonitorRegistry::default()),
            graphite_env(),
        ));
        let config = GraphiteConfig::new("${GRAPHITE_HOST}");
        let barrier = Arc::new(Barrier::new(50));

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let publishing = publishing.clone();
                let config = config.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    publishing.start(&config)
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }

        assert!(publishing.is_started());
        assert_eq!(scheduler.start_count.load(Ordering::Relaxed), 1);
        assert_eq!(scheduler.add_count.load(Ordering::Relaxed), 1);

        publishing.stop();
        assert!(!publishing.is_started());
        assert_eq!(scheduler.stop_count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn stop_without_start() {
        let scheduler = Arc::new(FakeScheduler::default());
        let publishing = MetricPublishing::with_parts(
            scheduler.clone(),
            Arc::new(DefaultMonitorRegistry::default()),
            graphite_env(),
        );
        publishing.stop();
        publishing.stop();
        assert_eq!(scheduler.stop_count.load(Ordering::Relaxed), 0);
        assert!(!publishing.is_started());
    }

    #[test]
    fn env_address() {
        let publishing = MetricPublishing::with_parts(
            Arc::new(FakeScheduler::default()),
            Arc::new(DefaultMonitorRegistry::default()),
            graphite_env(),
        );
        let observer = publishing
            .create_graphite_observer(&GraphiteConfig::new("${GRAPHITE_HOST}"))
            .unwrap();
        assert_eq!(observer.name(), "graphite-10.0.0.5:2003");

        let mut config = GraphiteConfig::new("graphite.example.net");
        config.set_port(2004);
        config.set_send_as_rate(true);
        let observer = publishing.create_graphite_observer(&config).unwrap();
        assert_eq!(observer.name(), "graphite-graphite.example.net:2004");
    }

    #[test]
    fn env_address_not_set() {
        let scheduler = Arc::new(FakeScheduler::default());
        let publishing = MetricPublishing::with_parts(
            scheduler.clone(),
            Arc::new(DefaultMonitorRegistry::default()),
            Arc::new(FixedEnv::default()),
        );
        assert!(publishing.start(&GraphiteConfig::new("${GRAPHITE_HOST}")).is_err());
        assert!(!publishing.is_started());
        assert_eq!(scheduler.start_count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn add_poller_failure() {
        let scheduler = Arc::new(FakeScheduler::default());
        scheduler.reject_poller.store(true, Ordering::Relaxed);
        let publishing = MetricPublishing::with_parts(
            scheduler.clone(),
            Arc::new(DefaultMonitorRegistry::default()),
            graphite_env(),
        );
        assert!(publishing.start(&GraphiteConfig::new("${GRAPHITE_HOST}")).is_err());
        assert!(!publishing.is_started());
        assert_eq!(scheduler.start_count.load(Ordering::Relaxed), 1);
        assert_eq!(scheduler.stop_count.load(Ordering::Relaxed), 1);
        assert_eq!(scheduler.add_count.load(Ordering::Relaxed), 0);
    }

    fn publish_first_line(send_as_rate: bool) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (sender, receiver) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let _ = sender.send(line);
        });

        let registry = Arc::new(DefaultMonitorRegistry::default());
        let objects = MetricObjects::new(registry.clone());
        let counter = objects.register_counter("pipes", "app", "Worker", "RETRIES");
        counter.increment_by(5);

        let publishing = MetricPublishing::with_parts(
            Arc::new(ThreadPollScheduler::new()),
            registry,
            graphite_env(),
        );
        let mut config = GraphiteConfig::new("127.0.0.1");
        config.set_port(port);
        config.set_poll_interval(Duration::from_secs(1));
        config.set_prefix("haystack");
        config.set_send_as_rate(send_as_rate);
        publishing.start(&config).unwrap();

        let line = receiver.recv_timeout(Duration::from_secs(10)).unwrap();
        publishing.stop();
        line
    }

    #[test]
    fn publish_counter() {
        let line = publish_first_line(false);
        let fields: Vec<&str> = line.trim_end().split(' ').collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0], "haystack.pipes.app.web01.Worker.RETRIES.COUNTER");
        assert_eq!(fields[1], "5");
        assert!(fields[2].parse::<i64>().unwrap() > 0);
    }

    #[test]
    fn publish_counter_as_rate() {
        let line = publish_first_line(true);
        let fields: Vec<&str> = line.trim_end().split(' ').collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0], "haystack.pipes.app.web01.Worker.RETRIES.RATE");
        // first sample is divided by the 1s heartbeat
        assert_eq!(fields[1], "5.0");
        assert!(fields[2].parse::<i64>().unwrap() > 0);
    }
}
