/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::Thread;
use std::time::{Duration, Instant};

use log::debug;
use thiserror::Error;

use super::PollRunnable;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler is not started")]
    NotStarted,
    #[error("scheduler is already started")]
    AlreadyStarted,
    #[error("failed to spawn poll thread: {0:?}")]
    Spawn(#[from] io::Error),
}

/// Runs poll tasks periodically.
pub trait PollScheduler: Send + Sync {
    fn start(&self) -> Result<(), SchedulerError>;

    fn stop(&self) -> Result<(), SchedulerError>;

    fn add_poller(&self, task: PollRunnable, period: Duration) -> Result<(), SchedulerError>;

    fn is_started(&self) -> bool;
}

struct RunningState {
    quit: Arc<AtomicBool>,
    threads: Vec<Thread>,
}

/// Runs each poll task on its own thread.
///
/// Stopping only signals the threads, an in-flight poll is not waited for.
#[derive(Default)]
pub struct ThreadPollScheduler {
    state: Mutex<Option<RunningState>>,
}

impl ThreadPollScheduler {
    pub fn new() -> Self {
        ThreadPollScheduler::default()
    }
}

fn wait_duration(period: Duration, instant_start: Instant, quit: &AtomicBool) {
    let Some(instant_next) = instant_start.checked_add(period) else {
        std::thread::park_timeout(period);
        return;
    };
    // re-calculate the duration after spurious wakeups
    while !quit.load(Ordering::Acquire) {
        match instant_next.checked_duration_since(Instant::now()) {
            Some(dur) if !dur.is_zero() => std::thread::park_timeout(dur),
            _ => break,
        }
    }
}

impl PollScheduler for ThreadPollScheduler {
    fn start(&self) -> Result<(), SchedulerError> {
        let mut state = self.state.lock().unwrap();
        if state.is_some() {
            return Err(SchedulerError::AlreadyStarted);
        }
        *state = Some(RunningState {
            quit: Arc::new(AtomicBool::new(false)),
            threads: Vec::new(),
        });
        Ok(())
    }

    fn stop(&self) -> Result<(), SchedulerError> {
        let Some(state) = self.state.lock().unwrap().take() else {
            return Err(SchedulerError::NotStarted);
        };
        state.quit.store(true, Ordering::Release);
        for thread in state.threads {
            thread.unpark();
        }
        Ok(())
    }

    fn add_poller(&self, task: PollRunnable, period: Duration) -> Result<(), SchedulerError> {
        let mut guard = self.state.lock().unwrap();
        let Some(state) = guard.as_mut() else {
            return Err(SchedulerError::NotStarted);
        };

        let quit = Arc::clone(&state.quit);
        let handle = std::thread::Builder::new()
            .name(format!("metric-poll#{}", state.threads.len()))
            .spawn(move || {
                // the first poll runs right away, then once per period
                loop {
                    if quit.load(Ordering::Acquire) {
                        break;
                    }
                    let instant_start = Instant::now();
                    task.run();
                    wait_duration(period, instant_start, &quit);
                }
                debug!("metric poll thread quit");
            })?;
        state.threads.push(handle.thread().clone());
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.state.lock().unwrap().is_some()
    }
}
