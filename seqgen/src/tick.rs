/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Periodic tick sources.
//!
//! A [`TickSource`] invokes one handler at a fixed period until the handler
//! returns [`TickControl::Disarm`] or someone calls [`disarm`](TickSource::disarm).
//! Invocations never overlap.
//!
//! [`PeriodicTimer`] is the default source: a dedicated thread sleeping to
//! absolute deadlines.  When the handler (or preemption) makes it late by
//! more than one period, the missed firings are coalesced into the next one
//! and counted in [`TickStats::skipped`].

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::rt::{self, RtError, RtMode, ThreadSchedule};
use crate::sequencer::TickControl;

/// Handler invoked once per firing.
pub type TickHandler = Box<dyn FnMut() -> TickControl + Send>;

#[derive(Debug, Error)]
pub enum TickError {
    #[error("tick source is already armed")]
    AlreadyArmed,

    #[error("tick source was never armed")]
    NotArmed,

    #[error("failed to spawn tick thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("tick thread real-time setup failed: {0}")]
    Setup(#[source] RtError),

    #[error("tick thread panicked")]
    Panicked,
}

/// Firing statistics returned once a source has stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Handler invocations.
    pub fired: u64,
    /// Nominal firings coalesced because the source was late.
    pub skipped: u64,
}

pub trait TickSource: Send {
    /// Start firing `handler`.  Returns once the source is ready.
    fn arm(&mut self, handler: TickHandler) -> Result<(), TickError>;

    /// Stop firing.  Idempotent; an invocation already in progress completes.
    fn disarm(&self);

    /// Block until the source has stopped firing.
    fn wait(&mut self) -> Result<TickStats, TickError>;
}

// ── PeriodicTimer ─────────────────────────────────────────────────────────────

pub struct PeriodicTimer {
    period: Duration,
    initial_delay: Duration,
    schedule: Option<(ThreadSchedule, RtMode)>,
    armed: Arc<AtomicBool>,
    thread: Option<JoinHandle<TickStats>>,
}

impl PeriodicTimer {
    /// First firing one `period` after arming.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            initial_delay: period,
            schedule: None,
            armed: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Priority and core for the tick thread, applied before the first firing.
    pub fn with_schedule(mut self, schedule: ThreadSchedule, mode: RtMode) -> Self {
        self.schedule = Some((schedule, mode));
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl TickSource for PeriodicTimer {
    fn arm(&mut self, mut handler: TickHandler) -> Result<(), TickError> {
        if self.thread.is_some() {
            return Err(TickError::AlreadyArmed);
        }

        let period = self.period;
        let initial_delay = self.initial_delay;
        let schedule = self.schedule;
        let armed = Arc::clone(&self.armed);
        armed.store(true, Ordering::SeqCst);

        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), RtError>>();

        let spawned = thread::Builder::new()
            .name("seqgen-tick".into())
            .spawn(move || {
                if let Some((sched, mode)) = schedule {
                    if let Err(e) = rt::apply(&sched, mode) {
                        let _ = ready_tx.send(Err(e));
                        return TickStats::default();
                    }
                }
                let _ = ready_tx.send(Ok(()));
                drop(ready_tx);

                run_loop(period, initial_delay, &armed, &mut handler)
            });

        let handle = match spawned {
            Ok(h) => h,
            Err(e) => {
                self.armed.store(false, Ordering::SeqCst);
                return Err(TickError::Spawn(e));
            }
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {
                debug!(period_us = period.as_micros() as u64, "tick source armed");
                self.thread = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                self.armed.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(TickError::Setup(e))
            }
            Err(_) => {
                self.armed.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(TickError::Panicked)
            }
        }
    }

    fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    fn wait(&mut self) -> Result<TickStats, TickError> {
        let handle = self.thread.take().ok_or(TickError::NotArmed)?;
        handle.join().map_err(|_| TickError::Panicked)
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.disarm();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Absolute-deadline firing loop.
fn run_loop(
    period: Duration,
    initial_delay: Duration,
    armed: &AtomicBool,
    handler: &mut TickHandler,
) -> TickStats {
    let mut stats = TickStats::default();
    let mut next = Instant::now() + initial_delay;

    while armed.load(Ordering::SeqCst) {
        let now = Instant::now();
        if next > now {
            rt::sleep(next - now);
        }
        if !armed.load(Ordering::SeqCst) {
            break;
        }

        stats.fired += 1;
        if handler() == TickControl::Disarm {
            armed.store(false, Ordering::SeqCst);
            break;
        }

        next += period;
        let now = Instant::now();
        let mut late = 0;
        while now.saturating_duration_since(next) > period {
            next += period;
            late += 1;
        }
        if late > 0 {
            stats.skipped += late;
            warn!(skipped = late, fired = stats.fired, "tick overrun, firings coalesced");
        }
    }

    debug!(fired = stats.fired, skipped = stats.skipped, "tick source stopped");
    stats
}

// ── Tests ─────────────────────────────────────────────────────────────────────
