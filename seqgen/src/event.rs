/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Release events and the sinks that receive them.
//!
//! Each worker emits exactly one [`ReleaseEvent`] per performed release,
//! after its unit of work has returned.  Events from one service arrive at the
//! sink in sequence order; events from different services interleave freely.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;
use tracing::{info, warn};

// ── Event ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Ok,
    Failed(String),
}

impl EventOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, EventOutcome::Ok)
    }
}

/// One performed release.
#[derive(Debug, Clone)]
pub struct ReleaseEvent {
    pub service: usize,
    pub name: String,
    /// Nominal release rate of the service.
    pub rate_hz: f64,
    /// 1-based, gapless per service.
    pub sequence: u64,
    /// Core the work actually ran on, if the platform can tell.
    pub core: Option<u32>,
    pub timestamp: SystemTime,
    /// Time since the run started.
    pub elapsed: Duration,
    pub outcome: EventOutcome,
}

/// Shared time base for all events of one run.
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    started: Instant,
}

impl RunClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// `(wall-clock now, elapsed since start)`.
    pub fn now(&self) -> (SystemTime, Duration) {
        (SystemTime::now(), self.started.elapsed())
    }
}

// ── Sinks ─────────────────────────────────────────────────────────────────────

/// Append-only consumer of release events.
pub trait EventSink: Send + Sync {
    fn record(&self, event: ReleaseEvent);
}

/// Writes one log line per release.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: ReleaseEvent) {
        let core = event.core.map(i64::from).unwrap_or(-1);
        match &event.outcome {
            EventOutcome::Ok => info!(
                service = %event.name,
                rate_hz = event.rate_hz,
                sequence = event.sequence,
                core,
                elapsed_s = event.elapsed.as_secs_f64(),
                "release"
            ),
            EventOutcome::Failed(message) => warn!(
                service = %event.name,
                rate_hz = event.rate_hz,
                sequence = event.sequence,
                core,
                elapsed_s = event.elapsed.as_secs_f64(),
                error = %message,
                "release failed"
            ),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ReleaseEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Copy of all events recorded so far, in arrival order.
    pub fn snapshot(&self) -> Vec<ReleaseEvent> {
        self.events.lock().clone()
    }

    /// Events of one service, in sequence order.
    pub fn events_for(&self, service: usize) -> Vec<ReleaseEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.service == service)
            .cloned()
            .collect()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: ReleaseEvent) {
        self.events.lock().push(event);
    }
}

/// Forwards every event to each inner sink in turn.
#[derive(Default, Clone)]
pub struct Tee {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl Tee {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for Tee {
    fn record(&self, event: ReleaseEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.record(event.clone());
            }
            last.record(event);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
