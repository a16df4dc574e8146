/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The sequencer tick handler.
//!
//! [`Sequencer::on_tick`] runs on the tick thread once per firing.  It never
//! blocks: releasing a service is a lock-free gate signal.
//!
//! Release counters are kept here rather than read back from the gates, so the
//! shutdown force-signal never shows up as a release.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::shutdown::{CoordinatorState, ShutdownCoordinator, StopReason};

/// What the tick source should do after a handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Disarm,
}

/// Tick and per-service release counts, readable from any thread.
#[derive(Debug)]
pub struct ReleaseCounters {
    ticks: AtomicU64,
    releases: Vec<AtomicU64>,
}

impl ReleaseCounters {
    fn new(services: usize) -> Self {
        Self {
            ticks: AtomicU64::new(0),
            releases: (0..services).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    /// Ticks handled so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Releases signaled to service `id` so far.
    pub fn releases(&self, id: usize) -> u64 {
        self.releases
            .get(id)
            .map(|r| r.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    pub fn all_releases(&self) -> Vec<u64> {
        self.releases
            .iter()
            .map(|r| r.load(Ordering::Acquire))
            .collect()
    }
}

pub struct Sequencer {
    tick: u64,
    max_ticks: Option<u64>,
    divisors: Vec<u64>,
    shutdown: Arc<ShutdownCoordinator>,
    counters: Arc<ReleaseCounters>,
}

impl Sequencer {
    /// `divisors[i]` belongs to service `i`; every divisor must be ≥ 1.
    pub fn new(
        divisors: Vec<u64>,
        max_ticks: Option<u64>,
        shutdown: Arc<ShutdownCoordinator>,
    ) -> Self {
        let counters = Arc::new(ReleaseCounters::new(divisors.len()));
        Self {
            tick: 0,
            max_ticks,
            divisors,
            shutdown,
            counters,
        }
    }

    pub fn counters(&self) -> Arc<ReleaseCounters> {
        Arc::clone(&self.counters)
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Handle one firing.
    pub fn on_tick(&mut self) -> TickControl {
        if self.shutdown.state() == CoordinatorState::Stopping {
            return TickControl::Disarm;
        }

        self.tick += 1;
        let tick = self.tick;

        for (id, &divisor) in self.divisors.iter().enumerate() {
            if tick % divisor == 0 {
                self.shutdown.gate(id).signal();
                self.counters.releases[id].fetch_add(1, Ordering::AcqRel);
            }
        }
        self.counters.ticks.store(tick, Ordering::Release);

        let budget_reached = self.max_ticks.is_some_and(|max| tick >= max);
        if self.shutdown.stop_requested() || budget_reached {
            let reason = self
                .shutdown
                .stop_reason()
                .unwrap_or(StopReason::TickBudget);
            debug!(tick, %reason, "stop pass");
            self.shutdown.stop_all(reason);
            return TickControl::Disarm;
        }

        TickControl::Continue
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
