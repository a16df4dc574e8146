/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Service data structures for the sequencer.
//!
//! Two distinct types model the two sides of schedule derivation:
//!
//! ```text
//! YAML / preset  ──►  ServiceDecl  ──(ScheduleConfig::derive)──►  ServiceSpec  ──►  ServiceWorker
//!                      ↑ input                                     ↑ output
//!                      name + divisor only                         priority, core, immutable
//! ```
//!
//! # Ownership model
//! `ServiceDecl` values are **moved** into [`ScheduleConfig::derive`], which
//! consumes them and produces one `ServiceSpec` per declaration.  After that
//! the specs live inside the `ScheduleConfig` for the whole run and are only
//! ever shared by reference or cloned into a worker.
//!
//! [`ScheduleConfig::derive`]: crate::schedule::ScheduleConfig::derive

use std::time::Duration;

// ── Work kind ─────────────────────────────────────────────────────────────────

/// Which built-in unit of work a service performs on each release.
///
/// Services driven by an external collaborator (frame capture, storage…)
/// supply their own [`Work`](crate::work::Work) instead and the kind is only
/// used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkKind {
    /// No-op stub ("DO WORK" placeholder).
    #[default]
    Idle,
    /// Busy-spin for a fixed time to emulate CPU load.
    Spin { micros: u64 },
}

impl WorkKind {
    /// Short label used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            WorkKind::Idle => "idle",
            WorkKind::Spin { .. } => "spin",
        }
    }
}

// ── ServiceDecl (input) ───────────────────────────────────────────────────────

/// A periodic service as declared by the user, before priorities and cores
/// have been assigned.
#[derive(Debug, Clone, Default)]
pub struct ServiceDecl {
    /// Unique service name (e.g. `"S1"`).
    pub name: String,

    /// Number of sequencer ticks between consecutive releases.  Must be ≥ 1.
    pub divisor: u64,

    /// Declared worst-case execution time in µs.  Only used for the
    /// Liu & Layland feasibility warning; `None` skips the check.
    pub wcet_us: Option<u64>,

    /// Built-in work performed on each release.
    pub work: WorkKind,

    /// Request a sequencer stop once this many releases have completed.
    pub stop_after: Option<u64>,
}

impl ServiceDecl {
    /// Convenience constructor for a stub service.
    pub fn new(name: impl Into<String>, divisor: u64) -> Self {
        Self {
            name: name.into(),
            divisor,
            ..Default::default()
        }
    }

    pub fn with_wcet_us(mut self, wcet_us: u64) -> Self {
        self.wcet_us = Some(wcet_us);
        self
    }

    pub fn with_work(mut self, work: WorkKind) -> Self {
        self.work = work;
        self
    }

    pub fn with_stop_after(mut self, releases: u64) -> Self {
        self.stop_after = Some(releases);
        self
    }
}

// ── ServiceSpec (output) ──────────────────────────────────────────────────────

/// Immutable, fully-derived description of one service.
///
/// Produced by [`ScheduleConfig::derive`](crate::schedule::ScheduleConfig::derive)
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Index in declaration order.  Also indexes the per-service gate and
    /// abort flag inside the shutdown coordinator.
    pub id: usize,

    /// Unique service name.
    pub name: String,

    /// Ticks between consecutive releases (≥ 1).
    pub divisor: u64,

    /// Rate-monotonic rank: `0` is the highest-rate service.  Distinct for
    /// every service, ties broken by declaration order.
    pub priority_rank: usize,

    /// Fixed OS priority (SCHED_FIFO level) derived from the rank.
    pub priority: i32,

    /// Core the worker thread is pinned to.
    pub core: u32,

    /// Declared worst-case execution time in µs, if any.
    pub wcet_us: Option<u64>,

    /// Built-in work performed on each release.
    pub work: WorkKind,

    /// Request a sequencer stop once this many releases have completed.
    pub stop_after: Option<u64>,
}

impl ServiceSpec {
    /// Release period for a given sequencer tick period.
    pub fn period(&self, tick_period: Duration) -> Duration {
        let nanos = (tick_period.as_nanos() as u64).saturating_mul(self.divisor);
        Duration::from_nanos(nanos)
    }

    /// Release rate in Hz for a given sequencer tick period.
    ///
    /// Returns `0.0` for a zero tick period.
    pub fn rate_hz(&self, tick_period: Duration) -> f64 {
        let period = self.period(tick_period).as_secs_f64();
        if period == 0.0 {
            0.0
        } else {
            1.0 / period
        }
    }

    /// CPU utilisation fraction `wcet / period`, or `None` if no WCET was
    /// declared.  A zero period yields `Some(0.0)`.
    pub fn utilization(&self, tick_period: Duration) -> Option<f64> {
        let wcet_us = self.wcet_us?;
        let period_us = self.period(tick_period).as_micros() as f64;
        if period_us == 0.0 {
            Some(0.0)
        } else {
            Some(wcet_us as f64 / period_us)
        }
    }

    /// Number of releases this service receives over `ticks` sequencer ticks.
    pub fn releases_over(&self, ticks: u64) -> u64 {
        ticks / self.divisor.max(1)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
