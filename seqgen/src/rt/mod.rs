/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Thin platform layer for fixed-priority scheduling and core pinning.
//!
//! Every operation applies to the **calling** thread, so each worker (and the
//! tick thread) configures itself right after it is spawned.
//!
//! | Target | Priority | Affinity | Executing core |
//! |---|---|---|---|
//! | Linux | `pthread_setschedparam(SCHED_FIFO)` | `sched_setaffinity` | `sched_getcpu` |
//! | other | capability gap | capability gap | unknown |
//!
//! Where the platform refuses (no `CAP_SYS_NICE`, core offline, non-Linux
//! target) the behavior depends on [`RtMode`]: `Strict` fails start-up,
//! `BestEffort` logs a warning and the system degrades to best-effort
//! ordering.

#[cfg(target_os = "linux")]
mod linux;

#[cfg(not(target_os = "linux"))]
mod fallback;

#[cfg(target_os = "linux")]
use linux as platform;

#[cfg(not(target_os = "linux"))]
use fallback as platform;

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

/// Range used when the platform cannot report its SCHED_FIFO range.
/// Matches the Linux values.
pub const DEFAULT_PRIORITY_RANGE: PriorityRange = PriorityRange { min: 1, max: 99 };

// ── Types ─────────────────────────────────────────────────────────────────────

/// How to react when a scheduling request is refused by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RtMode {
    /// Any refusal is a fatal start-up error.
    Strict,
    /// Refusals are logged and the thread keeps its default policy.
    #[default]
    BestEffort,
}

/// Inclusive range of fixed priorities, higher value = more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityRange {
    pub min: i32,
    pub max: i32,
}

impl PriorityRange {
    /// Number of distinct levels in the range.
    pub fn levels(&self) -> usize {
        if self.max < self.min {
            0
        } else {
            (self.max - self.min) as usize + 1
        }
    }
}

/// Priority and core a thread should run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadSchedule {
    pub priority: i32,
    pub core: u32,
}

/// What was actually applied to the thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    /// The thread runs under the fixed-priority policy.
    pub fixed_priority: bool,
    /// The thread is pinned to the requested core.
    pub pinned: bool,
}

/// Platform scheduling failures.
#[derive(Debug, Error)]
pub enum RtError {
    /// The fixed-priority policy could not be set.
    #[error("cannot set SCHED_FIFO priority {priority}: {source}")]
    Priority {
        priority: i32,
        #[source]
        source: std::io::Error,
    },

    /// The thread could not be pinned.
    #[error("cannot pin thread to core {core}: {source}")]
    Affinity {
        core: u32,
        #[source]
        source: std::io::Error,
    },

    /// The target has no fixed-priority / affinity support.
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// SCHED_FIFO priority range of the host, or [`DEFAULT_PRIORITY_RANGE`] when
/// the platform cannot report one.
pub fn priority_range() -> PriorityRange {
    platform::priority_range().unwrap_or(DEFAULT_PRIORITY_RANGE)
}

/// Apply `schedule` to the calling thread.
///
/// In [`RtMode::BestEffort`] this never fails; each refused request is
/// logged and reflected as `false` in the returned [`Placement`].
pub fn apply(schedule: &ThreadSchedule, mode: RtMode) -> Result<Placement, RtError> {
    let mut placement = Placement::default();

    match platform::set_fixed_priority(schedule.priority) {
        Ok(()) => placement.fixed_priority = true,
        Err(e) if mode == RtMode::Strict => return Err(e),
        Err(e) => warn!(
            priority = schedule.priority,
            error = %e,
            "fixed-priority scheduling unavailable, continuing best-effort"
        ),
    }

    match platform::pin_to_core(schedule.core) {
        Ok(()) => placement.pinned = true,
        Err(e) if mode == RtMode::Strict => return Err(e),
        Err(e) => warn!(
            core = schedule.core,
            error = %e,
            "core pinning unavailable, thread may migrate"
        ),
    }

    debug!(
        priority = schedule.priority,
        core = schedule.core,
        fixed_priority = placement.fixed_priority,
        pinned = placement.pinned,
        "thread schedule applied"
    );
    Ok(placement)
}

/// Core the calling thread is executing on right now, if the platform can
/// tell.
pub fn current_core() -> Option<u32> {
    platform::current_core()
}

/// Sleep the calling thread for `duration`.
///
/// Uses `clock_nanosleep(CLOCK_MONOTONIC)` on Linux, resuming after signal
/// interruptions.
pub fn sleep(duration: Duration) {
    if duration.is_zero() {
        return;
    }
    platform::sleep(duration)
}

/// Name of the calling thread's current scheduling policy, for start-up
/// diagnostics.
pub fn current_policy_name() -> &'static str {
    platform::current_policy_name()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_range_matches_linux_fifo() {
        assert_eq!(DEFAULT_PRIORITY_RANGE.min, 1);
        assert_eq!(DEFAULT_PRIORITY_RANGE.max, 99);
        assert_eq!(DEFAULT_PRIORITY_RANGE.levels(), 99);
    }

    #[test]
    fn inverted_range_has_no_levels() {
        assert_eq!(PriorityRange { min: 5, max: 4 }.levels(), 0);
    }

    #[test]
    fn host_range_is_usable() {
        let r = priority_range();
        assert!(r.max >= r.min);
    }

    #[test]
    fn best_effort_apply_never_fails() {
        // An absurd core id can never be pinned; best-effort must swallow it.
        let sched = ThreadSchedule {
            priority: priority_range().min,
            core: 100_000,
        };
        let placement = std::thread::spawn(move || apply(&sched, RtMode::BestEffort))
            .join()
            .unwrap()
            .unwrap();
        assert!(!placement.pinned);
    }

    #[test]
    fn strict_apply_reports_impossible_core() {
        let sched = ThreadSchedule {
            priority: priority_range().min,
            core: 100_000,
        };
        let result = std::thread::spawn(move || apply(&sched, RtMode::Strict))
            .join()
            .unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn sleep_waits_at_least_the_duration() {
        let start = std::time::Instant::now();
        sleep(Duration::from_millis(5));
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn zero_sleep_returns_immediately() {
        sleep(Duration::ZERO);
    }
}
