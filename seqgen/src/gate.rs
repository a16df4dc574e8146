/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Counting release gate between the sequencer and one service worker.
//!
//! A gate is a single-waiter counting semaphore:
//!
//! * [`signal`](ReleaseGate::signal) adds one pending release and unparks the
//!   waiter.  It never blocks and never takes a lock, so the tick thread can
//!   call it at the highest priority without risking inversion.
//! * [`wait`](ReleaseGate::wait) parks the worker until at least one release
//!   is pending, then consumes exactly one.
//!
//! Pending releases accumulate as a count: a busy worker that misses several
//! signals drains them one `wait` at a time, in order.
//!
//! The first thread to call `wait` becomes the gate's waiter for good; a
//! different thread calling `wait` afterwards gets [`GateError::ForeignWaiter`].

use std::sync::atomic::{fence, AtomicU64, Ordering};
use std::sync::OnceLock;
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Misuse of a [`ReleaseGate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// `wait` was called from a thread other than the registered waiter.
    #[error("release gate already bound to thread {bound:?}, wait called from {caller:?}")]
    ForeignWaiter {
        bound: Option<String>,
        caller: Option<String>,
    },
}

/// Counting release gate.  See the [module docs](self).
#[derive(Debug, Default)]
pub struct ReleaseGate {
    pending: AtomicU64,
    signaled: AtomicU64,
    waiter: OnceLock<Thread>,
}

impl ReleaseGate {
    /// A gate with no pending releases.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one pending release and wake the waiter if it is parked.
    pub fn signal(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.signaled.fetch_add(1, Ordering::Relaxed);
        fence(Ordering::SeqCst);
        // If no waiter is registered yet it will see the count on its first
        // check, since registration happens before that check.
        if let Some(waiter) = self.waiter.get() {
            waiter.unpark();
        }
    }

    /// Block until a release is pending, then consume it.
    pub fn wait(&self) -> Result<(), GateError> {
        self.bind_current()?;
        loop {
            if self.try_acquire() {
                return Ok(());
            }
            thread::park();
        }
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`.
    ///
    /// Returns `Ok(true)` if a release was consumed.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool, GateError> {
        self.bind_current()?;
        let deadline = Instant::now() + timeout;
        loop {
            if self.try_acquire() {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            thread::park_timeout(deadline - now);
        }
    }

    /// Consume one pending release without blocking.
    pub fn try_acquire(&self) -> bool {
        self.pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Releases signaled but not yet consumed.
    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::SeqCst)
    }

    /// Total number of `signal` calls over the gate's lifetime.
    pub fn signaled(&self) -> u64 {
        self.signaled.load(Ordering::Relaxed)
    }

    fn bind_current(&self) -> Result<(), GateError> {
        let current = thread::current();
        let bound = self.waiter.get_or_init(|| current.clone());
        // Pairs with the fence in `signal`: either the signaller sees the
        // waiter or the waiter sees the pending count.
        fence(Ordering::SeqCst);
        if bound.id() != current.id() {
            return Err(GateError::ForeignWaiter {
                bound: bound.name().map(str::to_owned),
                caller: current.name().map(str::to_owned),
            });
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn new_gate_has_nothing_pending() {
        let gate = ReleaseGate::new();
        assert_eq!(gate.pending(), 0);
        assert!(!gate.try_acquire());
    }

    #[test]
    fn signals_accumulate_as_a_count() {
        let gate = ReleaseGate::new();
        gate.signal();
        gate.signal();
        gate.signal();
        assert_eq!(gate.pending(), 3);
        assert_eq!(gate.signaled(), 3);

        assert!(gate.try_acquire());
        assert!(gate.try_acquire());
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire(), "count never goes negative");
        assert_eq!(gate.pending(), 0);
        assert_eq!(gate.signaled(), 3);
    }

    #[test]
    fn wait_returns_immediately_when_release_pending() {
        let gate = ReleaseGate::new();
        gate.signal();
        gate.wait().unwrap();
        assert_eq!(gate.pending(), 0);
    }

    #[test]
    fn wait_timeout_expires_without_signal() {
        let gate = ReleaseGate::new();
        assert!(!gate.wait_timeout(Duration::from_millis(10)).unwrap());
    }

    #[test]
    fn blocked_waiter_is_woken_by_signal() {
        let gate = Arc::new(ReleaseGate::new());
        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.wait_timeout(Duration::from_secs(5)).unwrap())
        };
        thread::sleep(Duration::from_millis(20));
        gate.signal();
        assert!(waiter.join().unwrap(), "waiter must consume the release");
        assert_eq!(gate.pending(), 0);
    }

    #[test]
    fn waiter_drains_backlog_one_release_per_wait() {
        let gate = Arc::new(ReleaseGate::new());
        for _ in 0..5 {
            gate.signal();
        }
        let consumer = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                let mut n = 0;
                while gate.wait_timeout(Duration::from_millis(50)).unwrap() {
                    n += 1;
                }
                n
            })
        };
        assert_eq!(consumer.join().unwrap(), 5);
    }

    #[test]
    fn second_thread_cannot_wait_on_bound_gate() {
        let gate = Arc::new(ReleaseGate::new());
        gate.signal();
        gate.wait().unwrap();

        let other = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.wait_timeout(Duration::from_millis(1)))
        };
        assert!(matches!(
            other.join().unwrap(),
            Err(GateError::ForeignWaiter { .. })
        ));
    }

    #[test]
    fn no_signal_lost_under_concurrent_signalling() {
        let gate = Arc::new(ReleaseGate::new());
        let consumer = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                let mut n = 0u64;
                while gate.wait_timeout(Duration::from_millis(200)).unwrap() {
                    n += 1;
                }
                n
            })
        };
        for _ in 0..1_000 {
            gate.signal();
        }
        assert_eq!(consumer.join().unwrap(), 1_000);
    }
}
