/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Cooperative stop protocol shared by the sequencer and its workers.
//!
//! ```text
//!             request_stop()            next tick / forced pass
//!   ACTIVE ─────────────────► (stop requested) ──────────────────► STOPPING
//!                                                   │
//!                                 per service:  RUNNING → ABORTED, gate signaled once
//! ```
//!
//! The coordinator owns every per-service gate and abort flag, so there is no
//! ambient global state: the sequencer and each worker hold an
//! `Arc<ShutdownCoordinator>` handed to them at construction.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use tracing::{debug, info};

use crate::gate::ReleaseGate;

// ── Stop reason / state ───────────────────────────────────────────────────────

/// Why the system left the ACTIVE state.  The first reason recorded wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured tick budget was reached.
    TickBudget,
    /// A service's unit of work asked for completion.
    ServiceRequest { service: usize },
    /// An outside actor (process signal, embedding code) asked to stop.
    External,
    /// The tick source stopped firing without a stop pass.
    TickSourceStopped,
    /// Start-up failed after some workers were already running.
    StartupAborted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::TickBudget => write!(f, "tick budget reached"),
            StopReason::ServiceRequest { service } => {
                write!(f, "completion requested by service #{service}")
            }
            StopReason::External => write!(f, "external stop request"),
            StopReason::TickSourceStopped => write!(f, "tick source stopped"),
            StopReason::StartupAborted => write!(f, "start-up aborted"),
        }
    }
}

/// Global coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Active,
    Stopping,
}

// ── Per-service link ──────────────────────────────────────────────────────────

/// Gate plus abort flag for one service.
#[derive(Debug, Default)]
struct ServiceLink {
    gate: ReleaseGate,
    aborted: AtomicBool,
}

// ── ShutdownCoordinator ───────────────────────────────────────────────────────

/// Shared stop state.  See the [module docs](self).
#[derive(Debug)]
pub struct ShutdownCoordinator {
    links: Vec<ServiceLink>,
    requested: AtomicBool,
    stopping: AtomicBool,
    reason: OnceLock<StopReason>,
}

impl ShutdownCoordinator {
    /// Coordinator for `service_count` services, all RUNNING, gates empty.
    pub fn new(service_count: usize) -> Self {
        Self {
            links: (0..service_count).map(|_| ServiceLink::default()).collect(),
            requested: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
            reason: OnceLock::new(),
        }
    }

    pub fn service_count(&self) -> usize {
        self.links.len()
    }

    /// Release gate of service `id`.
    ///
    /// # Panics
    /// Panics if `id` is out of range; ids come from the derived schedule and
    /// always match the coordinator's size.
    pub fn gate(&self, id: usize) -> &ReleaseGate {
        &self.links[id].gate
    }

    /// Raise the global abort condition.
    ///
    /// Cooperative: nothing is aborted until the sequencer's next tick (or a
    /// forced [`stop_all`](Self::stop_all)).  Returns `true` for the first
    /// request; later requests are ignored apart from logging.
    pub fn request_stop(&self, reason: StopReason) -> bool {
        let first = self.reason.set(reason).is_ok();
        self.requested.store(true, Ordering::SeqCst);
        if first {
            info!(%reason, "stop requested");
        } else {
            debug!(%reason, "stop already requested, ignoring");
        }
        first
    }

    /// `true` once any stop has been requested.
    pub fn stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// The first recorded stop reason.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.reason.get().copied()
    }

    pub fn state(&self) -> CoordinatorState {
        if self.stopping.load(Ordering::SeqCst) {
            CoordinatorState::Stopping
        } else {
            CoordinatorState::Active
        }
    }

    /// ACTIVE → STOPPING: set every abort flag, then signal every gate once.
    ///
    /// Runs at most once; returns `false` if the transition already happened.
    /// `reason` is recorded only if no earlier request exists.
    pub fn stop_all(&self, reason: StopReason) -> bool {
        if self
            .stopping
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        let _ = self.reason.set(reason);
        self.requested.store(true, Ordering::SeqCst);

        // Flags before signals: a woken worker must observe its flag.
        for link in &self.links {
            link.aborted.store(true, Ordering::SeqCst);
        }
        for link in &self.links {
            link.gate.signal();
        }

        info!(
            reason = %self.stop_reason().unwrap_or(reason),
            services = self.links.len(),
            "all services aborted and force-signaled"
        );
        true
    }

    /// Abort flag of service `id`.
    pub fn is_aborted(&self, id: usize) -> bool {
        self.links
            .get(id)
            .map(|l| l.aborted.load(Ordering::SeqCst))
            .unwrap_or(true)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
