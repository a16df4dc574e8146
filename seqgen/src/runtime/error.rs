/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Orchestration failures.
//!
//! Start-up variants are returned before any tick has fired; the remaining
//! ones come from the shutdown path and are never retried.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::gate::GateError;
use crate::rt::RtError;
use crate::tick::TickError;

#[derive(Debug, Error)]
pub enum RuntimeError {
    // ── Start-up ──────────────────────────────────────────────────────────────
    /// The number of supplied work units does not match the service set.
    #[error("expected {expected} work units (one per service), got {got}")]
    WorkMismatch { expected: usize, got: usize },

    #[error("failed to spawn worker thread for service '{service}': {source}")]
    Spawn {
        service: String,
        #[source]
        source: io::Error,
    },

    #[error("real-time setup failed for service '{service}': {source}")]
    RtSetup {
        service: String,
        #[source]
        source: RtError,
    },

    /// A worker thread died before reporting ready.
    #[error("a worker thread exited before reporting ready")]
    WorkerLost,

    #[error("tick source failure: {0}")]
    Tick(#[from] TickError),

    // ── Shutdown ──────────────────────────────────────────────────────────────
    #[error("worker '{service}' did not exit within {timeout:?}")]
    JoinTimeout { service: String, timeout: Duration },

    #[error("worker '{service}' panicked")]
    WorkerPanicked { service: String },

    #[error("worker '{service}' misused its release gate: {source}")]
    Gate {
        service: String,
        #[source]
        source: GateError,
    },
}
