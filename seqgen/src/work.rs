/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Unit-of-work callback invoked once per service release.
//!
//! A [`Work`] implementation runs synchronously on the service's worker
//! thread and must be bounded.  It reports one of three outcomes:
//!
//! * `Ok(Completion::Continue)`: release handled, keep going;
//! * `Ok(Completion::RequestStop)`: release handled, ask the sequencer to
//!   shut the whole system down (cooperative, takes effect on the next tick);
//! * `Err(WorkError)`: release failed; recorded in the event, never fatal.
//!
//! Closures `FnMut(&ReleaseContext) -> Result<Completion, WorkError>` are
//! accepted directly.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::service::{ServiceSpec, WorkKind};

// ── Types ─────────────────────────────────────────────────────────────────────

/// What the worker knows about the release it is handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseContext {
    pub service: usize,
    pub name: String,
    /// 1-based, gapless per service.
    pub sequence: u64,
}

/// Outcome of a successful release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Continue,
    RequestStop,
}

/// A failed release.  Carried into the event, then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct WorkError {
    pub message: String,
}

impl WorkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ── Trait ─────────────────────────────────────────────────────────────────────

/// One unit of work per release.  See the [module docs](self).
pub trait Work: Send {
    fn run(&mut self, ctx: &ReleaseContext) -> Result<Completion, WorkError>;
}

impl<F> Work for F
where
    F: FnMut(&ReleaseContext) -> Result<Completion, WorkError> + Send,
{
    fn run(&mut self, ctx: &ReleaseContext) -> Result<Completion, WorkError> {
        self(ctx)
    }
}

// ── Built-in units ────────────────────────────────────────────────────────────

/// No-op stub.
#[derive(Debug, Default, Clone, Copy)]
pub struct Idle;

impl Work for Idle {
    fn run(&mut self, _ctx: &ReleaseContext) -> Result<Completion, WorkError> {
        Ok(Completion::Continue)
    }
}

/// Busy-spin for a fixed duration to emulate CPU load.
#[derive(Debug, Clone, Copy)]
pub struct Spin(pub Duration);

impl Work for Spin {
    fn run(&mut self, _ctx: &ReleaseContext) -> Result<Completion, WorkError> {
        let start = Instant::now();
        while start.elapsed() < self.0 {
            std::hint::spin_loop();
        }
        Ok(Completion::Continue)
    }
}

/// Wraps another unit and requests completion once `limit` releases have
/// completed successfully.
pub struct StopAfter {
    limit: u64,
    done: u64,
    inner: Box<dyn Work>,
}

impl StopAfter {
    pub fn new(limit: u64, inner: Box<dyn Work>) -> Self {
        Self {
            limit,
            done: 0,
            inner,
        }
    }

    /// Releases completed so far.
    pub fn done(&self) -> u64 {
        self.done
    }
}

impl Work for StopAfter {
    fn run(&mut self, ctx: &ReleaseContext) -> Result<Completion, WorkError> {
        let inner = self.inner.run(ctx)?;
        self.done += 1;
        if self.done >= self.limit {
            Ok(Completion::RequestStop)
        } else {
            Ok(inner)
        }
    }
}

/// Build the built-in unit described by a service spec.
pub fn from_spec(spec: &ServiceSpec) -> Box<dyn Work> {
    let base: Box<dyn Work> = match spec.work {
        WorkKind::Idle => Box::new(Idle),
        WorkKind::Spin { micros } => Box::new(Spin(Duration::from_micros(micros))),
    };
    match spec.stop_after {
        Some(limit) => Box::new(StopAfter::new(limit, base)),
        None => base,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
