/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-service worker loop.
//!
//! One parameterised [`ServiceWorker`] serves every service:
//!
//! ```text
//! loop {
//!     gate.wait()                    // the only suspension point
//!     if aborted { return }          // no work after shutdown
//!     sequence += 1
//!     work.run(ctx)                  // once, synchronously
//!     sink.record(event)             // timestamp taken after work
//! }
//! ```
//!
//! Releases that were still pending when the abort flag went up are
//! discarded.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::event::{EventOutcome, EventSink, ReleaseEvent, RunClock};
use crate::gate::GateError;
use crate::rt;
use crate::service::ServiceSpec;
use crate::shutdown::{ShutdownCoordinator, StopReason};
use crate::work::{Completion, ReleaseContext, Work};

/// Counters a worker hands back when it exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    /// Releases for which work was invoked.
    pub performed: u64,
    /// Releases whose work returned an error.
    pub failures: u64,
}

pub struct ServiceWorker {
    spec: ServiceSpec,
    work: Box<dyn Work>,
    shutdown: Arc<ShutdownCoordinator>,
    sink: Arc<dyn EventSink>,
    clock: RunClock,
    rate_hz: f64,
}

impl ServiceWorker {
    /// `tick_period` is the sequencer's; it only feeds the rate in events.
    pub fn new(
        spec: ServiceSpec,
        work: Box<dyn Work>,
        shutdown: Arc<ShutdownCoordinator>,
        sink: Arc<dyn EventSink>,
        clock: RunClock,
        tick_period: Duration,
    ) -> Self {
        Self {
            rate_hz: spec.rate_hz(tick_period),
            spec,
            work,
            shutdown,
            sink,
            clock,
        }
    }

    pub fn spec(&self) -> &ServiceSpec {
        &self.spec
    }

    /// Run until the service's abort flag is observed after a wake.
    ///
    /// Must be called on the thread that will own the gate for the whole run.
    pub fn run(mut self) -> Result<WorkerSummary, GateError> {
        let id = self.spec.id;
        let gate = self.shutdown.gate(id);
        let mut sequence = 0u64;
        let mut summary = WorkerSummary::default();

        debug!(service = %self.spec.name, "worker waiting for first release");

        loop {
            gate.wait()?;

            if self.shutdown.is_aborted(id) {
                break;
            }

            sequence += 1;
            let ctx = ReleaseContext {
                service: id,
                name: self.spec.name.clone(),
                sequence,
            };
            let result = self.work.run(&ctx);
            let (timestamp, elapsed) = self.clock.now();

            summary.performed += 1;
            let outcome = match result {
                Ok(Completion::Continue) => EventOutcome::Ok,
                Ok(Completion::RequestStop) => {
                    self.shutdown
                        .request_stop(StopReason::ServiceRequest { service: id });
                    EventOutcome::Ok
                }
                Err(e) => {
                    summary.failures += 1;
                    EventOutcome::Failed(e.message)
                }
            };

            self.sink.record(ReleaseEvent {
                service: id,
                name: self.spec.name.clone(),
                rate_hz: self.rate_hz,
                sequence,
                core: rt::current_core(),
                timestamp,
                elapsed,
                outcome,
            });
        }

        info!(
            service = %self.spec.name,
            performed = summary.performed,
            failures = summary.failures,
            discarded = gate.pending(),
            "worker exiting"
        );
        Ok(summary)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MemorySink;
    use crate::service::WorkKind;
    use crate::work::{Idle, WorkError};
    use std::thread;

    fn spec(id: usize, divisor: u64) -> ServiceSpec {
        ServiceSpec {
            id,
            name: format!("S{}", id + 1),
            divisor,
            priority_rank: id,
            priority: 98 - id as i32,
            core: 2,
            wcet_us: None,
            work: WorkKind::Idle,
            stop_after: None,
        }
    }

    fn spawn(
        work: Box<dyn Work>,
        shutdown: &Arc<ShutdownCoordinator>,
        sink: &Arc<MemorySink>,
    ) -> thread::JoinHandle<Result<WorkerSummary, GateError>> {
        spawn_with_divisor(1, work, shutdown, sink)
    }

    fn spawn_with_divisor(
        divisor: u64,
        work: Box<dyn Work>,
        shutdown: &Arc<ShutdownCoordinator>,
        sink: &Arc<MemorySink>,
    ) -> thread::JoinHandle<Result<WorkerSummary, GateError>> {
        let worker = ServiceWorker::new(
            spec(0, divisor),
            work,
            Arc::clone(shutdown),
            sink.clone(),
            RunClock::start(),
            Duration::from_millis(10),
        );
        thread::spawn(move || worker.run())
    }

    #[test]
    fn backlog_of_k_produces_k_ordered_iterations() {
        let shutdown = Arc::new(ShutdownCoordinator::new(1));
        let sink = Arc::new(MemorySink::new());
        for _ in 0..5 {
            shutdown.gate(0).signal();
        }

        let handle = spawn(Box::new(Idle), &shutdown, &sink);
        while sink.len() < 5 {
            thread::yield_now();
        }
        shutdown.stop_all(StopReason::External);

        let summary = handle.join().unwrap().unwrap();
        assert_eq!(summary.performed, 5);
        let seqs: Vec<u64> = sink.events_for(0).iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn events_carry_the_service_rate() {
        let shutdown = Arc::new(ShutdownCoordinator::new(1));
        let sink = Arc::new(MemorySink::new());
        shutdown.gate(0).signal();

        // divisor 4 on a 10 ms tick
        let handle = spawn_with_divisor(4, Box::new(Idle), &shutdown, &sink);
        while sink.is_empty() {
            thread::yield_now();
        }
        shutdown.stop_all(StopReason::External);
        handle.join().unwrap().unwrap();

        let events = sink.snapshot();
        assert_eq!(events.len(), 1);
        assert!((events[0].rate_hz - 25.0).abs() < 1e-9, "rate = {}", events[0].rate_hz);
    }

    #[test]
    fn aborted_worker_does_no_work_for_pending_releases() {
        let shutdown = Arc::new(ShutdownCoordinator::new(1));
        let sink = Arc::new(MemorySink::new());
        shutdown.gate(0).signal();
        shutdown.gate(0).signal();
        shutdown.stop_all(StopReason::TickBudget);

        let summary = spawn(Box::new(Idle), &shutdown, &sink)
            .join()
            .unwrap()
            .unwrap();
        assert_eq!(summary.performed, 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn failures_are_recorded_and_loop_continues() {
        let shutdown = Arc::new(ShutdownCoordinator::new(1));
        let sink = Arc::new(MemorySink::new());
        let failing = |_: &ReleaseContext| -> Result<Completion, WorkError> {
            Err(WorkError::new("device busy"))
        };
        for _ in 0..3 {
            shutdown.gate(0).signal();
        }

        let handle = spawn(Box::new(failing), &shutdown, &sink);
        while sink.len() < 3 {
            thread::yield_now();
        }
        shutdown.stop_all(StopReason::External);

        let summary = handle.join().unwrap().unwrap();
        assert_eq!(summary, WorkerSummary { performed: 3, failures: 3 });
        assert!(sink
            .snapshot()
            .iter()
            .all(|e| e.outcome == EventOutcome::Failed("device busy".into())));
    }

    #[test]
    fn request_stop_raises_global_condition_only() {
        let shutdown = Arc::new(ShutdownCoordinator::new(1));
        let sink = Arc::new(MemorySink::new());
        let stopper = |_: &ReleaseContext| -> Result<Completion, WorkError> {
            Ok(Completion::RequestStop)
        };
        shutdown.gate(0).signal();

        let handle = spawn(Box::new(stopper), &shutdown, &sink);
        while sink.is_empty() {
            thread::yield_now();
        }
        assert!(shutdown.stop_requested());
        assert_eq!(
            shutdown.stop_reason(),
            Some(StopReason::ServiceRequest { service: 0 })
        );
        // still waiting: the stop pass belongs to the sequencer
        assert!(!handle.is_finished());

        shutdown.stop_all(StopReason::TickBudget);
        assert_eq!(handle.join().unwrap().unwrap().performed, 1);
    }
}
