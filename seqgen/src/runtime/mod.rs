/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Start-up and shutdown orchestration.
//!
//! ```text
//! SequencerRuntime::launch
//!   ├─ spawn one "seqgen-<service>" thread per service
//!   │     └─ apply ThreadSchedule → report ready → ServiceWorker::run
//!   ├─ wait for every ready report        (any failure → stop + join + Err)
//!   └─ arm the tick source with Sequencer::on_tick
//!
//! RunningSequencer::wait
//!   ├─ wait for the tick source to stop
//!   ├─ force a stop pass if it stopped without one
//!   └─ join every worker within the bounded wait → RunReport
//! ```

pub mod error;
pub mod report;

pub use error::RuntimeError;
pub use report::{EventMismatch, ReleaseMismatch, RunReport, ServiceReport};

use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::event::{EventSink, RunClock, TracingSink};
use crate::gate::GateError;
use crate::rt::{self, Placement, RtError};
use crate::schedule::ScheduleConfig;
use crate::sequencer::{ReleaseCounters, Sequencer};
use crate::shutdown::{CoordinatorState, ShutdownCoordinator, StopReason};
use crate::tick::{PeriodicTimer, TickSource, TickStats};
use crate::work::{self, Work};
use crate::worker::{ServiceWorker, WorkerSummary};

/// Default bounded wait for joining workers at shutdown.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

const JOIN_POLL: Duration = Duration::from_millis(1);

type WorkerHandle = JoinHandle<Result<WorkerSummary, GateError>>;

// ── SequencerRuntime ──────────────────────────────────────────────────────────

/// A derived schedule plus the sink its events go to, ready to launch.
pub struct SequencerRuntime {
    config: ScheduleConfig,
    sink: Arc<dyn EventSink>,
}

impl SequencerRuntime {
    pub fn new(config: ScheduleConfig) -> Self {
        Self {
            config,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Launch with each service's built-in work and a [`PeriodicTimer`] on
    /// the sequencer's priority and core.
    pub fn launch_default(self) -> Result<RunningSequencer, RuntimeError> {
        let works = self.config.services().iter().map(work::from_spec).collect();
        let timer = PeriodicTimer::new(self.config.tick_period())
            .with_schedule(self.config.sequencer_schedule(), self.config.rt_mode());
        self.launch(works, Box::new(timer))
    }

    /// Start every worker, then arm `ticks`.
    ///
    /// `works[i]` serves service `i`.  On any failure the workers already
    /// started are stopped and joined before the error is returned.
    pub fn launch(
        self,
        works: Vec<Box<dyn Work>>,
        mut ticks: Box<dyn TickSource>,
    ) -> Result<RunningSequencer, RuntimeError> {
        let specs = self.config.services();
        if works.len() != specs.len() {
            return Err(RuntimeError::WorkMismatch {
                expected: specs.len(),
                got: works.len(),
            });
        }

        let shutdown = Arc::new(ShutdownCoordinator::new(specs.len()));
        let clock = RunClock::start();
        let rt_mode = self.config.rt_mode();
        let mut workers: Vec<(String, WorkerHandle)> = Vec::with_capacity(specs.len());

        let (ready_tx, ready_rx) = mpsc::channel::<(usize, Result<Placement, RtError>)>();

        for (spec, work) in specs.iter().zip(works) {
            let schedule = self.config.service_schedule(spec);
            let worker = ServiceWorker::new(
                spec.clone(),
                work,
                Arc::clone(&shutdown),
                Arc::clone(&self.sink),
                clock,
                self.config.tick_period(),
            );
            let id = spec.id;
            let tx = ready_tx.clone();

            let spawned = thread::Builder::new()
                .name(format!("seqgen-{}", spec.name))
                .spawn(move || {
                    let applied = rt::apply(&schedule, rt_mode);
                    let failed = applied.is_err();
                    let _ = tx.send((id, applied));
                    drop(tx);
                    if failed {
                        return Ok(WorkerSummary::default());
                    }
                    worker.run()
                });

            match spawned {
                Ok(handle) => workers.push((spec.name.clone(), handle)),
                Err(source) => {
                    abort_startup(&shutdown, workers);
                    return Err(RuntimeError::Spawn {
                        service: spec.name.clone(),
                        source,
                    });
                }
            }
        }
        drop(ready_tx);

        // Collect one ready report per worker before the first tick.
        for _ in 0..workers.len() {
            match ready_rx.recv() {
                Ok((id, Ok(placement))) => debug!(
                    service = %specs[id].name,
                    fixed_priority = placement.fixed_priority,
                    pinned = placement.pinned,
                    "worker ready"
                ),
                Ok((id, Err(source))) => {
                    let service = specs[id].name.clone();
                    error!(%service, error = %source, "worker real-time setup failed");
                    abort_startup(&shutdown, workers);
                    return Err(RuntimeError::RtSetup { service, source });
                }
                Err(_) => {
                    abort_startup(&shutdown, workers);
                    return Err(RuntimeError::WorkerLost);
                }
            }
        }

        let mut sequencer = Sequencer::new(
            specs.iter().map(|s| s.divisor).collect(),
            self.config.max_ticks(),
            Arc::clone(&shutdown),
        );
        let counters = sequencer.counters();

        if let Err(e) = ticks.arm(Box::new(move || sequencer.on_tick())) {
            error!(error = %e, "failed to arm tick source");
            abort_startup(&shutdown, workers);
            return Err(RuntimeError::Tick(e));
        }

        info!(
            services = specs.len(),
            period_us = self.config.tick_period().as_micros() as u64,
            max_ticks = ?self.config.max_ticks(),
            "sequencer running"
        );

        Ok(RunningSequencer {
            config: self.config,
            shutdown,
            counters,
            ticks,
            workers,
        })
    }
}

/// Stop and join whatever was started; errors are already being reported.
fn abort_startup(shutdown: &ShutdownCoordinator, workers: Vec<(String, WorkerHandle)>) {
    shutdown.stop_all(StopReason::StartupAborted);
    for (_, handle) in workers {
        let _ = handle.join();
    }
}

// ── RunningSequencer ──────────────────────────────────────────────────────────

/// A launched system.  Drive it to completion with [`wait`](Self::wait).
pub struct RunningSequencer {
    config: ScheduleConfig,
    shutdown: Arc<ShutdownCoordinator>,
    counters: Arc<ReleaseCounters>,
    ticks: Box<dyn TickSource>,
    workers: Vec<(String, WorkerHandle)>,
}

impl RunningSequencer {
    /// Coordinator for external stop requests.
    pub fn shutdown_handle(&self) -> Arc<ShutdownCoordinator> {
        Arc::clone(&self.shutdown)
    }

    pub fn counters(&self) -> Arc<ReleaseCounters> {
        Arc::clone(&self.counters)
    }

    /// Block until the run ends, then join every worker within
    /// `join_timeout` (shared by all workers).
    pub fn wait(mut self, join_timeout: Duration) -> Result<RunReport, RuntimeError> {
        let tick_result = self.ticks.wait();

        if self.shutdown.state() == CoordinatorState::Active {
            debug!("tick source ended without a stop pass, forcing one");
            self.ticks.disarm();
            self.shutdown.stop_all(StopReason::TickSourceStopped);
        }

        let summaries = join_all(std::mem::take(&mut self.workers), join_timeout)?;
        let stats: TickStats = tick_result?;

        let signaled = self.counters.all_releases();
        let services = self
            .config
            .services()
            .iter()
            .zip(summaries)
            .map(|(spec, summary)| ServiceReport {
                name: spec.name.clone(),
                divisor: spec.divisor,
                signaled: signaled[spec.id],
                performed: summary.performed,
                failures: summary.failures,
            })
            .collect();

        Ok(RunReport {
            ticks: self.counters.ticks(),
            stop_reason: self.shutdown.stop_reason(),
            skipped: stats.skipped,
            services,
        })
    }
}

fn join_all(
    workers: Vec<(String, WorkerHandle)>,
    timeout: Duration,
) -> Result<Vec<WorkerSummary>, RuntimeError> {
    let deadline = Instant::now() + timeout;
    let mut summaries = Vec::with_capacity(workers.len());

    for (service, handle) in workers {
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                error!(%service, ?timeout, "worker did not exit in time");
                return Err(RuntimeError::JoinTimeout { service, timeout });
            }
            thread::sleep(JOIN_POLL);
        }
        match handle.join() {
            Ok(Ok(summary)) => summaries.push(summary),
            Ok(Err(source)) => return Err(RuntimeError::Gate { service, source }),
            Err(_) => return Err(RuntimeError::WorkerPanicked { service }),
        }
    }
    debug!(workers = summaries.len(), "all workers joined");
    Ok(summaries)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{MemorySink, Tee};
    use crate::rt::DEFAULT_PRIORITY_RANGE;
    use crate::schedule::SequencerSettings;
    use crate::service::ServiceDecl;

    fn config(decls: Vec<ServiceDecl>, max_ticks: u64) -> ScheduleConfig {
        let settings = SequencerSettings {
            tick_period: Duration::from_millis(1),
            max_ticks: Some(max_ticks),
            ..Default::default()
        };
        ScheduleConfig::derive(settings, decls, DEFAULT_PRIORITY_RANGE).unwrap()
    }

    #[test]
    fn work_count_must_match_services() {
        let rt = SequencerRuntime::new(config(vec![ServiceDecl::new("a", 1)], 5));
        let err = rt
            .launch(vec![], Box::new(PeriodicTimer::new(Duration::from_millis(1))))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            RuntimeError::WorkMismatch {
                expected: 1,
                got: 0
            }
        ));
    }

    #[test]
    fn default_launch_runs_budget_and_reports() {
        let sink = Arc::new(MemorySink::new());
        let cfg = config(
            vec![ServiceDecl::new("fast", 2), ServiceDecl::new("slow", 5)],
            20,
        );
        let report = SequencerRuntime::new(cfg)
            .with_sink(sink.clone())
            .launch_default()
            .unwrap()
            .wait(DEFAULT_JOIN_TIMEOUT)
            .unwrap();

        assert_eq!(report.ticks, 20);
        assert_eq!(report.stop_reason, Some(StopReason::TickBudget));
        assert_eq!(report.service("fast").unwrap().signaled, 10);
        assert_eq!(report.service("slow").unwrap().signaled, 4);
        assert!(report.release_mismatches().is_empty());
        for s in &report.services {
            assert!(s.performed <= s.signaled);
        }
        assert_eq!(sink.len() as u64, report.services.iter().map(|s| s.performed).sum::<u64>());
    }

    #[test]
    fn tee_with_memory_sink_matches_worker_counters() {
        let recorded = Arc::new(MemorySink::new());
        let tee = Tee::new()
            .with(Arc::new(TracingSink))
            .with(recorded.clone());
        let cfg = config(
            vec![ServiceDecl::new("acquire", 1), ServiceDecl::new("store", 4)],
            12,
        );
        let report = SequencerRuntime::new(cfg)
            .with_sink(Arc::new(tee))
            .launch_default()
            .unwrap()
            .wait(DEFAULT_JOIN_TIMEOUT)
            .unwrap();

        assert!(report.event_mismatches(&recorded.snapshot()).is_empty());
        let acquire = recorded.events_for(0);
        assert_eq!(acquire.len() as u64, report.service("acquire").unwrap().performed);
        // divisor 1 on a 1 ms tick
        assert!(acquire.iter().all(|e| (e.rate_hz - 1000.0).abs() < 1e-6));
    }
}
