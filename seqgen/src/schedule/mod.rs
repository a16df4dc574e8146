/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Static schedule derivation.
//!
//! [`ScheduleConfig::derive`] turns the declared service set into immutable
//! [`ServiceSpec`]s, assigning:
//!
//! * **priorities** by rate-monotonic order: the sequencer gets the top of
//!   the platform range, then services by ascending divisor, ties broken by
//!   declaration order, each on its own distinct level;
//! * **cores** by a fixed partition: the sequencer gets the first configured
//!   core, services alternate over the remaining cores by declaration index.
//!
//! For the default seven-service set on cores `[1, 2, 3]` this yields:
//!
//! | Thread | Rate | Divisor | Priority | Core |
//! |---|---|---|---|---|
//! | Sequencer | 100 Hz | – | 99 | 1 |
//! | S1 | 50 Hz | 2 | 98 | 2 |
//! | S2 | 20 Hz | 5 | 97 | 3 |
//! | S3 | 10 Hz | 10 | 96 | 2 |
//! | S4 | 5 Hz | 20 | 95 | 3 |
//! | S5 | 2 Hz | 50 | 94 | 2 |
//! | S6 | 1 Hz | 100 | 93 | 3 |
//! | S7 | 1 Hz | 100 | 92 | 2 |
//!
//! The result is computed once and never changes afterwards.

pub mod error;
pub mod feasibility;
pub mod math;

pub use error::ConfigError;

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::rt::{PriorityRange, RtMode, ThreadSchedule};
use crate::service::{ServiceDecl, ServiceSpec};

use feasibility::{check_liu_layland, liu_layland_bound};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Default sequencer tick period: 10 ms (100 Hz), the Linux jiffy rate.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(10);

/// Default core partition: sequencer on core 1, services on cores 2 and 3,
/// leaving core 0 for the kernel and non-RT load.
pub const DEFAULT_CORES: [u32; 3] = [1, 2, 3];

// ── SequencerSettings ─────────────────────────────────────────────────────────

/// Sequencer-wide settings, independent of the service set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerSettings {
    /// Tick period of the sequencer.
    pub tick_period: Duration,

    /// Stop after this many ticks.  `None` runs until a service or an
    /// external actor requests a stop.
    pub max_ticks: Option<u64>,

    /// Cores available to the system.  The first one is reserved for the
    /// sequencer.
    pub cores: Vec<u32>,

    /// Reaction to refused priority / affinity requests.
    pub rt_mode: RtMode,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self {
            tick_period: DEFAULT_TICK_PERIOD,
            max_ticks: None,
            cores: DEFAULT_CORES.to_vec(),
            rt_mode: RtMode::default(),
        }
    }
}

// ── ScheduleConfig ────────────────────────────────────────────────────────────

/// Immutable, fully-derived schedule.  See the [module docs](self).
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    settings: SequencerSettings,
    sequencer: ThreadSchedule,
    services: Vec<ServiceSpec>,
    major_cycle: Option<u64>,
}

impl ScheduleConfig {
    /// Validate `decls` and derive priorities and cores.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] naming the first invalid value.  Nothing is
    /// partially applied.
    pub fn derive(
        settings: SequencerSettings,
        decls: Vec<ServiceDecl>,
        range: PriorityRange,
    ) -> Result<Self, ConfigError> {
        // ── Preconditions ─────────────────────────────────────────────────────
        if decls.is_empty() {
            return Err(ConfigError::NoServices);
        }
        if settings.tick_period.is_zero() {
            return Err(ConfigError::ZeroPeriod);
        }
        if settings.max_ticks == Some(0) {
            return Err(ConfigError::ZeroTickBudget);
        }
        if settings.cores.is_empty() {
            return Err(ConfigError::NoCores);
        }

        let mut seen = HashSet::new();
        for (index, d) in decls.iter().enumerate() {
            if d.name.is_empty() {
                return Err(ConfigError::EmptyName { index });
            }
            if d.divisor == 0 {
                return Err(ConfigError::ZeroDivisor {
                    service: d.name.clone(),
                });
            }
            if d.stop_after == Some(0) {
                return Err(ConfigError::ZeroStopAfter {
                    service: d.name.clone(),
                });
            }
            if !seen.insert(d.name.as_str()) {
                return Err(ConfigError::DuplicateService {
                    service: d.name.clone(),
                });
            }
        }

        // Sequencer on the top level, every service strictly below it.
        if range.levels() < decls.len() + 1 {
            return Err(ConfigError::PriorityRangeExhausted {
                needed: decls.len(),
                min: range.min,
                max: range.max,
            });
        }

        let ranks = rate_monotonic_ranks(&decls);
        let (sequencer_core, service_cores) = partition_cores(&settings.cores, decls.len());

        if settings.cores.len() == 1 {
            warn!(
                core = sequencer_core,
                "only one core configured: sequencer and services share it"
            );
        }

        let divisors: Vec<u64> = decls.iter().map(|d| d.divisor).collect();
        // Informational only; a cycle past u64 does not make the set invalid.
        let major_cycle = match math::major_cycle(&divisors) {
            Ok(cycle) => Some(cycle),
            Err(e) => {
                warn!(error = %e, "major cycle exceeds u64, not reported");
                None
            }
        };

        let services: Vec<ServiceSpec> = decls
            .into_iter()
            .enumerate()
            .map(|(id, d)| {
                let rank = ranks[id];
                ServiceSpec {
                    id,
                    name: d.name,
                    divisor: d.divisor,
                    priority_rank: rank,
                    priority: range.max - 1 - rank as i32,
                    core: service_cores[id],
                    wcet_us: d.wcet_us,
                    work: d.work,
                    stop_after: d.stop_after,
                }
            })
            .collect();

        for s in &services {
            debug!(
                service = %s.name,
                divisor = s.divisor,
                rank = s.priority_rank,
                priority = s.priority,
                core = s.core,
                "service derived"
            );
        }

        Ok(Self {
            sequencer: ThreadSchedule {
                priority: range.max,
                core: sequencer_core,
            },
            settings,
            services,
            major_cycle,
        })
    }

    pub fn settings(&self) -> &SequencerSettings {
        &self.settings
    }

    pub fn tick_period(&self) -> Duration {
        self.settings.tick_period
    }

    pub fn max_ticks(&self) -> Option<u64> {
        self.settings.max_ticks
    }

    pub fn rt_mode(&self) -> RtMode {
        self.settings.rt_mode
    }

    /// Services in declaration order (index == `ServiceSpec::id`).
    pub fn services(&self) -> &[ServiceSpec] {
        &self.services
    }

    pub fn service(&self, id: usize) -> Option<&ServiceSpec> {
        self.services.get(id)
    }

    /// Priority and core of the tick thread.
    pub fn sequencer_schedule(&self) -> ThreadSchedule {
        self.sequencer
    }

    /// Priority and core of a service's worker thread.
    pub fn service_schedule(&self, spec: &ServiceSpec) -> ThreadSchedule {
        ThreadSchedule {
            priority: spec.priority,
            core: spec.core,
        }
    }

    /// Ticks after which the release pattern repeats (LCM of divisors), or
    /// `None` when that does not fit in a `u64`.
    pub fn major_cycle(&self) -> Option<u64> {
        self.major_cycle
    }

    /// Releases each service receives over `ticks`, in declaration order.
    pub fn expected_releases(&self, ticks: u64) -> Vec<u64> {
        self.services.iter().map(|s| s.releases_over(ticks)).collect()
    }

    /// Run the Liu & Layland check for every core and return the cores whose
    /// declared utilisation exceeds the bound, as `(core, utilisation, bound)`.
    pub fn feasibility_warnings(&self) -> Vec<(u32, f64, f64)> {
        let mut by_core: BTreeMap<u32, Vec<&ServiceSpec>> = BTreeMap::new();
        for s in &self.services {
            by_core.entry(s.core).or_default().push(s);
        }

        let mut out = Vec::new();
        for (core, specs) in by_core {
            if let Some(total) = check_liu_layland(&specs, self.tick_period()) {
                let n = specs.iter().filter(|s| s.wcet_us.is_some()).count();
                out.push((core, total, liu_layland_bound(n)));
            }
        }
        out
    }

    /// Log the derived schedule and any feasibility warnings.
    pub fn log_summary(&self) {
        info!(
            tick_period_us = self.tick_period().as_micros() as u64,
            max_ticks = ?self.max_ticks(),
            major_cycle = ?self.major_cycle,
            rt_mode = ?self.rt_mode(),
            "schedule derived"
        );
        info!(
            priority = self.sequencer.priority,
            core = self.sequencer.core,
            rate_hz = 1.0 / self.tick_period().as_secs_f64(),
            "  [Sequencer]"
        );
        for s in &self.services {
            info!(
                divisor = s.divisor,
                rate_hz = s.rate_hz(self.tick_period()),
                priority = s.priority,
                core = s.core,
                work = s.work.label(),
                "  [{}]",
                s.name
            );
        }
        for (core, utilization, bound) in self.feasibility_warnings() {
            warn!(
                core,
                utilization,
                bound,
                "declared load may not be RM-schedulable (exceeds Liu & Layland bound)"
            );
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Derivation helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Rate-monotonic rank per declaration index.
///
/// Smaller divisor (higher rate) → smaller rank.  The sort is stable, so
/// equal divisors keep declaration order and still get distinct ranks.
fn rate_monotonic_ranks(decls: &[ServiceDecl]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..decls.len()).collect();
    order.sort_by_key(|&i| decls[i].divisor);

    let mut ranks = vec![0; decls.len()];
    for (rank, idx) in order.into_iter().enumerate() {
        ranks[idx] = rank;
    }
    ranks
}

/// Split `cores` into the sequencer core and one core per service.
///
/// Services alternate over `cores[1..]` by declaration index; with a single
/// core everything shares it.
fn partition_cores(cores: &[u32], services: usize) -> (u32, Vec<u32>) {
    let sequencer = cores[0];
    let pool = if cores.len() > 1 { &cores[1..] } else { cores };
    let assigned = (0..services).map(|i| pool[i % pool.len()]).collect();
    (sequencer, assigned)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
