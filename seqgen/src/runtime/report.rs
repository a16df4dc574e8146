/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! End-of-run summary.

use tracing::{info, warn};

use crate::event::ReleaseEvent;
use crate::shutdown::StopReason;

/// Per-service counters at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReport {
    pub name: String,
    pub divisor: u64,
    /// Releases signaled by the sequencer (force-signal excluded).
    pub signaled: u64,
    /// Releases for which work ran.
    pub performed: u64,
    pub failures: u64,
}

impl ServiceReport {
    /// Releases signaled but discarded at shutdown.
    pub fn discarded(&self) -> u64 {
        self.signaled.saturating_sub(self.performed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub ticks: u64,
    pub stop_reason: Option<StopReason>,
    /// Tick firings coalesced because the tick source ran late.
    pub skipped: u64,
    pub services: Vec<ServiceReport>,
}

/// A service whose signaled count differs from ⌊ticks / divisor⌋.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseMismatch {
    pub service: String,
    pub expected: u64,
    pub actual: u64,
}

/// A service whose recorded events disagree with its worker's counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMismatch {
    pub service: String,
    pub performed: u64,
    pub recorded: u64,
    pub failures: u64,
    pub recorded_failures: u64,
}

impl RunReport {
    pub fn service(&self, name: &str) -> Option<&ServiceReport> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Compare each service's signaled count with ⌊ticks / divisor⌋.
    pub fn release_mismatches(&self) -> Vec<ReleaseMismatch> {
        self.services
            .iter()
            .filter_map(|s| {
                let expected = self.ticks / s.divisor.max(1);
                (expected != s.signaled).then(|| ReleaseMismatch {
                    service: s.name.clone(),
                    expected,
                    actual: s.signaled,
                })
            })
            .collect()
    }

    /// Compare each service's worker counters with the events a sink
    /// recorded for it.  Every performed release yields exactly one event.
    pub fn event_mismatches(&self, events: &[ReleaseEvent]) -> Vec<EventMismatch> {
        self.services
            .iter()
            .filter_map(|s| {
                let (recorded, recorded_failures) = events
                    .iter()
                    .filter(|e| e.name == s.name)
                    .fold((0u64, 0u64), |(n, f), e| (n + 1, f + u64::from(!e.outcome.is_ok())));
                (recorded != s.performed || recorded_failures != s.failures).then(|| {
                    EventMismatch {
                        service: s.name.clone(),
                        performed: s.performed,
                        recorded,
                        failures: s.failures,
                        recorded_failures,
                    }
                })
            })
            .collect()
    }

    pub fn log(&self) {
        let reason = self
            .stop_reason
            .map(|r| r.to_string())
            .unwrap_or_else(|| "none".into());
        info!(
            ticks = self.ticks,
            skipped = self.skipped,
            stop_reason = %reason,
            "run complete"
        );
        for s in &self.services {
            info!(
                divisor = s.divisor,
                signaled = s.signaled,
                performed = s.performed,
                discarded = s.discarded(),
                failures = s.failures,
                "  [{}]",
                s.name
            );
        }
        for m in self.release_mismatches() {
            warn!(
                service = %m.service,
                expected = m.expected,
                actual = m.actual,
                "release count mismatch"
            );
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventOutcome, RunClock};

    fn report(ticks: u64, services: &[(&str, u64, u64, u64)]) -> RunReport {
        RunReport {
            ticks,
            stop_reason: Some(StopReason::TickBudget),
            skipped: 0,
            services: services
                .iter()
                .map(|&(name, divisor, signaled, performed)| ServiceReport {
                    name: name.into(),
                    divisor,
                    signaled,
                    performed,
                    failures: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn consistent_report_has_no_mismatch() {
        let r = report(100, &[("a", 4, 25, 25), ("b", 100, 1, 0)]);
        assert!(r.release_mismatches().is_empty());
        assert_eq!(r.service("b").unwrap().discarded(), 1);
    }

    #[test]
    fn mismatch_names_service_and_counts() {
        let r = report(20, &[("a", 5, 3, 3)]);
        assert_eq!(
            r.release_mismatches(),
            vec![ReleaseMismatch {
                service: "a".into(),
                expected: 4,
                actual: 3
            }]
        );
    }

    fn recorded(name: &str, sequence: u64, outcome: EventOutcome) -> ReleaseEvent {
        let (timestamp, elapsed) = RunClock::start().now();
        ReleaseEvent {
            service: 0,
            name: name.into(),
            rate_hz: 25.0,
            sequence,
            core: None,
            timestamp,
            elapsed,
            outcome,
        }
    }

    #[test]
    fn events_matching_counters_pass() {
        let mut r = report(8, &[("a", 4, 2, 2), ("b", 8, 1, 0)]);
        r.services[0].failures = 1;
        let events = vec![
            recorded("a", 1, EventOutcome::Ok),
            recorded("a", 2, EventOutcome::Failed("busy".into())),
        ];
        assert!(r.event_mismatches(&events).is_empty());
    }

    #[test]
    fn missing_event_is_reported() {
        let r = report(8, &[("a", 4, 2, 2)]);
        let events = vec![recorded("a", 1, EventOutcome::Ok)];
        assert_eq!(
            r.event_mismatches(&events),
            vec![EventMismatch {
                service: "a".into(),
                performed: 2,
                recorded: 1,
                failures: 0,
                recorded_failures: 0,
            }]
        );
    }

    #[test]
    fn unknown_service_lookup() {
        assert!(report(1, &[]).service("x").is_none());
    }
}
