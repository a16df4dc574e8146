/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error type for schedule derivation.
//!
//! Every variant names the offending service (or value) so that the start-up
//! path can print a precise diagnostic before any thread is created.

use thiserror::Error;

/// Why a declared service set could not be turned into a
/// [`ScheduleConfig`](super::ScheduleConfig).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No services were declared.
    #[error("no services declared, the service set is empty")]
    NoServices,

    /// A service declared a release divisor of zero.
    #[error("service '{service}' has divisor 0, divisors must be at least 1")]
    ZeroDivisor { service: String },

    /// A service asked to stop the run after zero releases.
    #[error("service '{service}' has stop_after 0, it must be at least 1 when set")]
    ZeroStopAfter { service: String },

    /// A service declared an empty name.
    #[error("service #{index} has an empty name")]
    EmptyName { index: usize },

    /// Two services share the same name.
    #[error("service name '{service}' is declared more than once")]
    DuplicateService { service: String },

    /// The sequencer tick period is zero.
    #[error("sequencer tick period must be greater than zero")]
    ZeroPeriod,

    /// A tick budget of zero was configured.
    #[error("tick budget must be at least 1 when set")]
    ZeroTickBudget,

    /// No cores were configured for the sequencer and its services.
    #[error("no cores configured, at least one core is required")]
    NoCores,

    /// The platform priority range cannot give every service a distinct
    /// level strictly below the sequencer.
    #[error(
        "priority range {min}..={max} cannot hold the sequencer plus {needed} distinct service priorities"
    )]
    PriorityRangeExhausted { needed: usize, min: i32, max: i32 },

    /// The LCM of the divisors overflowed `u64`.
    #[error("major cycle overflow computing lcm({a}, {b})")]
    CycleOverflow { a: u64, b: u64 },
}
