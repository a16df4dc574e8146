/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Rate-monotonic feasibility analysis.
//!
//! The Liu & Layland bound is **computed and logged** at start-up for every
//! core that hosts services with a declared WCET.  It is a warning only: the
//! sequencer always starts, since there is no deadline-miss detection to act
//! on the result.
//!
//! # Theory
//! Under rate-monotonic priorities a set of `n` independent periodic services
//! is guaranteed schedulable on one core if
//!
//! $$U = \sum_{i=1}^{n} \frac{C_i}{T_i} \leq n \left(2^{1/n} - 1\right)$$
//!
//! | n | Bound |
//! |---|---|
//! | 1 | 1.000 |
//! | 2 | 0.828 |
//! | 3 | 0.780 |
//! | ∞ | ln(2) ≈ 0.693 |

use std::time::Duration;

use crate::service::ServiceSpec;

/// Liu & Layland utilisation bound for `n` services: `n × (2^(1/n) − 1)`.
///
/// `0.0` for `n = 0`, `1.0` for `n = 1`.
pub fn liu_layland_bound(n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let nf = n as f64;
    nf * (2.0_f64.powf(1.0 / nf) - 1.0)
}

/// Check the services sharing one core against the Liu & Layland bound.
///
/// Services without a declared WCET are ignored.  Returns `None` when the set
/// is provably schedulable (or empty) and `Some(total_utilisation)` when the
/// bound is exceeded.
pub fn check_liu_layland(services: &[&ServiceSpec], tick_period: Duration) -> Option<f64> {
    let utils: Vec<f64> = services
        .iter()
        .filter_map(|s| s.utilization(tick_period))
        .collect();

    if utils.is_empty() {
        return None;
    }

    let total: f64 = utils.iter().sum();
    if total > liu_layland_bound(utils.len()) {
        Some(total)
    } else {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
