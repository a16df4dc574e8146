/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pure arithmetic helpers for the major cycle: GCD and checked LCM.
//!
//! The major cycle of a cyclic executive is the LCM of all release divisors,
//! i.e. the number of ticks after which the release pattern repeats.

use super::ConfigError;

/// Iterative Euclidean GCD.  `gcd(0, n) == n`.
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Checked LCM.  Returns [`ConfigError::CycleOverflow`] if the result does
/// not fit in `u64`, and `Ok(0)` when either input is `0`.
pub fn lcm(a: u64, b: u64) -> Result<u64, ConfigError> {
    if a == 0 || b == 0 {
        return Ok(0);
    }

    // a / gcd is exact, so only the final multiplication can overflow
    (a / gcd(a, b))
        .checked_mul(b)
        .ok_or(ConfigError::CycleOverflow { a, b })
}

/// LCM of every divisor in the slice.  `Ok(0)` for an empty slice.
pub fn major_cycle(divisors: &[u64]) -> Result<u64, ConfigError> {
    divisors
        .iter()
        .try_fold(divisors.first().copied().unwrap_or(0), |acc, &d| lcm(acc, d))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gcd_basic_cases() {
        assert_eq!(gcd(12, 8), 4);
        assert_eq!(gcd(7, 3), 1);
        assert_eq!(gcd(0, 5), 5);
        assert_eq!(gcd(5, 0), 5);
    }

    #[test]
    fn lcm_basic_cases() {
        assert_eq!(lcm(4, 6).unwrap(), 12);
        assert_eq!(lcm(20, 5).unwrap(), 20);
        assert_eq!(lcm(0, 5).unwrap(), 0);
    }

    #[test]
    fn lcm_overflow_returns_error() {
        let a = u64::MAX / 2 + 1;
        let b = u64::MAX / 2 + 3;
        assert!(matches!(lcm(a, b), Err(ConfigError::CycleOverflow { .. })));
    }

    #[test]
    fn generic_service_set_repeats_every_100_ticks() {
        // 50, 20, 10, 5, 2, 1, 1 Hz at a 100 Hz tick
        assert_eq!(major_cycle(&[2, 5, 10, 20, 50, 100, 100]).unwrap(), 100);
    }

    #[test]
    fn capture_service_set_repeats_every_100_ticks() {
        assert_eq!(major_cycle(&[4, 100, 100]).unwrap(), 100);
    }

    #[test]
    fn coprime_divisors_multiply() {
        assert_eq!(major_cycle(&[3, 7, 11]).unwrap(), 231);
    }

    #[test]
    fn empty_and_single() {
        assert_eq!(major_cycle(&[]).unwrap(), 0);
        assert_eq!(major_cycle(&[42]).unwrap(), 42);
    }
}
