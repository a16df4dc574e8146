/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Fallback for targets without SCHED_FIFO / affinity support.
//!
//! Every request reports [`RtError::Unsupported`]; in best-effort mode the
//! caller logs the capability gap and keeps running.

use std::time::Duration;

use super::{PriorityRange, RtError};

pub fn priority_range() -> Option<PriorityRange> {
    None
}

pub fn set_fixed_priority(_priority: i32) -> Result<(), RtError> {
    Err(RtError::Unsupported("fixed-priority scheduling"))
}

pub fn pin_to_core(_core: u32) -> Result<(), RtError> {
    Err(RtError::Unsupported("core affinity"))
}

pub fn current_core() -> Option<u32> {
    None
}

pub fn sleep(duration: Duration) {
    std::thread::sleep(duration);
}

pub fn current_policy_name() -> &'static str {
    "UNKNOWN"
}
