/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Linux implementation of the scheduling layer.

use std::io;
use std::time::Duration;

use libc::{
    clock_nanosleep, cpu_set_t, pthread_getschedparam, pthread_self, pthread_setschedparam,
    sched_get_priority_max, sched_get_priority_min, sched_getcpu, sched_param, sched_setaffinity,
    timespec, CLOCK_MONOTONIC, CPU_SET, CPU_SETSIZE, CPU_ZERO, EINTR, SCHED_FIFO, SCHED_OTHER,
    SCHED_RR,
};

use super::{PriorityRange, RtError};

pub fn priority_range() -> Option<PriorityRange> {
    // SAFETY: plain queries without pointer arguments.
    let (min, max) = unsafe {
        (
            sched_get_priority_min(SCHED_FIFO),
            sched_get_priority_max(SCHED_FIFO),
        )
    };
    if min < 0 || max < 0 {
        None
    } else {
        Some(PriorityRange { min, max })
    }
}

pub fn set_fixed_priority(priority: i32) -> Result<(), RtError> {
    let param = sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pthread_self() is always valid.
    let rc = unsafe { pthread_setschedparam(pthread_self(), SCHED_FIFO, &param) };
    if rc != 0 {
        // pthread functions return the errno value instead of setting errno
        return Err(RtError::Priority {
            priority,
            source: io::Error::from_raw_os_error(rc),
        });
    }
    Ok(())
}

pub fn pin_to_core(core: u32) -> Result<(), RtError> {
    if core as usize >= CPU_SETSIZE as usize {
        return Err(RtError::Affinity {
            core,
            source: io::Error::from_raw_os_error(libc::EINVAL),
        });
    }

    // SAFETY: cpu_set_t is a plain bitmask; an all-zero value is valid.
    let rc = unsafe {
        let mut set: cpu_set_t = std::mem::zeroed();
        CPU_ZERO(&mut set);
        CPU_SET(core as usize, &mut set);
        // pid 0 = calling thread
        sched_setaffinity(0, std::mem::size_of::<cpu_set_t>(), &set)
    };
    if rc != 0 {
        return Err(RtError::Affinity {
            core,
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

pub fn current_core() -> Option<u32> {
    // SAFETY: no arguments.
    let cpu = unsafe { sched_getcpu() };
    u32::try_from(cpu).ok()
}

pub fn sleep(duration: Duration) {
    let mut request = timespec {
        tv_sec: duration.as_secs() as libc::time_t,
        tv_nsec: duration.subsec_nanos() as libc::c_long,
    };
    loop {
        let mut remaining = timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: both timespecs are valid for the duration of the call.
        let rc = unsafe { clock_nanosleep(CLOCK_MONOTONIC, 0, &request, &mut remaining) };
        if rc == EINTR {
            request = remaining;
            continue;
        }
        if rc != 0 {
            // Only EINVAL is possible here; fall back to the std sleep.
            std::thread::sleep(duration);
        }
        return;
    }
}

pub fn current_policy_name() -> &'static str {
    let mut policy = 0;
    let mut param = sched_param { sched_priority: 0 };
    // SAFETY: out-pointers reference live locals.
    let rc = unsafe { pthread_getschedparam(pthread_self(), &mut policy, &mut param) };
    if rc != 0 {
        return "UNKNOWN";
    }
    match policy {
        SCHED_FIFO => "SCHED_FIFO",
        SCHED_RR => "SCHED_RR",
        SCHED_OTHER => "SCHED_OTHER",
        _ => "UNKNOWN",
    }
}
