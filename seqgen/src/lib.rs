/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! seqgen – cyclic-executive sequencer
//!
//! A user-space tick (default 10 ms / 100 Hz) releases a fixed set of periodic
//! services at sub-multiples of its rate.  Each service runs on its own thread
//! at a rate-monotonic priority, pinned to a core.
//!
//! ```text
//! lib.rs
//! ├── config/     – YAML schedule files, presets, CLI overrides
//! ├── schedule/   – rate-monotonic priorities, core partition, major cycle
//! ├── service     – ServiceDecl (input) / ServiceSpec (derived)
//! ├── rt/         – SCHED_FIFO, affinity and sleeping per platform
//! ├── gate        – counting release gate (lock-free signal)
//! ├── shutdown    – stop reasons, abort flags, forced release pass
//! ├── sequencer   – tick handler
//! ├── tick        – periodic tick sources
//! ├── work        – unit-of-work trait and built-ins
//! ├── worker      – per-service run loop
//! ├── event       – release events and sinks
//! └── runtime/    – launch, join, run report
//! ```

pub mod config;
pub mod event;
pub mod gate;
pub mod rt;
pub mod runtime;
pub mod schedule;
pub mod sequencer;
pub mod service;
pub mod shutdown;
pub mod tick;
pub mod work;
pub mod worker;
