/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};

use seqgen::config::{Overrides, Preset, ScheduleDocument};
use seqgen::event::{MemorySink, Tee, TracingSink};
use seqgen::rt::{self, RtMode};
use seqgen::runtime::SequencerRuntime;
use seqgen::shutdown::StopReason;

// ── CLI argument definition ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliRtMode {
    Strict,
    BestEffort,
}

impl From<CliRtMode> for RtMode {
    fn from(m: CliRtMode) -> Self {
        match m {
            CliRtMode::Strict => RtMode::Strict,
            CliRtMode::BestEffort => RtMode::BestEffort,
        }
    }
}

/// Cyclic-executive sequencer releasing rate-monotonic periodic services.
///
/// Example:
///   sudo seqgen --preset generic --ticks 2000 --rt-mode strict
#[derive(Debug, Parser)]
#[command(name = "seqgen", about = "Rate-monotonic periodic service sequencer", long_about = None)]
struct Cli {
    /// Built-in service set, used when no schedule file is given.
    #[arg(long, value_enum, default_value_t = Preset::Generic)]
    preset: Preset,

    /// Path to a YAML schedule file (takes precedence over --preset).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Stop after this many ticks.
    #[arg(short = 't', long = "ticks")]
    ticks: Option<u64>,

    /// Tick period in microseconds.
    #[arg(long = "period-us")]
    period_us: Option<u64>,

    /// Cores to use; the first one runs the sequencer.
    #[arg(long, value_delimiter = ',')]
    cores: Option<Vec<u32>>,

    /// Reaction to refused priority / affinity requests.
    #[arg(long = "rt-mode", value_enum)]
    rt_mode: Option<CliRtMode>,

    /// Bounded wait for workers to exit at shutdown, in milliseconds.
    #[arg(long = "join-timeout-ms", default_value_t = 5000)]
    join_timeout_ms: u64,
}

// ── Signals ───────────────────────────────────────────────────────────────────

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        r = tokio::signal::ctrl_c() => r?,
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=info).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        preset = ?cli.preset,
        config = ?cli.config,
        ticks = ?cli.ticks,
        period_us = ?cli.period_us,
        cores = ?cli.cores,
        rt_mode = ?cli.rt_mode,
        "seqgen starting up"
    );

    // ── Build the schedule ────────────────────────────────────────────────────
    let mut document = match &cli.config {
        Some(path) => match ScheduleDocument::load_from_file(path) {
            Ok(doc) => doc,
            Err(e) => {
                error!("Failed to load schedule: {:#}", e);
                process::exit(1);
            }
        },
        None => ScheduleDocument::preset(cli.preset),
    };

    document.apply(&Overrides {
        max_ticks: cli.ticks,
        tick_period: cli.period_us.map(Duration::from_micros),
        cores: cli.cores.clone(),
        rt_mode: cli.rt_mode.map(RtMode::from),
    });

    let range = rt::priority_range();
    let config = match document.into_config(range) {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid schedule: {}", e);
            process::exit(1);
        }
    };

    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    info!(
        cpus,
        priority_min = range.min,
        priority_max = range.max,
        main_policy = rt::current_policy_name(),
        "platform"
    );
    if let Some(&max_core) = config.settings().cores.iter().max() {
        if max_core as usize >= cpus {
            warn!(max_core, cpus, "configured core exceeds the online CPU count");
        }
    }
    config.log_summary();

    // ── Run ───────────────────────────────────────────────────────────────────
    // Events go to the log and are kept for the end-of-run cross-check.
    let recorded = Arc::new(MemorySink::new());
    let sink = Tee::new()
        .with(Arc::new(TracingSink))
        .with(recorded.clone());

    let running = match SequencerRuntime::new(config)
        .with_sink(Arc::new(sink))
        .launch_default()
    {
        Ok(r) => r,
        Err(e) => {
            error!("Start-up failed: {}", e);
            process::exit(1);
        }
    };

    let shutdown = running.shutdown_handle();
    let join_timeout = Duration::from_millis(cli.join_timeout_ms);
    let mut finished = tokio::task::spawn_blocking(move || running.wait(join_timeout));

    let mut listening = true;
    let outcome = loop {
        tokio::select! {
            res = &mut finished => break res,
            sig = wait_for_shutdown_signal(), if listening => {
                listening = false;
                match sig {
                    Ok(()) => {
                        shutdown.request_stop(StopReason::External);
                    }
                    Err(e) => warn!("Signal handling unavailable: {}", e),
                }
            }
        }
    };

    match outcome {
        Ok(Ok(report)) => {
            report.log();
            let mismatches = report.release_mismatches();
            if !mismatches.is_empty() {
                error!(count = mismatches.len(), "release counts do not match the tick count");
                process::exit(1);
            }
            let missing = report.event_mismatches(&recorded.snapshot());
            if !missing.is_empty() {
                for m in &missing {
                    error!(
                        service = %m.service,
                        performed = m.performed,
                        recorded = m.recorded,
                        failures = m.failures,
                        recorded_failures = m.recorded_failures,
                        "event log does not match worker counters"
                    );
                }
                process::exit(1);
            }
            info!(events = recorded.len(), "seqgen finished");
        }
        Ok(Err(e)) => {
            error!("Shutdown failed: {}", e);
            process::exit(1);
        }
        Err(e) => {
            error!("Orchestrator task failed: {}", e);
            process::exit(1);
        }
    }
}
