//! Schedule file loading and built-in presets.
//!
//! The expected YAML structure is:
//! ```yaml
//! sequencer:
//!   period_us: 10000
//!   max_ticks: 2000
//!   cores: [1, 2, 3]
//!   rt_mode: best_effort
//! services:
//!   - name: S1
//!     divisor: 2
//!     wcet_us: 500
//!     work: { kind: spin, micros: 200 }
//!   - name: S2
//!     divisor: 5
//!     stop_after: 40
//! ```
//!
//! Every `sequencer` field is optional; omitted values take the
//! [`SequencerSettings`] defaults.  Validation happens later, in
//! [`ScheduleConfig::derive`].

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use tracing::{debug, info};

use crate::rt::{PriorityRange, RtMode};
use crate::schedule::{ConfigError, ScheduleConfig, SequencerSettings, DEFAULT_CORES};
use crate::service::{ServiceDecl, WorkKind};

// ── Private YAML deserialization types ────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScheduleFile {
    #[serde(default)]
    sequencer: SequencerEntry,
    services: Vec<ServiceEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SequencerEntry {
    #[serde(default = "default_period_us")]
    period_us: u64,
    max_ticks: Option<u64>,
    #[serde(default = "default_cores")]
    cores: Vec<u32>,
    #[serde(default)]
    rt_mode: RtModeEntry,
}

impl Default for SequencerEntry {
    fn default() -> Self {
        Self {
            period_us: default_period_us(),
            max_ticks: None,
            cores: default_cores(),
            rt_mode: RtModeEntry::default(),
        }
    }
}

fn default_period_us() -> u64 {
    10_000
}

fn default_cores() -> Vec<u32> {
    DEFAULT_CORES.to_vec()
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RtModeEntry {
    Strict,
    #[default]
    BestEffort,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServiceEntry {
    name: String,
    divisor: u64,
    wcet_us: Option<u64>,
    #[serde(default)]
    work: WorkEntry,
    stop_after: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum WorkEntry {
    #[default]
    Idle,
    Spin {
        micros: u64,
    },
}

// ── Public types ──────────────────────────────────────────────────────────────

/// Built-in service sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Seven stub services at 50, 20, 10, 5, 2, 1 and 1 Hz, 2000-tick budget.
    Generic,
    /// Acquire at 25 Hz, process and store at 1 Hz; runs until store has
    /// completed 10 releases.
    Capture,
}

/// Command-line overrides applied on top of a file or preset.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub max_ticks: Option<u64>,
    pub tick_period: Option<Duration>,
    pub cores: Option<Vec<u32>>,
    pub rt_mode: Option<RtMode>,
}

/// A service set plus sequencer settings, not yet validated.
#[derive(Debug, Clone)]
pub struct ScheduleDocument {
    pub settings: SequencerSettings,
    pub services: Vec<ServiceDecl>,
}

impl ScheduleDocument {
    /// Parse a YAML schedule file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML does not match
    /// the expected layout.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading schedule from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open schedule file: {}", path.display()))?;

        let file: ScheduleFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        let seq = file.sequencer;
        let settings = SequencerSettings {
            tick_period: Duration::from_micros(seq.period_us),
            max_ticks: seq.max_ticks,
            cores: seq.cores,
            rt_mode: match seq.rt_mode {
                RtModeEntry::Strict => RtMode::Strict,
                RtModeEntry::BestEffort => RtMode::BestEffort,
            },
        };

        let services: Vec<ServiceDecl> = file
            .services
            .into_iter()
            .map(|e| ServiceDecl {
                name: e.name,
                divisor: e.divisor,
                wcet_us: e.wcet_us,
                work: match e.work {
                    WorkEntry::Idle => WorkKind::Idle,
                    WorkEntry::Spin { micros } => WorkKind::Spin { micros },
                },
                stop_after: e.stop_after,
            })
            .collect();

        for s in &services {
            debug!(
                "  Service: {} | divisor: {} | work: {}",
                s.name,
                s.divisor,
                s.work.label()
            );
        }
        info!("Loaded {} service declaration(s)", services.len());

        Ok(Self { settings, services })
    }

    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Generic => Self {
                settings: SequencerSettings {
                    max_ticks: Some(2000),
                    ..Default::default()
                },
                services: [2, 5, 10, 20, 50, 100, 100]
                    .iter()
                    .enumerate()
                    .map(|(i, &d)| ServiceDecl::new(format!("S{}", i + 1), d))
                    .collect(),
            },
            Preset::Capture => Self {
                settings: SequencerSettings::default(),
                services: vec![
                    ServiceDecl::new("acquire", 4).with_stop_after(250),
                    ServiceDecl::new("process", 100),
                    ServiceDecl::new("store", 100).with_stop_after(10),
                ],
            },
        }
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(max) = overrides.max_ticks {
            self.settings.max_ticks = Some(max);
        }
        if let Some(period) = overrides.tick_period {
            self.settings.tick_period = period;
        }
        if let Some(cores) = &overrides.cores {
            self.settings.cores = cores.clone();
        }
        if let Some(mode) = overrides.rt_mode {
            self.settings.rt_mode = mode;
        }
    }

    /// Validate and derive the immutable schedule.
    pub fn into_config(self, range: PriorityRange) -> Result<ScheduleConfig, ConfigError> {
        ScheduleConfig::derive(self.settings, self.services, range)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rt::DEFAULT_PRIORITY_RANGE;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    // ── load_from_file ────────────────────────────────────────────────────────

    #[test]
    fn load_full_schedule() {
        let yaml = r#"
sequencer:
  period_us: 5000
  max_ticks: 400
  cores: [0, 1]
  rt_mode: strict
services:
  - name: fast
    divisor: 2
    wcet_us: 300
    work: { kind: spin, micros: 100 }
  - name: slow
    divisor: 40
    stop_after: 3
"#;
        let f = yaml_tempfile(yaml);
        let doc = ScheduleDocument::load_from_file(f.path()).unwrap();

        assert_eq!(doc.settings.tick_period, Duration::from_millis(5));
        assert_eq!(doc.settings.max_ticks, Some(400));
        assert_eq!(doc.settings.cores, vec![0, 1]);
        assert_eq!(doc.settings.rt_mode, RtMode::Strict);

        assert_eq!(doc.services.len(), 2);
        assert_eq!(doc.services[0].work, WorkKind::Spin { micros: 100 });
        assert_eq!(doc.services[0].wcet_us, Some(300));
        assert_eq!(doc.services[1].work, WorkKind::Idle);
        assert_eq!(doc.services[1].stop_after, Some(3));
    }

    #[test]
    fn sequencer_section_is_optional() {
        let yaml = "services:\n  - name: a\n    divisor: 1\n";
        let f = yaml_tempfile(yaml);
        let doc = ScheduleDocument::load_from_file(f.path()).unwrap();
        assert_eq!(doc.settings, SequencerSettings::default());
    }

    #[test]
    fn invalid_values_parse_but_fail_derivation() {
        let yaml = "services:\n  - name: a\n    divisor: 0\n";
        let f = yaml_tempfile(yaml);
        let doc = ScheduleDocument::load_from_file(f.path()).unwrap();
        assert!(matches!(
            doc.into_config(DEFAULT_PRIORITY_RANGE),
            Err(ConfigError::ZeroDivisor { .. })
        ));

        let yaml = "services:\n  - name: a\n    divisor: 1\n    stop_after: 0\n";
        let f = yaml_tempfile(yaml);
        let doc = ScheduleDocument::load_from_file(f.path()).unwrap();
        assert!(matches!(
            doc.into_config(DEFAULT_PRIORITY_RANGE),
            Err(ConfigError::ZeroStopAfter { .. })
        ));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let yaml = "services:\n  - name: a\n    divisor: 1\n    priority: 5\n";
        let f = yaml_tempfile(yaml);
        assert!(ScheduleDocument::load_from_file(f.path()).is_err());
    }

    #[test]
    fn missing_file_returns_error() {
        let result = ScheduleDocument::load_from_file(Path::new("/nonexistent/schedule.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(ScheduleDocument::load_from_file(f.path()).is_err());
    }

    // ── Presets / overrides ───────────────────────────────────────────────────

    #[test]
    fn generic_preset_derives_seven_rm_services() {
        let cfg = ScheduleDocument::preset(Preset::Generic)
            .into_config(DEFAULT_PRIORITY_RANGE)
            .unwrap();
        assert_eq!(cfg.services().len(), 7);
        assert_eq!(cfg.max_ticks(), Some(2000));
        assert_eq!(cfg.expected_releases(2000), vec![1000, 400, 200, 100, 40, 20, 20]);
    }

    #[test]
    fn capture_preset_stops_by_service_request() {
        let doc = ScheduleDocument::preset(Preset::Capture);
        assert_eq!(doc.settings.max_ticks, None);
        let store = doc.services.iter().find(|s| s.name == "store").unwrap();
        assert_eq!(store.stop_after, Some(10));
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let mut doc = ScheduleDocument::preset(Preset::Generic);
        doc.apply(&Overrides {
            max_ticks: Some(50),
            rt_mode: Some(RtMode::Strict),
            ..Default::default()
        });
        assert_eq!(doc.settings.max_ticks, Some(50));
        assert_eq!(doc.settings.rt_mode, RtMode::Strict);
        assert_eq!(doc.settings.tick_period, Duration::from_millis(10));
        assert_eq!(doc.settings.cores, DEFAULT_CORES.to_vec());
    }
}
