//! Configuration for sharkcast.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line flags (`--fin`, `--encoder`, `--duration-hours`)
//! 2. Environment variables (SHARKCAST_AUDIO_DIR, SHARKCAST_FIN)
//! 3. Config file (`--config`, $SHARKCAST_CONFIG, or .sharkcast/config.yaml)
//! 4. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .sharkcast/config.yaml
//!
//! The result is resolved once at startup into a [`ResolvedConfig`] and passed
//! by reference to whatever needs it.

pub mod paths;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::{AlsaMonitor, Encoder, RecorderSettings, Station};
use crate::core::SchedulerSettings;
use crate::domain::SchedulingZone;

/// Name of the fin used when the config file defines none
pub const DEFAULT_FIN: &str = "default";

/// Longest single capture (one week)
pub const MAX_RECORDING_HOURS: f64 = 168.0;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    /// Team name used in announcements
    pub team: Option<String>,
    /// Where recordings go (supports ~ and $VARS)
    pub audio_dir: Option<String>,
    /// "local", "utc", an offset like "-08:00" or a zone like "America/Los_Angeles"
    pub timezone: Option<String>,
    #[serde(default)]
    pub station: Option<Station>,
    /// Fin to use when --fin is not given
    pub fin: Option<String>,
    #[serde(default)]
    pub fins: BTreeMap<String, FinConfig>,
    #[serde(default)]
    pub recording: Option<RecordingConfig>,
    #[serde(default)]
    pub scheduler: Option<SchedulerConfig>,
}

/// Addresses of one RadioSHARK fin.
///
/// `audio_addr` comes from `arecord -l` ("hw:CARD,DEVICE"). `ctrl_addr` is the
/// fin index sharkctrl uses when several fins are attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinConfig {
    pub audio_addr: String,
    #[serde(default)]
    pub ctrl_addr: Option<String>,
}

impl Default for FinConfig {
    fn default() -> Self {
        Self {
            audio_addr: "hw:2,0".to_string(),
            ctrl_addr: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordingConfig {
    pub hours: Option<f64>,
    pub encoder: Option<Encoder>,
    pub artist: Option<String>,
    pub arecord: Option<String>,
    pub encoder_path: Option<String>,
    pub sharkctrl: Option<String>,
    pub aplay: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub max_sleep_seconds: Option<u64>,
}

/// Overrides taken from the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub fin: Option<String>,
    pub encoder: Option<Encoder>,
    pub duration_hours: Option<f64>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub team: String,
    pub audio_dir: PathBuf,
    #[serde(serialize_with = "serialize_display")]
    pub zone: SchedulingZone,
    pub station: Station,
    pub fin_name: String,
    pub fin: FinConfig,
    /// Every configured fin, for `--fin` overrides
    pub fins: BTreeMap<String, FinConfig>,
    pub recording: RecordingSettings,
    pub max_sleep_seconds: u64,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordingSettings {
    pub hours: f64,
    pub encoder: Encoder,
    pub artist: String,
    pub arecord: String,
    pub encoder_path: Option<String>,
    pub sharkctrl: String,
    /// Player used by `sharkcast verify`
    pub aplay: String,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            hours: 4.0,
            encoder: Encoder::Ogg,
            artist: String::new(),
            arecord: "arecord".to_string(),
            encoder_path: None,
            sharkctrl: "sharkctrl".to_string(),
            aplay: "aplay".to_string(),
        }
    }
}

fn serialize_display<S: serde::Serializer>(
    zone: &SchedulingZone,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(zone)
}

impl ResolvedConfig {
    /// Resolve a parsed config file (or none) into final settings.
    ///
    /// `env` looks up environment overrides; pass `|k| std::env::var(k).ok()`
    /// in production.
    pub fn resolve(
        file: ConfigFile,
        config_file: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let team = file.team.unwrap_or_else(|| "49ers".to_string());

        let audio_dir = env("SHARKCAST_AUDIO_DIR")
            .or(file.audio_dir)
            .map(|dir| paths::expand_path(&dir))
            .unwrap_or_else(|| paths::expand_path("~/music/sharkcast"));

        let zone = match file.timezone {
            Some(tz) => tz.parse::<SchedulingZone>()?,
            None => SchedulingZone::Local,
        };

        let mut fins = file.fins;
        if fins.is_empty() {
            fins.insert(DEFAULT_FIN.to_string(), FinConfig::default());
        }

        let fin_name = env("SHARKCAST_FIN")
            .or(file.fin)
            .unwrap_or_else(|| {
                if fins.contains_key(DEFAULT_FIN) || fins.len() != 1 {
                    DEFAULT_FIN.to_string()
                } else {
                    fins.keys().next().cloned().unwrap_or_default()
                }
            });

        let recording = file.recording.map_or_else(RecordingSettings::default, |r| {
            let defaults = RecordingSettings::default();
            RecordingSettings {
                hours: r.hours.unwrap_or(defaults.hours),
                encoder: r.encoder.unwrap_or(defaults.encoder),
                artist: r.artist.unwrap_or(defaults.artist),
                arecord: r.arecord.unwrap_or(defaults.arecord),
                encoder_path: r.encoder_path,
                sharkctrl: r.sharkctrl.unwrap_or(defaults.sharkctrl),
                aplay: r.aplay.unwrap_or(defaults.aplay),
            }
        });

        let max_sleep_seconds = file
            .scheduler
            .and_then(|s| s.max_sleep_seconds)
            .unwrap_or(300);

        let fin = fins.get(&fin_name).cloned().with_context(|| {
            format!(
                "Unknown fin '{}' (configured: {})",
                fin_name,
                fins.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })?;

        let mut config = Self {
            team,
            audio_dir,
            zone,
            station: file.station.unwrap_or_default(),
            fin_name,
            fin,
            fins,
            recording,
            max_sleep_seconds,
            config_file,
        };
        if config.recording.artist.is_empty() {
            config.recording.artist = format!("The {}", config.team);
        }
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        if let Some(name) = &overrides.fin {
            let fin = self
                .fins
                .get(name)
                .cloned()
                .with_context(|| format!("Unknown fin '{}'", name))?;
            self.fin_name = name.clone();
            self.fin = fin;
        }
        if let Some(encoder) = overrides.encoder {
            self.recording.encoder = encoder;
        }
        if let Some(hours) = overrides.duration_hours {
            self.recording.hours = hours;
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        let hours = self.recording.hours;
        if !(hours.is_finite() && hours > 0.0) {
            anyhow::bail!("Recording duration must be positive, got {} hours", hours);
        }
        if hours > MAX_RECORDING_HOURS {
            anyhow::bail!(
                "Recording duration must be at most {} hours, got {}",
                MAX_RECORDING_HOURS,
                hours
            );
        }
        if self.max_sleep_seconds == 0 {
            anyhow::bail!("scheduler.max_sleep_seconds must be at least 1");
        }
        Ok(())
    }

    /// How long each capture lasts
    pub fn capture_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.recording.hours * 3600.0).unwrap_or(Duration::ZERO)
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            max_sleep: Duration::from_secs(self.max_sleep_seconds),
        }
    }

    pub fn recorder_settings(&self) -> RecorderSettings {
        RecorderSettings {
            audio_dir: self.audio_dir.clone(),
            audio_addr: self.fin.audio_addr.clone(),
            duration: self.capture_duration(),
            encoder: self.recording.encoder,
            artist: self.recording.artist.clone(),
            zone: self.zone,
            arecord_path: self.recording.arecord.clone(),
            encoder_path: self.recording.encoder_path.clone(),
        }
    }

    /// Speaker monitor for the selected fin
    pub fn monitor(&self) -> AlsaMonitor {
        AlsaMonitor::new(self.fin.audio_addr.clone())
            .with_arecord_path(self.recording.arecord.clone())
            .with_aplay_path(self.recording.aplay.clone())
    }

    /// Lock file guarding the selected fin
    pub fn lock_path(&self) -> PathBuf {
        paths::lock_path(&self.audio_dir, &self.fin_name)
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".sharkcast").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from all sources
pub fn load(explicit: Option<&Path>) -> Result<ResolvedConfig> {
    let config_file = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("SHARKCAST_CONFIG").map(PathBuf::from))
        .or_else(find_config_file);

    let file = match &config_file {
        Some(path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    ResolvedConfig::resolve(file, config_file, |key| std::env::var(key).ok())
}
