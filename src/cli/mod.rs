//! Command-line interface for sharkcast.
//!
//! Provides commands for running the recording daemon, previewing a
//! schedule, generating a test schedule, checking a fin by ear, resetting the
//! fin, and showing the resolved configuration.

use std::fs::File;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Args, Parser, Subcommand};
use fs2::FileExt;
use tracing::{info, warn};

use crate::adapters::{AlsaRecorder, Band, DeviceController, Encoder, SharkCtrl, Station};
use crate::config::{self, ConfigOverrides, ResolvedConfig};
use crate::core::{
    admit, listen_for_signals, restore_idle, CancellationToken, ConsoleAnnouncer, Scheduler,
    SchedulerError,
};
use crate::domain::{Event, RunOutcome};
use crate::ingest::{read_schedule, sample_ics, ScheduleFormat};

/// Most games `sample` will write
const MAX_SAMPLE_COUNT: usize = 500;

/// Upper bound for `sample` spacing and lead, one day
const MAX_SAMPLE_MINUTES: i64 = 24 * 60;

/// Music station every fin is parked on before `verify` starts
const DECOY_STATION: Station = Station {
    band: Band::Fm,
    frequency: 97.7,
};

/// Talk station played after the configured one, so the two sound different
const CONTRAST_STATION: Station = Station {
    band: Band::Fm,
    frequency: 88.5,
};

/// sharkcast - Unattended radio broadcast recorder
#[derive(Parser, Debug)]
#[command(name = "sharkcast")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to $SHARKCAST_CONFIG or .sharkcast/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record every upcoming game in a schedule, then exit
    Run {
        /// Schedule file (.ics or .csv)
        schedule: PathBuf,

        /// Schedule format (detected from the extension if not given)
        #[arg(short, long, value_enum)]
        format: Option<ScheduleFormat>,

        /// Recording duration in hours
        #[arg(short, long = "duration-hours")]
        duration: Option<f64>,

        /// Output encoder
        #[arg(short, long, value_enum)]
        encoder: Option<Encoder>,

        #[command(flatten)]
        fin: FinArg,
    },

    /// List the upcoming games a run would record
    Schedule {
        /// Schedule file (.ics or .csv)
        schedule: PathBuf,

        /// Schedule format (detected from the extension if not given)
        #[arg(short, long, value_enum)]
        format: Option<ScheduleFormat>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Write a test schedule with games starting in the next few minutes
    Sample {
        /// Output ICS file
        output: PathBuf,

        /// Number of games
        #[arg(short, long, default_value = "2")]
        count: usize,

        /// Minutes between game starts
        #[arg(short, long = "spacing-minutes", default_value = "2")]
        spacing: i64,

        /// Minutes until the first game
        #[arg(long = "lead-minutes", default_value = "1")]
        lead: i64,
    },

    /// Check a fin's addresses by ear: retune it and play its audio
    Verify {
        #[command(flatten)]
        fin: FinArg,

        /// Seconds of audio to play per station
        #[arg(short, long, default_value = "10")]
        seconds: u64,

        /// Seconds to wait before touching the radios
        #[arg(long, default_value = "10")]
        grace: u64,
    },

    /// Turn the recording indicator off
    Idle {
        #[command(flatten)]
        fin: FinArg,
    },

    /// Show resolved configuration
    Config,
}

/// Fin selection shared by several commands
#[derive(Args, Debug, Clone)]
pub struct FinArg {
    /// Fin to use (a key under `fins` in the config file)
    #[arg(long, env = "SHARKCAST_FIN")]
    pub fin: Option<String>,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<ExitCode> {
        let mut config = config::load(self.config.as_deref())?;

        match self.command {
            Commands::Run {
                schedule,
                format,
                duration,
                encoder,
                fin,
            } => {
                config.apply_overrides(&ConfigOverrides {
                    fin: fin.fin,
                    encoder,
                    duration_hours: duration,
                })?;
                run_daemon(&config, &schedule, format).await
            }
            Commands::Schedule {
                schedule,
                format,
                json,
            } => {
                show_schedule(&config, &schedule, format, json).await?;
                Ok(ExitCode::SUCCESS)
            }
            Commands::Sample {
                output,
                count,
                spacing,
                lead,
            } => {
                write_sample(&output, count, spacing, lead).await?;
                Ok(ExitCode::SUCCESS)
            }
            Commands::Verify {
                fin,
                seconds,
                grace,
            } => {
                config.apply_overrides(&ConfigOverrides {
                    fin: fin.fin,
                    ..Default::default()
                })?;
                verify_fin(&config, seconds, grace).await
            }
            Commands::Idle { fin } => {
                config.apply_overrides(&ConfigOverrides {
                    fin: fin.fin,
                    ..Default::default()
                })?;
                force_idle(&config).await?;
                Ok(ExitCode::SUCCESS)
            }
            Commands::Config => {
                show_config(&config)?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

/// Build the device controller for the configured fin
fn shark_for(config: &ResolvedConfig) -> SharkCtrl {
    SharkCtrl::new(config.station, config.fin.ctrl_addr.clone())
        .with_binary_path(config.recording.sharkctrl.clone())
}

/// Run `future` unless `cancel` fires first
async fn until_cancelled<F: Future>(cancel: &CancellationToken, future: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = future => Some(output),
    }
}

/// Take an exclusive lock so two daemons never drive the same fin
fn lock_fin(config: &ResolvedConfig) -> Result<File> {
    std::fs::create_dir_all(&config.audio_dir)
        .with_context(|| format!("Failed to create {}", config.audio_dir.display()))?;

    let path = config.lock_path();
    let file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .with_context(|| format!("Failed to open lock file {}", path.display()))?;

    file.try_lock_exclusive().with_context(|| {
        format!(
            "Fin '{}' is already in use by another sharkcast ({})",
            config.fin_name,
            path.display()
        )
    })?;

    Ok(file)
}

/// Record every upcoming event in the schedule
async fn run_daemon(
    config: &ResolvedConfig,
    schedule: &Path,
    format: Option<ScheduleFormat>,
) -> Result<ExitCode> {
    let events = read_schedule(schedule, format, config.zone).await?;
    let _lock = lock_fin(config)?;

    info!(
        fin = %config.fin_name,
        station = %config.station,
        audio_dir = %config.audio_dir.display(),
        encoder = %config.recording.encoder,
        "Starting recorder"
    );

    let device = Arc::new(shark_for(config));
    let recorder = Arc::new(AlsaRecorder::new(config.recorder_settings()));
    let announcer = Arc::new(ConsoleAnnouncer::new(config.team.clone(), config.zone));

    let mut scheduler =
        Scheduler::new(device, recorder, announcer).with_settings(config.scheduler_settings());

    match scheduler.load(events) {
        Ok(count) => info!(count, "Games scheduled"),
        Err(SchedulerError::EmptySchedule) => {
            warn!(schedule = %schedule.display(), "No upcoming games in schedule");
        }
    }

    let cancel = CancellationToken::new();
    let signals = listen_for_signals(cancel.clone());
    let outcome = scheduler.run(&cancel).await;
    signals.abort();

    match &outcome {
        RunOutcome::Completed { fired } => {
            eprintln!("\n[Recorded {} game(s); nothing left to do]", fired);
        }
        RunOutcome::Failed { fired, error } => {
            eprintln!("\n[Stopped after {} game(s): {}]", fired, error);
        }
        RunOutcome::Cancelled { fired } => {
            eprintln!("\n[Interrupted after {} game(s)]", fired);
        }
    }

    Ok(ExitCode::from(outcome.exit_code()))
}

/// Print the events a run would record, in firing order
async fn show_schedule(
    config: &ResolvedConfig,
    schedule: &Path,
    format: Option<ScheduleFormat>,
    json: bool,
) -> Result<()> {
    let events = read_schedule(schedule, format, config.zone).await?;
    let total = events.len();
    let upcoming: Vec<Event> = admit(events, Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&upcoming)?);
        return Ok(());
    }

    if upcoming.is_empty() {
        println!("No upcoming games ({} in schedule, all in the past)", total);
        return Ok(());
    }

    println!("{:<28} {:<36} {}", "WHEN", "GAME", "OUTPUT");
    println!("{}", "-".repeat(90));
    for event in &upcoming {
        println!(
            "{:<28} {:<36} {}.{}",
            event.local_time(config.zone).format("%a %d %b %Y %I:%M %p"),
            truncate(event.label(), 36),
            event.output_id(),
            config.recording.encoder.extension()
        );
    }
    println!("\nTotal: {} upcoming, {} past", upcoming.len(), total - upcoming.len());

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn check_sample_args(count: usize, spacing: i64, lead: i64) -> Result<()> {
    if count > MAX_SAMPLE_COUNT {
        anyhow::bail!("--count must be at most {}, got {}", MAX_SAMPLE_COUNT, count);
    }
    if !(1..=MAX_SAMPLE_MINUTES).contains(&spacing) {
        anyhow::bail!(
            "--spacing-minutes must be between 1 and {}, got {}",
            MAX_SAMPLE_MINUTES,
            spacing
        );
    }
    if !(0..=MAX_SAMPLE_MINUTES).contains(&lead) {
        anyhow::bail!(
            "--lead-minutes must be between 0 and {}, got {}",
            MAX_SAMPLE_MINUTES,
            lead
        );
    }
    Ok(())
}

/// Write a test schedule starting a few minutes from now
async fn write_sample(output: &Path, count: usize, spacing: i64, lead: i64) -> Result<()> {
    check_sample_args(count, spacing, lead)?;

    let first = Utc::now() + Duration::minutes(lead);
    let text = sample_ics(first, count, Duration::minutes(spacing));
    tokio::fs::write(output, text)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    // Leave a gap between captures so each one finishes before the next starts
    let hours = (spacing as f64 / 2.0) / 60.0;
    eprintln!("Wrote {} test game(s) to {}", count, output.display());
    eprintln!(
        "Try: sharkcast run {} --duration-hours {:.4}",
        output.display(),
        hours
    );

    Ok(())
}

/// Stations played on the fin under test, configured one first
fn verify_stations(configured: Station) -> Vec<Station> {
    let mut stations = vec![configured];
    if configured != CONTRAST_STATION {
        stations.push(CONTRAST_STATION);
    }
    stations
}

/// Park every fin on the decoy station, then play the selected fin on each
/// verify station. Returns false if cancelled part way.
///
/// Device calls are never abandoned mid-flight; cancellation is honored
/// between them and during the countdown and playback.
async fn verify_sequence(
    config: &ResolvedConfig,
    device: &SharkCtrl,
    seconds: u64,
    grace: u64,
    cancel: &CancellationToken,
) -> Result<bool> {
    eprintln!(
        "Using fin '{}' (audio {}, control {})",
        config.fin_name,
        config.fin.audio_addr,
        config.fin.ctrl_addr.as_deref().unwrap_or("default")
    );
    eprintln!("Every configured fin is about to be retuned. Do not do this while another fin is recording.");
    eprintln!("Press Ctrl-C within {} seconds to leave the radios alone.", grace);
    for remaining in (0..grace).rev() {
        if until_cancelled(cancel, tokio::time::sleep(StdDuration::from_secs(1)))
            .await
            .is_none()
        {
            return Ok(false);
        }
        eprintln!("{}", remaining);
    }

    for (name, fin) in &config.fins {
        info!(fin = %name, station = %DECOY_STATION, "Parking fin");
        SharkCtrl::new(DECOY_STATION, fin.ctrl_addr.clone())
            .with_binary_path(config.recording.sharkctrl.clone())
            .tune(DECOY_STATION)
            .await?;
        if cancel.is_cancelled() {
            return Ok(false);
        }
    }

    let stations = verify_stations(config.station);
    eprintln!(
        "You should hear {} seconds of {}. If you hear {} instead, fix the fin addresses.",
        seconds,
        stations
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", then "),
        DECOY_STATION
    );

    let monitor = config.monitor();
    for station in stations {
        eprintln!("station: {}", station);
        device.tune(station).await?;
        device.indicate_active().await?;
        if cancel.is_cancelled() {
            return Ok(false);
        }
        match until_cancelled(cancel, monitor.play(StdDuration::from_secs(seconds))).await {
            Some(played) => played?,
            None => return Ok(false),
        }
    }

    device.indicate_idle().await?;
    Ok(true)
}

/// Check the selected fin by ear, restoring idle however it ends
async fn verify_fin(config: &ResolvedConfig, seconds: u64, grace: u64) -> Result<ExitCode> {
    let _lock = lock_fin(config)?;
    let device = shark_for(config);

    let cancel = CancellationToken::new();
    let signals = listen_for_signals(cancel.clone());
    let result = verify_sequence(config, &device, seconds, grace, &cancel).await;
    signals.abort();

    match result {
        Ok(true) => Ok(ExitCode::SUCCESS),
        Ok(false) => {
            restore_idle(&device).await;
            eprintln!("Killed at user request.");
            Ok(ExitCode::from(RunOutcome::Cancelled { fired: 0 }.exit_code()))
        }
        Err(e) => {
            restore_idle(&device).await;
            Err(e)
        }
    }
}

/// Force the recording indicator off
async fn force_idle(config: &ResolvedConfig) -> Result<()> {
    let device = shark_for(config);
    device
        .indicate_idle()
        .await
        .with_context(|| format!("Failed to idle fin '{}'", config.fin_name))?;
    eprintln!("Fin '{}' is idle", config.fin_name);
    Ok(())
}

/// Show resolved configuration
fn show_config(config: &ResolvedConfig) -> Result<()> {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("  sharkcast configuration");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!(
        "Config file: {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}
