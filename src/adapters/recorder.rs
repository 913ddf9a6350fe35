//! ALSA capture pipeline.
//!
//! Spawns `arecord` writing raw PCM to stdout and pipes it straight into an
//! encoder process. No shell is involved; both argument vectors are built
//! here.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    describe_status, helper_command, render_command, CaptureError, CaptureReport, RecordingAction,
};
use crate::config::paths;
use crate::domain::{Event, SchedulingZone};

/// Output encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Encoder {
    /// Ogg Vorbis via oggenc
    Ogg,

    /// MP3 via lame
    Mp3,

    /// Speex via speexenc
    Spx,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::Ogg
    }
}

impl Encoder {
    /// File extension of the encoded output
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Ogg => "ogg",
            Self::Mp3 => "mp3",
            Self::Spx => "spx",
        }
    }

    /// Default encoder binary
    pub fn program(&self) -> &'static str {
        match self {
            Self::Ogg => "oggenc",
            Self::Mp3 => "lame",
            Self::Spx => "speexenc",
        }
    }
}

impl std::fmt::Display for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Everything the recorder needs to know, resolved from configuration
#[derive(Debug, Clone)]
pub struct RecorderSettings {
    /// Directory recordings are written to
    pub audio_dir: PathBuf,

    /// ALSA capture device, e.g. "hw:2,0"
    pub audio_addr: String,

    /// How long to record each broadcast
    pub duration: Duration,

    pub encoder: Encoder,

    /// Artist tag written into each file
    pub artist: String,

    /// Zone used for the date tag
    pub zone: SchedulingZone,

    /// Path to the arecord binary
    pub arecord_path: String,

    /// Override for the encoder binary (defaults to `Encoder::program`)
    pub encoder_path: Option<String>,
}

/// Recording action backed by `arecord | <encoder>`
pub struct AlsaRecorder {
    settings: RecorderSettings,
}

impl AlsaRecorder {
    pub fn new(settings: RecorderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    /// Where the recording for `event` will be written
    pub fn output_path(&self, event: &Event) -> PathBuf {
        paths::recording_path(
            &self.settings.audio_dir,
            event.output_id(),
            self.settings.encoder.extension(),
        )
    }

    fn encoder_program(&self) -> &str {
        self.settings
            .encoder_path
            .as_deref()
            .unwrap_or_else(|| self.settings.encoder.program())
    }

    /// arecord arguments: raw 16-bit stereo at 44.1kHz on stdout.
    ///
    /// Raw output avoids the 4GB WAV size limit that cuts long games short.
    pub fn recorder_args(&self) -> Vec<String> {
        let seconds = self.settings.duration.as_secs().max(1).to_string();
        vec![
            "-q".to_string(),
            "-d".to_string(),
            seconds.clone(),
            "--max-file-time".to_string(),
            seconds,
            "-c".to_string(),
            "2".to_string(),
            "-f".to_string(),
            "S16_LE".to_string(),
            "-r".to_string(),
            "44100".to_string(),
            "-D".to_string(),
            self.settings.audio_addr.clone(),
            "-t".to_string(),
            "raw".to_string(),
        ]
    }

    /// Encoder arguments reading raw PCM from stdin and writing `output`
    pub fn encoder_args(&self, event: &Event, output: &Path) -> Vec<String> {
        let title = event.label().to_string();
        let date = event
            .local_time(self.settings.zone)
            .format("%d %B %Y")
            .to_string();
        let artist = self.settings.artist.clone();
        let output = output.to_string_lossy().to_string();

        match self.settings.encoder {
            Encoder::Ogg => vec![
                "-Q".into(),
                "-r".into(),
                "--resample".into(),
                "8000".into(), // plenty for AM radio
                "--downmix".into(),
                "-q".into(),
                "0".into(),
                "--ignorelength".into(), // stream may exceed 4GB
                "-o".into(),
                output,
                "--title".into(),
                format!("{} ({})", title, date),
                "--album".into(),
                title,
                "--artist".into(),
                artist,
                "--date".into(),
                date,
                "-".into(),
            ],
            Encoder::Mp3 => vec![
                "--quiet".into(),
                "-r".into(),
                "-s".into(),
                "44.1".into(),
                "--bitwidth".into(),
                "16".into(),
                "--resample".into(),
                "8".into(),
                "-V3".into(),
                "--vbr-new".into(),
                "-q0".into(),
                "-B16".into(),
                "--lowpass".into(),
                "15.4".into(),
                "--athaa-sensitivity".into(),
                "1".into(),
                "--tt".into(),
                format!("{} ({})", title, date),
                "--tl".into(),
                title,
                "--ta".into(),
                artist,
                "-".into(),
                output,
            ],
            Encoder::Spx => vec![
                "-w".into(), // wideband
                "--16bit".into(),
                "--le".into(),
                "--stereo".into(),
                "--rate".into(),
                "44100".into(),
                "--title".into(),
                format!("{} ({})", title, date),
                "--author".into(),
                artist,
                "-".into(),
                output,
            ],
        }
    }

    /// Create the audio directory and repoint `latest.<ext>` at `output`
    async fn prepare_output(&self, output: &Path) -> Result<(), CaptureError> {
        let dir = &self.settings.audio_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| CaptureError::Io {
                context: format!("Failed to create {}", dir.display()),
                source,
            })?;

        let latest = paths::latest_link(dir, self.settings.encoder.extension());
        point_latest(&latest, output)
            .await
            .map_err(|source| CaptureError::Io {
                context: format!("Failed to update {}", latest.display()),
                source,
            })
    }

    async fn run_pipeline(&self, event: &Event, output: &Path) -> Result<(), CaptureError> {
        let recorder_args = self.recorder_args();
        let encoder_program = self.encoder_program().to_string();
        let encoder_args = self.encoder_args(event, output);

        debug!(
            recorder = %render_command(&self.settings.arecord_path, &recorder_args),
            encoder = %render_command(&encoder_program, &encoder_args),
            "Spawning capture pipeline"
        );

        // kill_on_drop: an abandoned capture takes its processes with it
        let mut recorder = helper_command(&self.settings.arecord_path)
            .args(&recorder_args)
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                program: self.settings.arecord_path.clone(),
                source,
            })?;

        let audio: Stdio = recorder
            .stdout
            .take()
            .ok_or_else(|| CaptureError::Other("arecord stdout was not captured".to_string()))?
            .try_into()
            .map_err(|source| CaptureError::Io {
                context: "Failed to pipe arecord into the encoder".to_string(),
                source,
            })?;

        let mut encoder = helper_command(&encoder_program)
            .args(&encoder_args)
            .stdin(audio)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                program: encoder_program.clone(),
                source,
            })?;

        let (recorder_status, encoder_status) = tokio::join!(recorder.wait(), encoder.wait());

        let recorder_status = recorder_status.map_err(|source| CaptureError::Io {
            context: format!("Failed to wait for {}", self.settings.arecord_path),
            source,
        })?;
        if !recorder_status.success() {
            return Err(CaptureError::ExitStatus {
                command: render_command(&self.settings.arecord_path, &recorder_args),
                status: describe_status(recorder_status),
            });
        }

        let encoder_status = encoder_status.map_err(|source| CaptureError::Io {
            context: format!("Failed to wait for {}", encoder_program),
            source,
        })?;
        if !encoder_status.success() {
            return Err(CaptureError::ExitStatus {
                command: render_command(&encoder_program, &encoder_args),
                status: describe_status(encoder_status),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl RecordingAction for AlsaRecorder {
    fn name(&self) -> &str {
        "alsa"
    }

    async fn capture(&self, event: &Event) -> Result<CaptureReport, CaptureError> {
        let output = self.output_path(event);
        self.prepare_output(&output).await?;

        let started = Instant::now();
        info!(output = %output.display(), duration_secs = self.settings.duration.as_secs(), "Capture started");
        self.run_pipeline(event, &output).await?;

        Ok(CaptureReport {
            output,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(unix)]
async fn point_latest(link: &Path, target: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(link).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    tokio::fs::symlink(target, link).await
}

#[cfg(not(unix))]
async fn point_latest(link: &Path, _target: &Path) -> std::io::Result<()> {
    debug!(link = %link.display(), "Symlinks unsupported here, skipping latest link");
    Ok(())
}
