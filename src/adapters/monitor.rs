//! Live monitoring through the speakers.
//!
//! Plays a fin's audio input with `arecord | aplay` for a few seconds, so an
//! operator can hear which station a fin is really on before trusting its
//! addresses with a season of games.

use std::process::Stdio;
use std::time::Duration;

use tracing::debug;

use super::{describe_status, helper_command, render_command, CaptureError};

/// Raw PCM format shared by both ends of the pipe
const FORMAT_ARGS: [&str; 8] = ["-c", "2", "-f", "S16_LE", "-r", "44100", "-t", "raw"];

/// `arecord | aplay` monitor for one fin
#[derive(Debug, Clone)]
pub struct AlsaMonitor {
    /// ALSA capture device, e.g. "hw:2,0"
    audio_addr: String,
    arecord_path: String,
    aplay_path: String,
}

impl AlsaMonitor {
    pub fn new(audio_addr: impl Into<String>) -> Self {
        Self {
            audio_addr: audio_addr.into(),
            arecord_path: "arecord".to_string(),
            aplay_path: "aplay".to_string(),
        }
    }

    pub fn with_arecord_path(mut self, path: impl Into<String>) -> Self {
        self.arecord_path = path.into();
        self
    }

    pub fn with_aplay_path(mut self, path: impl Into<String>) -> Self {
        self.aplay_path = path.into();
        self
    }

    /// arecord arguments for `length` of audio on stdout
    pub fn capture_args(&self, length: Duration) -> Vec<String> {
        let mut args = vec![
            "-q".to_string(),
            "-d".to_string(),
            length.as_secs().max(1).to_string(),
            "-D".to_string(),
            self.audio_addr.clone(),
        ];
        args.extend(FORMAT_ARGS.iter().map(|a| a.to_string()));
        args
    }

    /// aplay arguments reading the same raw stream from stdin
    pub fn playback_args(&self) -> Vec<String> {
        let mut args = vec!["-q".to_string()];
        args.extend(FORMAT_ARGS.iter().map(|a| a.to_string()));
        args
    }

    /// Play `length` of the fin's audio. Dropping the future kills both ends.
    pub async fn play(&self, length: Duration) -> Result<(), CaptureError> {
        let capture_args = self.capture_args(length);
        let playback_args = self.playback_args();
        debug!(
            capture = %render_command(&self.arecord_path, &capture_args),
            playback = %render_command(&self.aplay_path, &playback_args),
            "Spawning monitor pipeline"
        );

        let mut capture = helper_command(&self.arecord_path)
            .args(&capture_args)
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                program: self.arecord_path.clone(),
                source,
            })?;

        let audio: Stdio = capture
            .stdout
            .take()
            .ok_or_else(|| CaptureError::Other("arecord stdout was not captured".to_string()))?
            .try_into()
            .map_err(|source| CaptureError::Io {
                context: "Failed to pipe arecord into aplay".to_string(),
                source,
            })?;

        let mut playback = helper_command(&self.aplay_path)
            .args(&playback_args)
            .stdin(audio)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                program: self.aplay_path.clone(),
                source,
            })?;

        let (capture_status, playback_status) = tokio::join!(capture.wait(), playback.wait());

        for (program, args, status) in [
            (&self.arecord_path, &capture_args, capture_status),
            (&self.aplay_path, &playback_args, playback_status),
        ] {
            let status = status.map_err(|source| CaptureError::Io {
                context: format!("Failed to wait for {}", program),
                source,
            })?;
            if !status.success() {
                return Err(CaptureError::ExitStatus {
                    command: render_command(program, args),
                    status: describe_status(status),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_ends_agree_on_format() {
        let monitor = AlsaMonitor::new("hw:1,0");
        let capture = monitor.capture_args(Duration::from_secs(10));
        assert_eq!(capture[..5], ["-q", "-d", "10", "-D", "hw:1,0"]);
        assert_eq!(capture[5..], monitor.playback_args()[1..]);
    }

    #[test]
    fn test_length_is_at_least_one_second() {
        let monitor = AlsaMonitor::new("hw:1,0");
        assert_eq!(monitor.capture_args(Duration::from_millis(200))[2], "1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_play_runs_both_ends() {
        let monitor = AlsaMonitor::new("hw:1,0")
            .with_arecord_path("true")
            .with_aplay_path("true");
        assert!(monitor.play(Duration::from_secs(1)).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_playback_failure_is_reported() {
        let monitor = AlsaMonitor::new("hw:1,0")
            .with_arecord_path("true")
            .with_aplay_path("false");
        let err = monitor.play(Duration::from_secs(1)).await.unwrap_err();
        match err {
            CaptureError::ExitStatus { command, status } => {
                assert!(command.starts_with("false -q -c 2"));
                assert_eq!(status, "1");
            }
            other => panic!("Expected ExitStatus, got {:?}", other),
        }
    }
}
