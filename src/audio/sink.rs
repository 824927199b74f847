//! Audio sink contract and adapters
//!
//! The controller only talks to [`AudioSink`]. `OsascriptSink` drives the
//! macOS output device through AppleScript; `DryRunSink` only logs.

use std::process::Command;

use tracing::{debug, info};

/// Errors reported by an audio sink
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Applies volume and mute commands to the output device
pub trait AudioSink {
    /// Set output volume, 0-100
    fn set_volume_percent(&mut self, percent: u8) -> Result<(), AudioError>;

    /// Mute or unmute output
    fn set_mute(&mut self, muted: bool) -> Result<(), AudioError>;
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn set_volume_percent(&mut self, percent: u8) -> Result<(), AudioError> {
        (**self).set_volume_percent(percent)
    }

    fn set_mute(&mut self, muted: bool) -> Result<(), AudioError> {
        (**self).set_mute(muted)
    }
}

const OSASCRIPT: &str = "osascript";

/// macOS system output via `osascript`
#[derive(Debug, Default)]
pub struct OsascriptSink;

impl OsascriptSink {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, script: &str) -> Result<(), AudioError> {
        debug!(script, "running osascript");
        let output = Command::new(OSASCRIPT)
            .arg("-e")
            .arg(script)
            .output()
            .map_err(|source| AudioError::Spawn {
                program: OSASCRIPT,
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(AudioError::CommandFailed {
                program: OSASCRIPT,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

fn volume_script(percent: u8) -> String {
    format!("set volume output volume {}", percent.min(100))
}

fn mute_script(muted: bool) -> String {
    format!("set volume output muted {}", muted)
}

impl AudioSink for OsascriptSink {
    fn set_volume_percent(&mut self, percent: u8) -> Result<(), AudioError> {
        self.run(&volume_script(percent))
    }

    fn set_mute(&mut self, muted: bool) -> Result<(), AudioError> {
        self.run(&mute_script(muted))
    }
}

/// Sink that logs commands without touching the system
#[derive(Debug, Default)]
pub struct DryRunSink;

impl AudioSink for DryRunSink {
    fn set_volume_percent(&mut self, percent: u8) -> Result<(), AudioError> {
        info!(percent = percent.min(100), "dry run: set volume");
        Ok(())
    }

    fn set_mute(&mut self, muted: bool) -> Result<(), AudioError> {
        info!(muted, "dry run: set mute");
        Ok(())
    }
}
