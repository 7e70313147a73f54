use rodio::source::{SineWave, Source};
use rodio::{OutputStream, OutputStreamBuilder, Sink};
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::config::SpeechConfig;

/// Short tones played around each capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// Microphone is open
    Start,
    /// Microphone closed, processing
    Stop,
}

impl Cue {
    fn frequency(self) -> f32 {
        match self {
            Cue::Start => 880.0,
            Cue::Stop => 440.0,
        }
    }
}

/// Speech output. No error channel: failures are logged and swallowed.
pub trait Speaker {
    fn speak(&mut self, text: &str);

    fn cue(&mut self, _cue: Cue) {}
}

// ============================================================================
// Earcons
// ============================================================================

struct Earcons {
    stream: Option<OutputStream>,
}

impl Earcons {
    fn open() -> Option<Self> {
        match OutputStreamBuilder::open_default_stream() {
            Ok(stream) => Some(Self {
                stream: Some(stream),
            }),
            Err(e) => {
                tracing::warn!(error = %e, "no audio output, earcons disabled");
                None
            }
        }
    }

    fn play(&self, cue: Cue) {
        let Some(stream) = self.stream.as_ref() else {
            return;
        };
        let sink = Sink::connect_new(stream.mixer());
        sink.append(
            SineWave::new(cue.frequency())
                .take_duration(Duration::from_millis(120))
                .amplify(0.2),
        );
        sink.sleep_until_end();
    }
}

impl Drop for Earcons {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            std::mem::forget(stream); // Suppress "Dropping OutputStream" warning
        }
    }
}

// ============================================================================
// System voice
// ============================================================================

/// Speaks through the platform's speech command and blocks until done
pub struct SystemVoice {
    command: Vec<String>,
    earcons: Option<Earcons>,
}

impl SystemVoice {
    pub fn new(config: &SpeechConfig) -> Self {
        let command = config
            .command
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(default_speech_command);
        let earcons = if config.earcons { Earcons::open() } else { None };
        tracing::info!(command = %command.join(" "), earcons = earcons.is_some(), "speech ready");
        Self { command, earcons }
    }

    fn build(&self, text: &str) -> Command {
        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..]);
        if cfg!(target_os = "windows") && self.command[0] == "powershell" {
            cmd.arg(format!(
                "Add-Type -AssemblyName System.Speech; \
                 (New-Object System.Speech.Synthesis.SpeechSynthesizer).Speak('{}')",
                text.replace('\'', "''")
            ));
        } else {
            cmd.arg(text);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }
}

fn default_speech_command() -> Vec<String> {
    let parts: &[&str] = if cfg!(target_os = "macos") {
        &["say"]
    } else if cfg!(target_os = "windows") {
        &["powershell", "-NoProfile", "-Command"]
    } else {
        &["espeak-ng"]
    };
    parts.iter().map(|s| s.to_string()).collect()
}

impl Speaker for SystemVoice {
    fn speak(&mut self, text: &str) {
        tracing::debug!(text, "speaking");
        match self.build(text).status() {
            Ok(status) if status.success() => {}
            Ok(status) => tracing::warn!(%status, "speech command failed"),
            Err(e) => tracing::warn!(error = %e, command = %self.command[0], "speech command unavailable"),
        }
    }

    fn cue(&mut self, cue: Cue) {
        if let Some(earcons) = &self.earcons {
            earcons.play(cue);
        }
    }
}

/// Speaks nothing; the transcript still shows what would have been said
#[derive(Debug, Default)]
pub struct SilentSpeaker;

impl Speaker for SilentSpeaker {
    fn speak(&mut self, text: &str) {
        tracing::debug!(text, "muted speech");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_command_wins() {
        let config = SpeechConfig {
            enabled: true,
            earcons: false,
            command: Some(vec!["echo".into(), "-n".into()]),
        };
        let voice = SystemVoice::new(&config);
        let cmd = voice.build("hello");
        assert_eq!(cmd.get_program(), "echo");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec!["-n", "hello"]);
    }

    #[test]
    fn test_empty_command_falls_back_to_platform_default() {
        let config = SpeechConfig {
            enabled: true,
            earcons: false,
            command: Some(Vec::new()),
        };
        let voice = SystemVoice::new(&config);
        assert_eq!(voice.command, default_speech_command());
    }

    #[test]
    fn test_cues_are_distinct() {
        assert_ne!(Cue::Start.frequency(), Cue::Stop.frequency());
    }
}
