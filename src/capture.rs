//! Speech capture: one blocking call per turn that returns text or nothing
//!
//! - **MicCapture**: default microphone → 16 kHz mono → VAD endpointing → Parakeet
//! - **TextCapture**: typed lines from stdin, for running without a microphone
//!
//! Failures never cross the `SpeechCapture` boundary; they are logged and become `None`.

use cpal::Stream;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rubato::{FftFixedIn, Resampler};
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::config::CaptureConfig;
use crate::state::SharedState;
use crate::transcriber::Transcriber;
use crate::vad::{VadEngine, rms};

pub const TARGET_RATE: usize = 16000;
const RESAMPLE_CHUNK: usize = 1024;

// 30ms frames at 16kHz
const FRAME_SAMPLES: usize = 480;
const FRAME_MS: u64 = 30;
const ONSET_FRAMES: usize = 3;
const PREFILL_FRAMES: usize = 10;
const MIN_SPEECH_SAMPLES: usize = TARGET_RATE / 4;
/// A live input stream delivers a frame every 30ms; this long without one means it died
const STREAM_STALL: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device")]
    NoDevice,
    #[error("audio input error: {0}")]
    Stream(String),
    #[error("resampler error: {0}")]
    Resampler(String),
    #[error("VAD error: {0}")]
    Vad(String),
    #[error("model error: {0}")]
    Model(String),
    #[error("transcription failed: {0}")]
    Transcription(String),
}

/// Limits for one capture call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureParams {
    /// How long to wait for speech to start
    pub timeout: Duration,
    /// Longest phrase recorded once speech has started
    pub phrase_limit: Duration,
    /// Noise-floor measurement before listening
    pub ambient_adjust: Duration,
}

impl CaptureParams {
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            timeout: secs(config.timeout_secs),
            phrase_limit: secs(config.phrase_limit_secs),
            ambient_adjust: secs(config.ambient_adjust_secs),
        }
    }
}

fn secs(value: f32) -> Duration {
    Duration::try_from_secs_f32(value.max(0.0)).unwrap_or_default()
}

fn frames_for(duration: Duration) -> usize {
    (duration.as_millis() as u64).div_ceil(FRAME_MS) as usize
}

pub trait SpeechCapture {
    /// Block until one utterance is heard, or return `None` on timeout or failure
    fn capture(&mut self, params: &CaptureParams) -> Option<String>;
}

// ============================================================================
// Endpointing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum EndpointState {
    Idle,
    Onset(usize),
    Speaking { silence: usize },
}

/// What the endpointer decided after a frame
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    /// Nothing yet
    Waiting,
    /// Speech onset confirmed
    Started,
    /// Inside an utterance
    Recording,
    /// Utterance complete
    Finished(Vec<f32>),
    /// Speech was too short to keep; back to waiting
    Discarded,
    /// No speech before the timeout
    TimedOut,
}

/// Frame-driven onset/offset detection for a single utterance
pub struct Endpointer {
    state: EndpointState,
    prefill: VecDeque<Vec<f32>>,
    speech: Vec<f32>,
    frames_waited: usize,
    timeout_frames: usize,
    silence_frames: usize,
    max_samples: usize,
}

impl Endpointer {
    pub fn new(timeout: Duration, pause: Duration, phrase_limit: Duration) -> Self {
        Self {
            state: EndpointState::Idle,
            prefill: VecDeque::with_capacity(PREFILL_FRAMES + 1),
            speech: Vec::new(),
            frames_waited: 0,
            timeout_frames: frames_for(timeout).max(1),
            silence_frames: frames_for(pause).max(1),
            max_samples: (phrase_limit.as_secs_f32() * TARGET_RATE as f32) as usize,
        }
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self.state, EndpointState::Speaking { .. })
    }

    fn remember(&mut self, frame: &[f32]) {
        self.prefill.push_back(frame.to_vec());
        if self.prefill.len() > PREFILL_FRAMES {
            self.prefill.pop_front();
        }
    }

    pub fn push(&mut self, frame: &[f32], is_speech: bool) -> Endpoint {
        match self.state {
            EndpointState::Idle | EndpointState::Onset(_) => {
                self.frames_waited += 1;
                self.remember(frame);

                let onset = match self.state {
                    EndpointState::Onset(count) if is_speech => count + 1,
                    EndpointState::Idle if is_speech => 1,
                    _ => 0,
                };

                if onset >= ONSET_FRAMES {
                    for pf in self.prefill.drain(..) {
                        self.speech.extend_from_slice(&pf);
                    }
                    self.state = EndpointState::Speaking { silence: 0 };
                    return Endpoint::Started;
                }

                self.state = if onset > 0 {
                    EndpointState::Onset(onset)
                } else {
                    EndpointState::Idle
                };

                if self.frames_waited >= self.timeout_frames {
                    return Endpoint::TimedOut;
                }
                Endpoint::Waiting
            }
            EndpointState::Speaking { silence } => {
                self.speech.extend_from_slice(frame);
                let silence = if is_speech { 0 } else { silence + 1 };
                self.state = EndpointState::Speaking { silence };

                if silence < self.silence_frames && self.speech.len() < self.max_samples {
                    return Endpoint::Recording;
                }

                self.state = EndpointState::Idle;
                if self.speech.len() >= MIN_SPEECH_SAMPLES {
                    Endpoint::Finished(std::mem::take(&mut self.speech))
                } else {
                    self.speech.clear();
                    Endpoint::Discarded
                }
            }
        }
    }
}

// ============================================================================
// Microphone
// ============================================================================

struct FrameResampler {
    resampler: Option<FftFixedIn<f32>>,
    in_buf: Vec<f32>,
    pending: Vec<f32>,
    frame_samples: usize,
}

impl FrameResampler {
    fn new(in_hz: usize, out_hz: usize, frame_samples: usize) -> Result<Self, CaptureError> {
        let resampler = if in_hz != out_hz {
            Some(
                FftFixedIn::<f32>::new(in_hz, out_hz, RESAMPLE_CHUNK, 1, 1)
                    .map_err(|e| CaptureError::Resampler(e.to_string()))?,
            )
        } else {
            None
        };
        Ok(Self {
            resampler,
            in_buf: Vec::with_capacity(RESAMPLE_CHUNK),
            pending: Vec::with_capacity(frame_samples),
            frame_samples,
        })
    }

    fn push(&mut self, src: &[f32], mut emit: impl FnMut(&[f32])) {
        let Some(resampler) = self.resampler.as_mut() else {
            self.pending.extend_from_slice(src);
            self.emit_frames(&mut emit);
            return;
        };

        self.in_buf.extend_from_slice(src);

        while self.in_buf.len() >= RESAMPLE_CHUNK {
            let chunk: Vec<f32> = self.in_buf.drain(..RESAMPLE_CHUNK).collect();
            if let Ok(out) = resampler.process(&[&chunk], None) {
                self.pending.extend_from_slice(&out[0]);
            }
        }
        self.emit_frames(&mut emit);
    }

    fn emit_frames(&mut self, emit: &mut impl FnMut(&[f32])) {
        while self.pending.len() >= self.frame_samples {
            let frame: Vec<f32> = self.pending.drain(..self.frame_samples).collect();
            emit(&frame);
        }
    }
}

/// Open the default input and stream 16 kHz mono frames into `tx`
fn open_input(tx: flume::Sender<Vec<f32>>) -> Result<Stream, CaptureError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;
    let supported = device
        .default_input_config()
        .map_err(|e| CaptureError::Stream(e.to_string()))?;
    let input_rate = u32::from(supported.sample_rate()) as usize;
    let channels = supported.channels() as usize;

    tracing::debug!(input_rate, channels, "microphone open");

    let mut resampler = FrameResampler::new(input_rate, TARGET_RATE, FRAME_SAMPLES)?;

    let stream = device
        .build_input_stream(
            &supported.config(),
            move |data: &[f32], _| {
                let mono: Vec<f32> = if channels == 1 {
                    data.to_vec()
                } else {
                    data.chunks(channels)
                        .map(|c| c.iter().sum::<f32>() / channels as f32)
                        .collect()
                };
                resampler.push(&mono, |frame| {
                    let _ = tx.send(frame.to_vec());
                });
            },
            |err| tracing::warn!(error = %err, "input stream error"),
            None,
        )
        .map_err(|e| CaptureError::Stream(e.to_string()))?;

    stream
        .play()
        .map_err(|e| CaptureError::Stream(e.to_string()))?;
    Ok(stream)
}

/// Microphone capture with local VAD and transcription
pub struct MicCapture {
    transcriber: Transcriber,
    vad: VadEngine,
    pause: Duration,
}

impl MicCapture {
    pub fn new(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let transcriber = Transcriber::new(&config.transcriber_model)?;
        let vad = VadEngine::load(Path::new(&config.vad_model), TARGET_RATE);
        tracing::info!(vad = vad.name(), "microphone capture ready");
        Ok(Self {
            transcriber,
            vad,
            pause: Duration::from_millis(config.pause_ms as u64),
        })
    }

    /// Record one utterance; `Ok(None)` when nobody spoke before the timeout
    fn record(&mut self, params: &CaptureParams) -> Result<Option<Vec<f32>>, CaptureError> {
        let (tx, rx) = flume::unbounded();
        // Dropping the stream at the end of this call releases the microphone
        let _stream = open_input(tx)?;
        let next_frame = || {
            rx.recv_timeout(STREAM_STALL)
                .map_err(|_| CaptureError::Stream("input stream stalled".into()))
        };

        let ambient_frames = frames_for(params.ambient_adjust);
        if ambient_frames > 0 {
            let mut total = 0.0;
            for _ in 0..ambient_frames {
                total += rms(&next_frame()?);
            }
            self.vad.calibrate(total / ambient_frames as f32);
        }
        self.vad.reset();

        let mut endpointer = Endpointer::new(params.timeout, self.pause, params.phrase_limit);
        loop {
            let frame = next_frame()?;
            let is_speech = self.vad.is_speech(&frame, endpointer.is_speaking());
            match endpointer.push(&frame, is_speech) {
                Endpoint::Finished(samples) => return Ok(Some(samples)),
                Endpoint::TimedOut => return Ok(None),
                Endpoint::Started => tracing::debug!("speech started"),
                Endpoint::Discarded => tracing::debug!("speech too short, discarded"),
                Endpoint::Waiting | Endpoint::Recording => {}
            }
        }
    }
}

impl SpeechCapture for MicCapture {
    fn capture(&mut self, params: &CaptureParams) -> Option<String> {
        let samples = match self.record(params) {
            Ok(Some(samples)) => samples,
            Ok(None) => {
                tracing::debug!("no speech before timeout");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "capture failed");
                return None;
            }
        };

        match self.transcriber.transcribe(&samples) {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => {
                tracing::debug!(samples = samples.len(), "nothing recognised");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed");
                None
            }
        }
    }
}

// ============================================================================
// Typed input
// ============================================================================

/// Spawn a thread forwarding stdin lines; the channel disconnects at EOF
pub fn spawn_stdin_reader() -> flume::Receiver<String> {
    let (tx, rx) = flume::unbounded();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Reads utterances from a line channel instead of the microphone
pub struct TextCapture {
    lines: flume::Receiver<String>,
    state: SharedState,
}

impl TextCapture {
    pub fn new(lines: flume::Receiver<String>, state: SharedState) -> Self {
        Self { lines, state }
    }
}

impl SpeechCapture for TextCapture {
    fn capture(&mut self, params: &CaptureParams) -> Option<String> {
        match self.lines.recv_timeout(params.timeout) {
            Ok(line) => Some(line),
            Err(flume::RecvTimeoutError::Timeout) => None,
            Err(flume::RecvTimeoutError::Disconnected) => {
                tracing::info!("end of input, stopping");
                self.state.request_stop();
                None
            }
        }
    }
}
