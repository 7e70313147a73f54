use std::path::Path;
use vad_rs::Vad;

use crate::capture::CaptureError;

const SILERO_THRESHOLD: f32 = 0.3;
const SILERO_THRESHOLD_END: f32 = 0.25;
const ENERGY_THRESHOLD: f32 = 0.01;
/// Hangover ratio: once speaking, a frame counts as speech down to this fraction of the onset threshold
const ENERGY_END_RATIO: f32 = 0.6;
/// Calibrated threshold sits this far above the measured noise floor
const NOISE_FLOOR_MARGIN: f32 = 2.5;

pub enum VadEngine {
    Silero(Vad),
    Energy { threshold: f32 },
}

impl VadEngine {
    pub fn silero(model_path: &Path, sample_rate: usize) -> Result<Self, CaptureError> {
        let path = model_path.to_string_lossy();
        let vad = Vad::new(&*path, sample_rate).map_err(|e| CaptureError::Vad(e.to_string()))?;
        Ok(VadEngine::Silero(vad))
    }

    pub fn energy() -> Self {
        VadEngine::Energy {
            threshold: ENERGY_THRESHOLD,
        }
    }

    /// Silero when the model file is present, energy otherwise
    pub fn load(model_path: &Path, sample_rate: usize) -> Self {
        if !model_path.exists() {
            tracing::debug!(path = %model_path.display(), "no VAD model, using energy detection");
            return Self::energy();
        }
        match Self::silero(model_path, sample_rate) {
            Ok(vad) => vad,
            Err(e) => {
                tracing::warn!(error = %e, "Silero VAD unavailable, using energy detection");
                Self::energy()
            }
        }
    }

    pub fn is_speech(&mut self, frame: &[f32], currently_speaking: bool) -> bool {
        match self {
            VadEngine::Silero(vad) => {
                let threshold = if currently_speaking {
                    SILERO_THRESHOLD_END
                } else {
                    SILERO_THRESHOLD
                };
                vad.compute(frame)
                    .map(|r| r.prob > threshold)
                    .unwrap_or(false)
            }
            VadEngine::Energy { threshold } => {
                let threshold = if currently_speaking {
                    *threshold * ENERGY_END_RATIO
                } else {
                    *threshold
                };
                rms(frame) > threshold
            }
        }
    }

    /// Set the energy threshold from the ambient noise floor, never below the default
    pub fn calibrate(&mut self, noise_floor: f32) {
        if let VadEngine::Energy { threshold } = self {
            *threshold = (noise_floor * NOISE_FLOOR_MARGIN).max(ENERGY_THRESHOLD);
            tracing::debug!(noise_floor, threshold = *threshold, "calibrated energy threshold");
        }
    }

    pub fn reset(&mut self) {
        if let VadEngine::Silero(vad) = self {
            vad.reset();
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VadEngine::Silero(_) => "Silero",
            VadEngine::Energy { .. } => "Energy",
        }
    }
}

pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    (frame.iter().map(|&s| s * s).sum::<f32>() / frame.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_detects_loud_frames() {
        let mut vad = VadEngine::energy();
        assert!(!vad.is_speech(&[0.0; 480], false));
        assert!(vad.is_speech(&[0.2; 480], false));
    }

    #[test]
    fn test_energy_hangover_when_speaking() {
        let mut vad = VadEngine::energy();
        let quiet = [0.008; 480];
        assert!(!vad.is_speech(&quiet, false));
        assert!(vad.is_speech(&quiet, true));
    }

    #[test]
    fn test_calibrate_tracks_noise_floor() {
        let mut vad = VadEngine::energy();
        vad.calibrate(0.02);
        assert!(matches!(vad, VadEngine::Energy { threshold } if threshold > 0.04));
        // Background hum no longer counts as speech
        assert!(!vad.is_speech(&[0.03; 480], false));

        // A quiet room brings it back down, but not below the default
        vad.calibrate(0.001);
        assert!(matches!(vad, VadEngine::Energy { threshold } if threshold == ENERGY_THRESHOLD));
    }

    #[test]
    fn test_missing_model_falls_back_to_energy() {
        let vad = VadEngine::load(Path::new("does/not/exist.onnx"), 16000);
        assert_eq!(vad.name(), "Energy");
    }

    #[test]
    fn test_rms_of_empty_frame() {
        assert_eq!(rms(&[]), 0.0);
    }
}
