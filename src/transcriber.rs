use std::path::Path;
use transcribe_rs::{
    TranscriptionEngine,
    engines::parakeet::{ParakeetEngine, ParakeetModelParams},
};

use crate::capture::CaptureError;

pub struct Transcriber {
    engine: ParakeetEngine,
}

impl Transcriber {
    pub fn new(model_path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let model_path = model_path.as_ref();
        let mut engine = ParakeetEngine::new();
        tracing::info!(model = %model_path.display(), "loading transcription model");
        engine
            .load_model_with_params(model_path, ParakeetModelParams::int8())
            .map_err(|e| CaptureError::Model(e.to_string()))?;
        tracing::info!("transcription model loaded");
        Ok(Self { engine })
    }

    /// Transcribe 16 kHz mono samples; returns lowercase text
    #[hotpath::measure]
    pub fn transcribe(&mut self, samples: &[f32]) -> Result<String, CaptureError> {
        let result = self
            .engine
            .transcribe_samples(samples.to_vec(), None)
            .map_err(|e| CaptureError::Transcription(e.to_string()))?;
        Ok(result.text.trim().to_lowercase())
    }
}
