use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use super::model_handle::ModelHandle;
use super::SttError;
use crate::config::{IntakeConfig, WhisperSettings};

/// Transcript text plus the detected language code, if the model reports one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcription {
    pub text: String,
    pub language: Option<String>,
}

/// A loaded speech model.
pub trait TranscriptionModel: Send + Sync {
    /// Transcribe one audio file. `vad_filter` enables voice-activity
    /// filtering where the model supports it.
    fn transcribe(&self, audio_path: &Path, vad_filter: bool) -> Result<Transcription, SttError>;
}

/// Loads a speech model. Loading is expensive and happens at most once per
/// backend.
pub trait ModelLoader: Send + Sync {
    type Model: TranscriptionModel;

    fn name(&self) -> &str;

    fn load(&self, settings: &WhisperSettings) -> Result<Self::Model, SttError>;

    /// Whether an empty first pass should be repeated without VAD.
    fn retry_without_vad(&self) -> bool {
        false
    }
}

/// Object-safe view of a backend, so the engine can hold a mixed list.
pub trait TranscriptionBackend: Send + Sync {
    fn name(&self) -> &str;

    fn transcribe(&self, audio_path: &Path, settings: &WhisperSettings) -> Result<Transcription, SttError>;
}

/// A `ModelLoader` paired with the handle its model lives in.
pub struct LazyBackend<L: ModelLoader> {
    loader: L,
    model: ModelHandle<L::Model>,
}

impl<L: ModelLoader> LazyBackend<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            model: ModelHandle::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_loaded()
    }
}

impl<L: ModelLoader> TranscriptionBackend for LazyBackend<L> {
    fn name(&self) -> &str {
        self.loader.name()
    }

    fn transcribe(&self, audio_path: &Path, settings: &WhisperSettings) -> Result<Transcription, SttError> {
        let model = self.model.get_or_try_init(|| {
            let started = Instant::now();
            let model = self.loader.load(settings)?;
            tracing::info!(
                backend = self.loader.name(),
                model = %settings.model,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Speech model loaded"
            );
            Ok::<_, SttError>(model)
        })?;

        let first = model.transcribe(audio_path, true)?;
        if !first.text.trim().is_empty() || !self.loader.retry_without_vad() {
            return Ok(first);
        }

        tracing::info!(backend = self.loader.name(), "Empty transcript with VAD, retrying without");
        model.transcribe(audio_path, false)
    }
}

/// Ordered speech-to-text backends behind a minimum-size gate.
pub struct TranscriptionEngine {
    backends: Vec<Box<dyn TranscriptionBackend>>,
    min_audio_bytes: u64,
    settings: WhisperSettings,
}

impl TranscriptionEngine {
    pub fn new(min_audio_bytes: u64, settings: WhisperSettings) -> Self {
        Self {
            backends: Vec::new(),
            min_audio_bytes,
            settings,
        }
    }

    pub fn from_config(config: &IntakeConfig) -> Self {
        Self::new(config.min_audio_bytes, config.whisper.clone())
    }

    /// Append a backend; backends are tried in insertion order.
    pub fn with_backend(mut self, backend: Box<dyn TranscriptionBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Convenience for `with_backend(Box::new(LazyBackend::new(loader)))`.
    pub fn with_loader<L: ModelLoader + 'static>(self, loader: L) -> Self {
        self.with_backend(Box::new(LazyBackend::new(loader)))
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Transcribe an audio file, trying each backend until one returns text.
    pub fn transcribe(&self, audio_path: &Path) -> Result<Transcription, SttError> {
        self.check_audio_size(audio_path)?;

        let started = Instant::now();
        let mut last_error: Option<String> = None;

        for backend in &self.backends {
            match backend.transcribe(audio_path, &self.settings) {
                Ok(transcription) if !transcription.text.trim().is_empty() => {
                    tracing::info!(
                        backend = backend.name(),
                        chars = transcription.text.len(),
                        language = ?transcription.language,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Transcription complete"
                    );
                    return Ok(Transcription {
                        text: transcription.text.trim().to_string(),
                        language: transcription.language,
                    });
                }
                Ok(_) => {
                    tracing::info!(backend = backend.name(), "Backend returned empty transcript");
                }
                Err(e) => {
                    tracing::warn!(backend = backend.name(), error = %e, "Transcription backend failed");
                    last_error = Some(format!("{}: {e}", backend.name()));
                }
            }
        }

        Err(SttError::Exhausted(last_error))
    }

    /// Reject tiny files before any model is touched. Unknown size is not a
    /// rejection.
    fn check_audio_size(&self, audio_path: &Path) -> Result<(), SttError> {
        match std::fs::metadata(audio_path) {
            Ok(meta) if meta.len() < self.min_audio_bytes => Err(SttError::AudioTooSmall {
                bytes: meta.len(),
                min: self.min_audio_bytes,
            }),
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::debug!(error = %e, "Audio size unavailable, attempting transcription");
                Ok(())
            }
        }
    }
}
