//! Voice intake processor.
//!
//! Single entry point for an uploaded recording:
//! transcribe → intake pipeline → response.
//!
//! The raw transcript never leaves this module: the response carries the
//! redacted text only. Both engines are injected so the processor stays
//! testable with mock backends.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::IntakeConfig;
use crate::pipeline::intake::orchestrator::IntakePipeline;
use crate::pipeline::intake::types::VoiceIntakeResponse;
use crate::pipeline::intake::IntakeError;
use crate::transcription::TranscriptionEngine;

pub struct VoiceIntakeProcessor {
    transcriber: TranscriptionEngine,
    pipeline: IntakePipeline,
}

impl VoiceIntakeProcessor {
    pub fn new(transcriber: TranscriptionEngine, pipeline: IntakePipeline) -> Self {
        Self {
            transcriber,
            pipeline,
        }
    }

    /// Processor with the configured generator and an engine without speech
    /// backends; callers attach backends via `TranscriptionEngine::with_loader`.
    pub fn from_config(config: &IntakeConfig, transcriber: TranscriptionEngine) -> Self {
        Self::new(transcriber, IntakePipeline::from_config(config))
    }

    /// Full pipeline from an audio file path.
    pub fn process(&self, audio_path: &Path) -> Result<VoiceIntakeResponse, IntakeError> {
        let transcription = self.transcriber.transcribe(audio_path)?;

        let outcome = self.pipeline.analyze(&transcription.text)?;

        tracing::info!(
            language = ?transcription.language,
            backend = outcome.backend.label(),
            queue = %outcome.result.pharmacist_task.queue,
            "Voice intake processed"
        );

        Ok(VoiceIntakeResponse {
            transcript: outcome.transcript,
            language: transcription.language,
            result: outcome.result,
            redaction_tags: outcome.redaction_tags,
            backend: outcome.backend,
        })
    }

    /// Async wrapper; transcription and generation run on the blocking pool.
    pub async fn process_async(
        self: Arc<Self>,
        audio_path: PathBuf,
    ) -> Result<VoiceIntakeResponse, IntakeError> {
        tokio::task::spawn_blocking(move || self.process(&audio_path))
            .await
            .map_err(|e| IntakeError::Worker(e.to_string()))?
    }
}
