use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use super::candidate::CandidateRecord;
use super::fallback;
use super::llm::{ChatCompletionsClient, LlmClient};
use super::parser::parse_candidate;
use super::prompt::{build_intake_prompt, INTAKE_SYSTEM_PROMPT};
use super::types::{BackendUsed, IntakeOutcome, IntakeResult};
use super::validation::validate_intake_result;
use super::{GeneratorError, IntakeError};
use crate::config::IntakeConfig;
use crate::pipeline::safety::keywords::has_symptoms;
use crate::pipeline::safety::redact::redact;
use crate::pipeline::safety::reply::sanitize_reply;
use crate::pipeline::safety::routing::{normalize_with_signals, TranscriptSignals};
use crate::pipeline::safety::types::Redaction;

/// Orchestrates one transcript through the intake pipeline:
/// redact → generator (or fallback) → normalize → sanitize → validate
pub struct IntakePipeline {
    generator: Option<Box<dyn LlmClient + Send + Sync>>,
}

impl IntakePipeline {
    pub fn new(generator: Box<dyn LlmClient + Send + Sync>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    /// Pipeline that always uses the rule-based fallback classifier.
    pub fn fallback_only() -> Self {
        Self { generator: None }
    }

    /// Build from configuration: Groq, else OpenAI, else fallback only.
    pub fn from_config(config: &IntakeConfig) -> Self {
        let Some(generator) = config.preferred_generator() else {
            tracing::info!("No generator configured, using fallback classifier only");
            return Self::fallback_only();
        };

        match ChatCompletionsClient::from_config(generator, config.llm_timeout_secs) {
            Ok(client) => {
                tracing::info!(
                    backend = generator.backend,
                    model = %generator.model,
                    "Generator configured"
                );
                Self::new(Box::new(client))
            }
            Err(e) => {
                tracing::warn!(
                    backend = generator.backend,
                    error = %e,
                    "Generator client unavailable, using fallback classifier only"
                );
                Self::fallback_only()
            }
        }
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Run the full pipeline on a raw transcript.
    ///
    /// Generator failures never fail the request: they are logged and the
    /// fallback classifier's record is used instead. Only a final record
    /// that breaks the output contract is returned as an error.
    pub fn analyze(&self, raw_transcript: &str) -> Result<IntakeOutcome, IntakeError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("intake", run_id = %run_id);
        let _guard = span.enter();
        let started = Instant::now();

        let redaction = redact(raw_transcript);

        let (candidate, backend) = match self.generate(&redaction) {
            Ok((candidate, name)) => (candidate.into_record(), BackendUsed::Generator(name)),
            Err(GeneratorError::NotConfigured) => (
                fallback::classify(&redaction.text, &redaction.tags),
                BackendUsed::Fallback,
            ),
            Err(e) => {
                tracing::warn!(error = %e, "Generator failed, using fallback classifier");
                (
                    fallback::classify(&redaction.text, &redaction.tags),
                    BackendUsed::Fallback,
                )
            }
        };

        let result = finalize(candidate, &redaction.text)?;

        tracing::info!(
            backend = backend.label(),
            redaction_tag_count = redaction.tags.len(),
            queue = %result.pharmacist_task.queue,
            red_flag = result.safety.red_flag_detected,
            advice_violation = result.safety.advice_violation,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Intake complete"
        );

        Ok(IntakeOutcome {
            transcript: redaction.text,
            result,
            redaction_tags: redaction.tags,
            backend,
        })
    }

    /// Async entry point; the blocking generator call runs on the blocking pool.
    pub async fn analyze_async(
        self: Arc<Self>,
        raw_transcript: String,
    ) -> Result<IntakeOutcome, IntakeError> {
        tokio::task::spawn_blocking(move || self.analyze(&raw_transcript))
            .await
            .map_err(|e| IntakeError::Worker(e.to_string()))?
    }

    /// Ask the generator for a candidate record. Only redacted text is sent.
    fn generate(&self, redaction: &Redaction) -> Result<(CandidateRecord, String), GeneratorError> {
        let generator = self.generator.as_ref().ok_or(GeneratorError::NotConfigured)?;

        let prompt = build_intake_prompt(&redaction.text, &redaction.tags);
        let reply = generator.complete(INTAKE_SYSTEM_PROMPT, &prompt)?;
        let candidate = parse_candidate(&reply)?;

        tracing::debug!(
            backend = generator.backend_name(),
            reply_len = reply.len(),
            "Generator candidate parsed"
        );

        Ok((candidate, generator.backend_name().to_string()))
    }
}

/// Apply the safety layer to a candidate record: routing is normalized
/// first so the reply tier follows the final risk level.
pub fn finalize(mut record: IntakeResult, redacted_transcript: &str) -> Result<IntakeResult, IntakeError> {
    let signals = TranscriptSignals::detect(redacted_transcript);
    normalize_with_signals(&mut record, &signals);

    let reply = sanitize_reply(
        &record.safe_patient_reply,
        record.risk_level,
        has_symptoms(redacted_transcript),
    );
    record.safety.advice_violation |= reply.advice_violation();
    record.safe_patient_reply = reply.text;

    validate_intake_result(&record)?;
    Ok(record)
}
