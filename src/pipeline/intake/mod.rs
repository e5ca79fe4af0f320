pub mod types;
pub mod candidate;
pub mod parser;
pub mod prompt;
pub mod llm;
pub mod fallback;
pub mod validation;
pub mod orchestrator;

#[cfg(test)]
mod pipeline_tests;

pub use types::*;
pub use candidate::*;
pub use parser::*;
pub use prompt::*;
pub use llm::*;
pub use fallback::*;
pub use validation::*;
pub use orchestrator::*;

use thiserror::Error;

use crate::transcription::SttError;

/// Failures of the upstream text generator. Every variant is recovered by
/// the orchestrator, which substitutes the fallback classifier.
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("No text generator configured")]
    NotConfigured,

    #[error("Generator unreachable at {0}")]
    Connection(String),

    #[error("Generator returned error (status {status}): {body}")]
    HttpStatus { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed generator response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("Candidate record failed structural validation: {0}")]
    Schema(String),
}

/// Failures surfaced to the caller of the intake pipeline.
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Transcription failed: {0}")]
    Transcription(#[from] SttError),

    #[error("Final intake record violates schema: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),

    #[error("Intake worker failed: {0}")]
    Worker(String),
}

impl IntakeError {
    /// True when the request itself was unusable (e.g. audio too small);
    /// everything else is a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Transcription(SttError::AudioTooSmall { .. })
        )
    }
}
