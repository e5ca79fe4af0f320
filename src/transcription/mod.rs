//! Speech-to-text boundary.
//!
//! The pipeline consumes `(transcript, language)` from a `TranscriptionEngine`;
//! concrete speech models plug in as `ModelLoader` implementations.

pub mod engine;
pub mod model_handle;

pub use engine::*;
pub use model_handle::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SttError {
    #[error(
        "Audio file too small ({bytes} bytes, minimum {min}). \
         Check microphone permissions and ensure the recording is not empty."
    )]
    AudioTooSmall { bytes: u64, min: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load {backend} model: {message}")]
    ModelLoad { backend: String, message: String },

    #[error("{backend} transcription failed: {message}")]
    Backend { backend: String, message: String },

    #[error("Speech-to-text produced no transcript{}", .0.as_ref().map(|e| format!(" (last error: {e})")).unwrap_or_default())]
    Exhausted(Option<String>),
}
