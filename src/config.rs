//! Runtime configuration.
//!
//! Everything is read from the environment once at startup. Missing or
//! empty variables fall back to the defaults below, so a bare environment
//! runs the pipeline in fallback-only mode.

use serde::Serialize;

/// Application-level constants
pub const APP_NAME: &str = "MedVoice";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Audio uploads below this size are almost always empty recordings.
pub const DEFAULT_MIN_AUDIO_BYTES: u64 = 5_000;

/// HTTP timeout for upstream generator calls.
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_GROQ_MODEL: &str = "llama3-70b-8192";
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "medvoice=info,medvoice_lib=info,warn"
}

/// Credentials and endpoint for one OpenAI-compatible chat backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Short backend label for logs and the response (`groq`, `openai`).
    pub backend: &'static str,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

/// Settings handed to transcription model loaders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WhisperSettings {
    pub model: String,
    pub device: String,
    pub compute_type: String,
}

impl Default for WhisperSettings {
    fn default() -> Self {
        Self {
            model: "base".into(),
            device: "cpu".into(),
            compute_type: "int8".into(),
        }
    }
}

/// Full runtime configuration.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub groq: Option<GeneratorConfig>,
    pub openai: Option<GeneratorConfig>,
    pub llm_timeout_secs: u64,
    pub min_audio_bytes: u64,
    pub whisper: WhisperSettings,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            groq: None,
            openai: None,
            llm_timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            min_audio_bytes: DEFAULT_MIN_AUDIO_BYTES,
            whisper: WhisperSettings::default(),
        }
    }
}

impl IntakeConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (tests inject a map).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let groq = get("GROQ_API_KEY").map(|api_key| GeneratorConfig {
            backend: "groq",
            api_key,
            model: get("GROQ_MODEL").unwrap_or_else(|| DEFAULT_GROQ_MODEL.into()),
            base_url: get("GROQ_BASE_URL").unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.into()),
        });

        let openai = get("OPENAI_API_KEY").map(|api_key| GeneratorConfig {
            backend: "openai",
            api_key,
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.into()),
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.into()),
        });

        let parse_u64 = |key: &str, default: u64| {
            get(key).and_then(|v| v.parse::<u64>().ok()).unwrap_or(default)
        };

        Self {
            groq,
            openai,
            llm_timeout_secs: parse_u64("MEDVOICE_LLM_TIMEOUT_SECS", defaults.llm_timeout_secs),
            min_audio_bytes: parse_u64("MEDVOICE_MIN_AUDIO_BYTES", defaults.min_audio_bytes),
            whisper: WhisperSettings {
                model: get("WHISPER_MODEL").unwrap_or(defaults.whisper.model),
                device: get("WHISPER_DEVICE").unwrap_or(defaults.whisper.device),
                compute_type: get("WHISPER_COMPUTE_TYPE").unwrap_or(defaults.whisper.compute_type),
            },
        }
    }

    /// The generator to use: Groq when configured, else OpenAI, else none.
    pub fn preferred_generator(&self) -> Option<&GeneratorConfig> {
        self.groq.as_ref().or(self.openai.as_ref())
    }
}
