use serde::{Deserialize, Serialize};

use super::GeneratorError;
use crate::config::GeneratorConfig;

/// An upstream text generator that turns a prompt pair into reply text.
pub trait LlmClient {
    fn complete(&self, system: &str, user: &str) -> Result<String, GeneratorError>;

    /// Short label reported as the backend that produced the record.
    fn backend_name(&self) -> &str;
}

/// Blocking client for OpenAI-compatible `/chat/completions` endpoints
/// (Groq and OpenAI both speak this dialect).
pub struct ChatCompletionsClient {
    backend: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl ChatCompletionsClient {
    pub fn new(
        backend: &str,
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, GeneratorError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GeneratorError::HttpClient(e.to_string()))?;

        Ok(Self {
            backend: backend.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &GeneratorConfig, timeout_secs: u64) -> Result<Self, GeneratorError> {
        Self::new(
            config.backend,
            &config.base_url,
            &config.api_key,
            &config.model,
            timeout_secs,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl LlmClient for ChatCompletionsClient {
    fn complete(&self, system: &str, user: &str) -> Result<String, GeneratorError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    GeneratorError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    GeneratorError::HttpClient(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    GeneratorError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GeneratorError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| GeneratorError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| GeneratorError::MalformedResponse("Empty completion".into()))
    }

    fn backend_name(&self) -> &str {
        &self.backend
    }
}

/// Mock generator for testing. Returns a configurable reply or error.
pub struct MockLlmClient {
    reply: Result<String, String>,
    name: String,
}

impl MockLlmClient {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            name: "mock".to_string(),
        }
    }

    /// A generator whose every call fails with a transport error.
    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            name: "mock".to_string(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
}

impl LlmClient for MockLlmClient {
    fn complete(&self, _system: &str, _user: &str) -> Result<String, GeneratorError> {
        self.reply
            .clone()
            .map_err(GeneratorError::HttpClient)
    }

    fn backend_name(&self) -> &str {
        &self.name
    }
}
