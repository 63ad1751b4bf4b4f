//! OpenAI chat-completions backend (blocking).

use super::{Generation, GenerationError, TextGenerator};
use crate::prompt::build_prompt;
use serde_json::json;
use std::time::Duration;
use vocabmaster_storage::LanguagePair;

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";
pub const OPENAI_MODEL_ENV: &str = "OPENAI_MODEL";

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    api_key: String,
    model: String,
    base_url: String,
    timeout: Option<Duration>,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl OpenAiGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Configure from `OPENAI_API_KEY`, `OPENAI_MODEL` and `OPENAI_BASE_URL`.
    pub fn from_env() -> Result<Self, GenerationError> {
        let key = std::env::var(OPENAI_API_KEY_ENV).unwrap_or_default();
        let key = key.trim();
        if key.is_empty() {
            return Err(GenerationError::MissingApiKey(OPENAI_API_KEY_ENV));
        }
        Ok(Self::new(key, env_or(OPENAI_MODEL_ENV, DEFAULT_MODEL))
            .with_base_url(env_or(OPENAI_BASE_URL_ENV, DEFAULT_BASE_URL)))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "temperature": 0.3,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| GenerationError::Network(format!("failed to build http client: {e}")))?;

        let resp = client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| GenerationError::Network(format!("failed to reach {url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let value: serde_json::Value = resp
            .json()
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        value
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                GenerationError::InvalidResponse("missing choices[0].message.content".to_string())
            })
    }
}

impl TextGenerator for OpenAiGenerator {
    fn generate(&self, pair: &LanguagePair, words: &[String]) -> Result<Generation, GenerationError> {
        let prompt = build_prompt(pair, words);
        tracing::info!(model = %self.model, words = words.len(), "requesting vocabulary rows");
        let raw = self.chat(&prompt.system, &prompt.user)?;
        if raw.trim().is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(Generation::from_raw(raw))
    }
}
