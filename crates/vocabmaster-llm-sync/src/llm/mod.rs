//! Text generation backends.
//!
//! The enrichment pipeline only needs "words in, tab-separated rows out", so
//! the seam is a single blocking trait. The network client is optional and
//! lives behind the `openai` feature.

use crate::response::{parse_response, GeneratedRecords};
use vocabmaster_storage::LanguagePair;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "openai")]
pub use openai::OpenAiGenerator;

/// Raw text plus the records parsed from it.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    pub raw: String,
    pub records: GeneratedRecords,
    /// Lines of `raw` that did not parse.
    pub rejected: Vec<String>,
}

impl Generation {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = parse_response(&raw);
        Self {
            raw,
            records: parsed.records,
            rejected: parsed.rejected,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("text generation requires {0} to be set")]
    MissingApiKey(&'static str),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Generator returned no content")]
    Empty,
}

/// Produces vocabulary rows for a batch of words.
pub trait TextGenerator {
    fn generate(&self, pair: &LanguagePair, words: &[String]) -> Result<Generation, GenerationError>;
}

/// Replays a fixed response. Useful for re-importing a saved capture.
#[derive(Debug, Clone)]
pub struct ReplayGenerator {
    raw: String,
}

impl ReplayGenerator {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

impl TextGenerator for ReplayGenerator {
    fn generate(&self, _pair: &LanguagePair, _words: &[String]) -> Result<Generation, GenerationError> {
        if self.raw.trim().is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(Generation::from_raw(self.raw.clone()))
    }
}
