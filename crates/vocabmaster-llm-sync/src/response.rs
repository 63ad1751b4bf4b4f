//! Parsing of the tab-separated text returned by the generator.
//!
//! Current responses have four columns
//! (`original_word, recognized_word, translation, example`); older ones have
//! three (`word, translation, example`). Both are accepted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Generated content for one requested word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedRecord {
    /// Spelling the generator believes is correct. `None` when it left the
    /// column blank.
    pub recognized_word: Option<String>,
    /// Translation, or definition in same-language mode.
    pub translation: String,
    pub example: String,
}

impl GeneratedRecord {
    /// Recognized spelling, if it carries any signal.
    pub fn recognized(&self) -> Option<&str> {
        self.recognized_word
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
    }
}

/// Records keyed by the word as the generator echoed it, in response order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedRecords {
    order: Vec<String>,
    records: HashMap<String, GeneratedRecord>,
}

impl GeneratedRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. A repeated key keeps its first position and the
    /// latest content.
    pub fn insert(&mut self, key: impl Into<String>, record: GeneratedRecord) {
        let key = key.into();
        if !self.records.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.records.insert(key, record);
    }

    pub fn get(&self, key: &str) -> Option<&GeneratedRecord> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GeneratedRecord)> {
        self.order
            .iter()
            .filter_map(|k| self.records.get(k).map(|r| (k.as_str(), r)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl FromIterator<(String, GeneratedRecord)> for GeneratedRecords {
    fn from_iter<I: IntoIterator<Item = (String, GeneratedRecord)>>(iter: I) -> Self {
        let mut records = GeneratedRecords::new();
        for (key, record) in iter {
            records.insert(key, record);
        }
        records
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    pub records: GeneratedRecords,
    /// Lines that were neither 3 nor 4 columns wide.
    pub rejected: Vec<String>,
}

fn clean_translation(value: &str) -> String {
    value.trim().trim_matches('\'').trim().to_string()
}

fn clean_example(value: &str) -> String {
    value.trim().trim_matches('"').trim().to_string()
}

/// Parse raw generator output.
pub fn parse_response(text: &str) -> ParsedResponse {
    let mut parsed = ParsedResponse::default();

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("```") {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        let (word, recognized, translation, example) = match fields[..] {
            [word, translation, example] => (word, Some(word), translation, example),
            [word, recognized, translation, example] => {
                (word, Some(recognized), translation, example)
            }
            _ => {
                tracing::warn!(line = trimmed, "ignoring malformed response line");
                parsed.rejected.push(trimmed.to_string());
                continue;
            }
        };

        let word = word.trim();
        if word.is_empty() {
            parsed.rejected.push(trimmed.to_string());
            continue;
        }
        parsed.records.insert(
            word,
            GeneratedRecord {
                recognized_word: recognized
                    .map(str::trim)
                    .filter(|w| !w.is_empty())
                    .map(str::to_string),
                translation: clean_translation(translation),
                example: clean_example(example),
            },
        );
    }
    parsed
}
