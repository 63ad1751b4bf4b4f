//! Language pairs and the on-disk layout derived from them.
//!
//! Language names end up inside file names, so they are validated before any
//! path is built: only ASCII letters, digits, `-` and `_` survive, which rules
//! out separators and `..` components.

use crate::error::{Result, StorageError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const MAX_LANGUAGE_NAME_LEN: usize = 64;

/// Directory (under the data dir) that holds per-pair backup directories.
pub const BACKUP_DIR_NAME: &str = ".backup";

pub const VOCABULARY_PREFIX: &str = "vocab_list_";
pub const DECK_PREFIX: &str = "anki_deck_";

/// Validate and normalize (lowercase) a language name.
pub fn validate_language_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    let invalid = |reason: &str| StorageError::InvalidLanguageName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("language name cannot be empty"));
    }
    if trimmed.len() > MAX_LANGUAGE_NAME_LEN {
        return Err(invalid(&format!(
            "language name is too long (max {MAX_LANGUAGE_NAME_LEN} characters)"
        )));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(invalid(
            "language name can only contain letters, numbers, hyphens and underscores",
        ));
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// What the generated column holds for a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairMode {
    /// Learning language differs from mother tongue.
    Translation,
    /// Same language on both sides: definitions instead of translations.
    Definition,
}

/// A validated `learn:mother` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguagePair {
    learn: String,
    mother: String,
}

impl LanguagePair {
    pub fn new(learn: &str, mother: &str) -> Result<Self> {
        Ok(Self {
            learn: validate_language_name(learn)?,
            mother: validate_language_name(mother)?,
        })
    }

    pub fn learn(&self) -> &str {
        &self.learn
    }

    pub fn mother(&self) -> &str {
        &self.mother
    }

    pub fn mode(&self) -> PairMode {
        if self.learn.eq_ignore_ascii_case(&self.mother) {
            PairMode::Definition
        } else {
            PairMode::Translation
        }
    }

    /// `learn-mother`, the form used in file and directory names.
    pub fn slug(&self) -> String {
        format!("{}-{}", self.learn, self.mother)
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.learn, self.mother)
    }
}

impl FromStr for LanguagePair {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((learn, mother)) if !mother.contains(':') => Self::new(learn, mother),
            _ => Err(StorageError::InvalidLanguageName {
                name: s.to_string(),
                reason: "expected a pair in the form learn:mother".to_string(),
            }),
        }
    }
}

impl TryFrom<String> for LanguagePair {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<LanguagePair> for String {
    fn from(pair: LanguagePair) -> Self {
        pair.to_string()
    }
}

/// Resolves every file the storage layer touches for a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    data_dir: PathBuf,
}

impl DataLayout {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn vocabulary_path(&self, pair: &LanguagePair) -> PathBuf {
        self.data_dir
            .join(format!("{VOCABULARY_PREFIX}{}.csv", pair.slug()))
    }

    pub fn deck_path(&self, pair: &LanguagePair) -> PathBuf {
        self.data_dir.join(format!("{DECK_PREFIX}{}.csv", pair.slug()))
    }

    pub fn backup_dir(&self, pair: &LanguagePair) -> PathBuf {
        self.data_dir.join(BACKUP_DIR_NAME).join(pair.slug())
    }
}
