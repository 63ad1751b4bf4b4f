//! Vocabmaster Storage Layer
//!
//! Owns every byte the application writes to disk:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       VOCABULARY STORAGE                            │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  ┌─────────────┐   ┌───────────┐   ┌─────────────┐   ┌──────────┐  │
//! │  │ VocabTable  │──►│ Validator │──►│ Atomic      │──►│ vocab    │  │
//! │  │ (in memory) │   │           │   │ Writer      │   │ CSV      │  │
//! │  └─────────────┘   └───────────┘   └─────────────┘   └────┬─────┘  │
//! │                                                           │        │
//! │                                                     snapshot       │
//! │                                                           ▼        │
//! │  ┌─────────────┐   ┌───────────┐   ┌─────────────┐   ┌──────────┐  │
//! │  │  Restore    │◄──│ Migrator  │◄──│ Format      │◄──│ .backup/ │  │
//! │  │  Engine     │   │           │   │ Detector    │   │ {pair}   │  │
//! │  └─────────────┘   └───────────┘   └─────────────┘   └──────────┘  │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - **No partial writes**: live files only change through a temp-file rename
//! - **Bounded backups**: at most 10 snapshots per file, 15 raw captures
//! - **Undo before restore**: the live file is snapshotted before it is replaced
//! - **Schema compatibility**: 3-column and headerless backups are migrated

pub mod atomic;
pub mod backup;
pub mod csv_store;
pub mod deck;
pub mod decision;
pub mod error;
pub mod format;
pub mod layout;
pub mod migrate;
pub mod restore;
pub mod sanitize;
pub mod validate;


pub use atomic::{write_atomic, write_atomic_bytes};
pub use backup::{format_backup_timestamp, BackupEntry, BackupKind, BackupManager};
pub use csv_store::{CsvRecordStore, Pending, VocabularyStats};
pub use deck::DeckWriter;
pub use decision::{Decider, FixedDecider};
pub use error::{Result, StorageError};
pub use format::FormatVersion;
pub use layout::{validate_language_name, DataLayout, LanguagePair, PairMode};
pub use migrate::Migration;
pub use restore::{BackupAudit, BackupCheck, RestoreEngine, RestoreFailure, RestoreOutcome};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Core Types
// ============================================================================

/// One row of the vocabulary CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub word: String,
    pub translation: String,
    pub example: String,
}

impl VocabularyEntry {
    pub fn new(
        word: impl Into<String>,
        translation: impl Into<String>,
        example: impl Into<String>,
    ) -> Self {
        Self {
            word: word.into(),
            translation: translation.into(),
            example: example.into(),
        }
    }

    /// A freshly added word with nothing generated yet.
    pub fn pending(word: impl Into<String>) -> Self {
        Self::new(word, "", "")
    }

    /// Both translation and example are non-blank.
    pub fn is_complete(&self) -> bool {
        !self.translation.trim().is_empty() && !self.example.trim().is_empty()
    }

    pub fn is_blank(&self) -> bool {
        self.word.trim().is_empty()
            && self.translation.trim().is_empty()
            && self.example.trim().is_empty()
    }
}

/// Insertion-ordered word → entry table.
///
/// Words are case-sensitive keys. Renaming keeps the entry in place so a
/// rewrite does not reorder the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabularyTable {
    entries: Vec<VocabularyEntry>,
    index: HashMap<String, usize>,
}

impl VocabularyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    pub fn get(&self, word: &str) -> Option<&VocabularyEntry> {
        self.index.get(word).map(|&idx| &self.entries[idx])
    }

    pub fn get_mut(&mut self, word: &str) -> Option<&mut VocabularyEntry> {
        match self.index.get(word) {
            Some(&idx) => Some(&mut self.entries[idx]),
            None => None,
        }
    }

    /// Insert a new entry. Returns `false` (and leaves the table alone) if the
    /// word is already present.
    pub fn insert(&mut self, entry: VocabularyEntry) -> bool {
        if self.index.contains_key(&entry.word) {
            return false;
        }
        self.index.insert(entry.word.clone(), self.entries.len());
        self.entries.push(entry);
        true
    }

    /// Insert, or fill the blank fields of an existing entry with the same
    /// word. Used when loading files that repeat a word.
    pub fn upsert_fill(&mut self, entry: VocabularyEntry) {
        match self.get_mut(&entry.word) {
            Some(existing) => {
                if existing.translation.trim().is_empty() {
                    existing.translation = entry.translation;
                }
                if existing.example.trim().is_empty() {
                    existing.example = entry.example;
                }
            }
            None => {
                self.insert(entry);
            }
        }
    }

    /// Change the key of `old` to `new` in place.
    ///
    /// Fails (returns `false`) when `old` is absent or `new` already exists.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        if old == new {
            return self.contains(old);
        }
        if self.index.contains_key(new) {
            return false;
        }
        let Some(idx) = self.index.remove(old) else {
            return false;
        };
        self.entries[idx].word = new.to_string();
        self.index.insert(new.to_string(), idx);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &VocabularyEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[VocabularyEntry] {
        &self.entries
    }

    /// Words whose translation or example is still blank, in file order.
    pub fn pending_words(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| !e.word.trim().is_empty() && !e.is_complete())
            .map(|e| e.word.clone())
            .collect()
    }
}

impl FromIterator<VocabularyEntry> for VocabularyTable {
    fn from_iter<I: IntoIterator<Item = VocabularyEntry>>(iter: I) -> Self {
        let mut table = VocabularyTable::new();
        for entry in iter {
            table.upsert_fill(entry);
        }
        table
    }
}
