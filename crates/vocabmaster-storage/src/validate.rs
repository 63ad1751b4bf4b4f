//! Pre-write validation of a record set.
//!
//! Runs before [`crate::atomic::write_atomic`] so a broken merge never
//! reaches disk.

use crate::error::{Result, StorageError};
use crate::VocabularyEntry;
use std::collections::HashSet;

/// Check a record set and return the number of entries it holds.
pub fn validate_records(entries: &[VocabularyEntry]) -> Result<usize> {
    if entries.is_empty() {
        return Err(StorageError::Validation("No entries to write".to_string()));
    }

    let mut seen = HashSet::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        if entry.word.trim().is_empty() {
            return Err(StorageError::Validation(format!(
                "Entry {} is missing required field 'word'",
                idx + 1
            )));
        }
        if !seen.insert(entry.word.as_str()) {
            return Err(StorageError::Validation(format!(
                "Duplicate entry for word {:?}",
                entry.word
            )));
        }
    }
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_rejected() {
        let err = validate_records(&[]).unwrap_err();
        assert_eq!(err.to_string(), "No entries to write");
    }

    #[test]
    fn test_valid_set_counted() {
        let entries = vec![
            VocabularyEntry::new("hello", "bonjour", "Hello there"),
            VocabularyEntry::pending("world"),
        ];
        assert_eq!(validate_records(&entries).unwrap(), 2);
    }

    #[test]
    fn test_blank_word_rejected() {
        let entries = vec![VocabularyEntry::new("  ", "x", "y")];
        let err = validate_records(&entries).unwrap_err().to_string();
        assert!(err.contains("'word'"));
    }

    #[test]
    fn test_duplicates_rejected() {
        let entries = vec![VocabularyEntry::pending("a"), VocabularyEntry::pending("a")];
        assert!(matches!(
            validate_records(&entries),
            Err(StorageError::Validation(_))
        ));
    }
}
