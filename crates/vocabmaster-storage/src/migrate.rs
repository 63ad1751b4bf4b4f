//! Rewrites older backup layouts into the current ones.
//!
//! A migration either writes its complete output or nothing: every line is
//! converted in memory first and the result goes through the atomic writer.

use crate::atomic::write_atomic_bytes;
use crate::csv_store::{read_rows, write_entries};
use crate::error::{Result, StorageError};
use crate::format::{content_lines, detect, FormatVersion};
use crate::VocabularyEntry;
use std::fs;
use std::path::{Path, PathBuf};

/// Summary of a finished migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub output_path: PathBuf,
    pub original_format: FormatVersion,
    pub rows_migrated: usize,
}

/// `foo.bak` → `foo.migrated.bak`
pub fn default_output_path(path: &Path) -> PathBuf {
    path.with_extension("migrated.bak")
}

/// One line of a headerless tab-separated capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabRow<'a> {
    pub word: &'a str,
    pub recognized: &'a str,
    pub translation: &'a str,
    pub example: &'a str,
}

/// Split a 3- or 4-field line. Three fields mean the word was not corrected,
/// so it doubles as the recognized spelling.
pub fn split_tab_row(line: &str) -> Option<TabRow<'_>> {
    let fields: Vec<&str> = line.split('\t').collect();
    match fields[..] {
        [word, translation, example] => Some(TabRow {
            word,
            recognized: word,
            translation,
            example,
        }),
        [word, recognized, translation, example] => Some(TabRow {
            word,
            recognized,
            translation,
            example,
        }),
        _ => None,
    }
}

fn parse_tab_rows<'a>(path: &Path, text: &'a str) -> Result<Vec<TabRow<'a>>> {
    content_lines(text)
        .map(|(line_no, line)| {
            split_tab_row(line).ok_or_else(|| StorageError::FormatMigration {
                path: path.to_path_buf(),
                reason: format!(
                    "line {line_no} has {} tab-separated fields (expected 3 or 4)",
                    line.split('\t').count()
                ),
            })
        })
        .collect()
}

/// Upgrade a raw AI capture to the 4-column layout.
///
/// Already 4-column files are left alone and reported with their own path.
pub fn migrate_ai_response(path: &Path, output: Option<&Path>) -> Result<Migration> {
    if !path.is_file() {
        return Err(StorageError::BackupNotFound(path.to_path_buf()));
    }
    let original_format = detect(path);
    match original_format {
        FormatVersion::FourColumn => {
            return Ok(Migration {
                output_path: path.to_path_buf(),
                original_format,
                rows_migrated: 0,
            })
        }
        FormatVersion::ThreeColumn | FormatVersion::Mixed => {}
        FormatVersion::Unknown => {
            return Err(StorageError::FormatMigration {
                path: path.to_path_buf(),
                reason: format!("cannot migrate format: {original_format}"),
            })
        }
    }

    let text = fs::read_to_string(path).map_err(StorageError::io(path))?;
    let rows = parse_tab_rows(path, &text)?;

    let mut out = String::with_capacity(text.len() + rows.len() * 8);
    for row in &rows {
        out.push_str(&[row.word, row.recognized, row.translation, row.example].join("\t"));
        out.push('\n');
    }

    let output_path = output.map(Path::to_path_buf).unwrap_or_else(|| default_output_path(path));
    write_atomic_bytes(&output_path, out.as_bytes())?;
    tracing::info!(
        source = %path.display(),
        output = %output_path.display(),
        rows = rows.len(),
        "migrated AI response backup to 4 columns"
    );
    Ok(Migration {
        output_path,
        original_format,
        rows_migrated: rows.len(),
    })
}

/// Re-serialize a vocabulary backup through the canonical writer.
///
/// Extra columns are dropped and absent translation/example columns become
/// empty strings. Every row is carried over, duplicates and rows without a
/// word included. Only a missing `word` column or unreadable input fails.
pub fn migrate_vocabulary_backup(path: &Path, output: Option<&Path>) -> Result<Migration> {
    if !path.is_file() {
        return Err(StorageError::BackupNotFound(path.to_path_buf()));
    }
    let original_format = detect(path);
    let rows = read_rows(path, false)?;

    let output_path = output.map(Path::to_path_buf).unwrap_or_else(|| default_output_path(path));
    write_entries(&output_path, &rows)?;
    tracing::info!(
        source = %path.display(),
        output = %output_path.display(),
        rows = rows.len(),
        "normalized vocabulary backup"
    );
    Ok(Migration {
        output_path,
        original_format,
        rows_migrated: rows.len(),
    })
}

/// Convert a headerless tab-separated backup into vocabulary rows, one per
/// line.
///
/// 4-column rows use the recognized spelling as the word, 3-column rows the
/// literal word.
pub fn headerless_to_entries(path: &Path, text: &str) -> Result<Vec<VocabularyEntry>> {
    let rows = parse_tab_rows(path, text)?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let word = if row.recognized.trim().is_empty() {
                row.word
            } else {
                row.recognized
            };
            VocabularyEntry::new(word.trim(), row.translation, row.example)
        })
        .collect())
}
