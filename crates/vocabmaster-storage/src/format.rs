//! Structural classification of backup files.
//!
//! Only shape is inspected (delimiters, column counts, header names), never
//! the words themselves.

use crate::csv_store::HEADER;
use std::fmt;
use std::fs::{self, File};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatVersion {
    /// `word, translation, example`
    ThreeColumn,
    /// `original_word, recognized_word, translation, example`
    FourColumn,
    /// Lines disagree on their column count.
    Mixed,
    Unknown,
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FormatVersion::ThreeColumn => "3-col",
            FormatVersion::FourColumn => "4-col",
            FormatVersion::Mixed => "mixed",
            FormatVersion::Unknown => "unknown",
        })
    }
}

/// Raw AI captures are named `gpt_request_*`.
pub fn is_ai_response_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("gpt_request"))
}

/// Classify the file at `path`.
pub fn detect(path: &Path) -> FormatVersion {
    if is_ai_response_file(path) {
        match fs::read_to_string(path) {
            Ok(text) => detect_tab_columns(&text),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "unreadable backup");
                FormatVersion::Unknown
            }
        }
    } else {
        detect_csv_header(path)
    }
}

/// Non-blank lines of `text`, with any trailing `\r` removed.
pub(crate) fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty())
}

/// Classify tab-separated, headerless text by its column counts.
pub fn detect_tab_columns(text: &str) -> FormatVersion {
    let mut counts = content_lines(text).map(|(_, line)| line.split('\t').count());
    let Some(first) = counts.next() else {
        return FormatVersion::Unknown;
    };
    if counts.any(|count| count != first) {
        return FormatVersion::Mixed;
    }
    match first {
        3 => FormatVersion::ThreeColumn,
        4 => FormatVersion::FourColumn,
        _ => FormatVersion::Unknown,
    }
}

/// Classify a CSV file by its header row.
pub fn detect_csv_header(path: &Path) -> FormatVersion {
    let Ok(file) = File::open(path) else {
        return FormatVersion::Unknown;
    };
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let Ok(headers) = reader.headers() else {
        return FormatVersion::Unknown;
    };
    let names: Vec<String> = headers.iter().map(|h| h.trim().to_ascii_lowercase()).collect();

    if names.len() == HEADER.len() && HEADER.iter().all(|h| names.iter().any(|n| n == h)) {
        FormatVersion::ThreeColumn
    } else if names.len() >= 4 {
        FormatVersion::FourColumn
    } else {
        FormatVersion::Unknown
    }
}

/// Recognize a headerless legacy layout: every non-blank line has exactly 3
/// or exactly 4 tab-separated fields and the first line is not a header.
///
/// Returns the detected version (`Mixed` when both widths occur).
pub fn detect_headerless(text: &str) -> Option<FormatVersion> {
    let mut lines = content_lines(text).peekable();
    let (_, first) = lines.peek()?;
    let first_fields: Vec<&str> = first.split('\t').map(str::trim).collect();
    if first_fields.first().is_some_and(|f| f.eq_ignore_ascii_case("word")) {
        return None;
    }
    if lines.all(|(_, line)| matches!(line.split('\t').count(), 3 | 4)) {
        Some(detect_tab_columns(text))
    } else {
        None
    }
}
