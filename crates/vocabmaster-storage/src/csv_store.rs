//! The canonical `word,translation,example` vocabulary file.

use crate::atomic::write_atomic_bytes;
use crate::error::{Result, StorageError};
use crate::layout::{DataLayout, LanguagePair};
use crate::sanitize::sanitize_cell;
use crate::validate::validate_records;
use crate::{VocabularyEntry, VocabularyTable};
use serde::Serialize;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

pub const HEADER: [&str; 3] = ["word", "translation", "example"];
pub const HEADER_LINE: &str = "word,translation,example";

/// Result of asking which words still need content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    Words(Vec<String>),
    /// Every word has a translation and an example; nothing to do.
    AllComplete,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VocabularyStats {
    pub total: usize,
    pub translated: usize,
    pub pending: usize,
}

/// Reads and writes one vocabulary CSV.
#[derive(Debug, Clone)]
pub struct CsvRecordStore {
    path: PathBuf,
}

impl CsvRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_pair(layout: &DataLayout, pair: &LanguagePair) -> Self {
        Self::new(layout.vocabulary_path(pair))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Make sure the file starts with the canonical header, creating the file
    /// if needed. Returns whether anything was written.
    pub fn ensure_header(&self) -> Result<bool> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent).map_err(StorageError::io(parent))?;
                }
                Vec::new()
            }
            Err(err) => return Err(StorageError::io(&self.path)(err)),
        };

        if starts_with_header(&content) {
            return Ok(false);
        }

        let mut out = Vec::with_capacity(HEADER_LINE.len() + 1 + content.len());
        out.extend_from_slice(HEADER_LINE.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(&content);
        write_atomic_bytes(&self.path, &out)?;
        tracing::info!(path = %self.path.display(), "inserted missing CSV header");
        Ok(true)
    }

    /// True when no row after the header carries a non-blank field.
    pub fn is_empty(&self) -> Result<bool> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(err) => return Err(StorageError::io(&self.path)(err)),
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        for (idx, record) in reader.records().enumerate() {
            let record = record.map_err(StorageError::csv(&self.path))?;
            if idx == 0 && is_header_record(&record) {
                continue;
            }
            if record.iter().any(|field| !field.trim().is_empty()) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn load(&self) -> Result<VocabularyTable> {
        read_table(&self.path)
    }

    /// Validate `table` and atomically replace the file with it.
    pub fn save(&self, table: &VocabularyTable) -> Result<usize> {
        let count = validate_records(table.entries())?;
        write_table(&self.path, table)?;
        tracing::debug!(path = %self.path.display(), count, "vocabulary saved");
        Ok(count)
    }

    pub fn pending_words(&self) -> Result<Pending> {
        let words = self.load()?.pending_words();
        if words.is_empty() {
            Ok(Pending::AllComplete)
        } else {
            Ok(Pending::Words(words))
        }
    }

    pub fn stats(&self) -> Result<VocabularyStats> {
        let table = self.load()?;
        let mut stats = VocabularyStats::default();
        for entry in table.iter().filter(|e| !e.word.trim().is_empty()) {
            stats.total += 1;
            if entry.is_complete() {
                stats.translated += 1;
            }
        }
        stats.pending = stats.total - stats.translated;
        Ok(stats)
    }

    /// Append `word` with blank translation and example.
    ///
    /// Returns the value actually stored, which differs from the input when
    /// sanitization escaped it.
    pub fn append_word(&self, word: &str) -> Result<String> {
        let stored = sanitize_cell(word.trim());
        if stored.is_empty() {
            return Err(StorageError::Validation("Cannot add an empty word".to_string()));
        }
        self.ensure_header()?;

        let mut content = fs::read(&self.path).map_err(StorageError::io(&self.path))?;
        if !content.is_empty() && !content.ends_with(b"\n") {
            content.push(b'\n');
        }

        // Follow the file's own column order.
        let headers = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_slice())
            .headers()
            .map_err(StorageError::csv(&self.path))?
            .clone();
        let mut row = vec![""; headers.len().max(HEADER.len())];
        let word_column = ColumnMap::from_headers(&headers).word.unwrap_or(0);
        row[word_column] = stored.as_str();

        let mut writer = csv_writer(Vec::new());
        writer
            .write_record(&row)
            .map_err(StorageError::csv(&self.path))?;
        let row = writer
            .into_inner()
            .map_err(|err| StorageError::io(&self.path)(err.into_error()))?;
        content.extend_from_slice(&row);

        write_atomic_bytes(&self.path, &content)?;
        tracing::debug!(path = %self.path.display(), word = %stored, "word appended");
        Ok(stored)
    }

    /// Exact, case-sensitive lookup. A missing file holds no words.
    pub fn word_exists(&self, word: &str) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        Ok(self.load()?.contains(word))
    }
}

// ============================================================================
// Reading / writing helpers
// ============================================================================

fn csv_writer<W: io::Write>(inner: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(inner)
}

fn normalize_header(field: &str) -> String {
    field
        .trim_start_matches('\u{feff}')
        .trim()
        .trim_matches('"')
        .to_ascii_lowercase()
}

/// A header names all three canonical columns, in any order.
fn is_header_record(record: &csv::StringRecord) -> bool {
    ColumnMap::from_headers(record).missing().is_empty()
}

fn starts_with_header(content: &[u8]) -> bool {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content);
    let mut first = csv::ByteRecord::new();
    match reader.read_byte_record(&mut first) {
        Ok(true) => is_header_record(&csv::StringRecord::from_byte_record_lossy(first)),
        _ => false,
    }
}

/// Column positions of the canonical fields in a parsed header.
pub(crate) struct ColumnMap {
    pub word: Option<usize>,
    pub translation: Option<usize>,
    pub example: Option<usize>,
}

impl ColumnMap {
    pub(crate) fn from_headers(headers: &csv::StringRecord) -> Self {
        let position = |name: &str| headers.iter().position(|h| normalize_header(h) == name);
        ColumnMap {
            word: position("word"),
            translation: position("translation"),
            example: position("example"),
        }
    }

    pub(crate) fn missing(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.word.is_none() {
            missing.push("word".to_string());
        }
        if self.translation.is_none() {
            missing.push("translation".to_string());
        }
        if self.example.is_none() {
            missing.push("example".to_string());
        }
        missing
    }

    pub(crate) fn entry(&self, record: &csv::StringRecord) -> VocabularyEntry {
        let field = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .unwrap_or_default()
                .to_string()
        };
        VocabularyEntry {
            word: field(self.word),
            translation: field(self.translation),
            example: field(self.example),
        }
    }
}

/// Every row of a headered CSV, including rows without a word. With
/// `strict`, all three canonical columns must be present; otherwise only
/// `word` is required.
pub(crate) fn read_rows(path: &Path, strict: bool) -> Result<Vec<VocabularyEntry>> {
    let file = File::open(path).map_err(StorageError::io(path))?;
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let headers = reader.headers().map_err(StorageError::csv(path))?.clone();
    let columns = ColumnMap::from_headers(&headers);

    let missing = columns.missing();
    let fatal = if strict {
        !missing.is_empty()
    } else {
        columns.word.is_none()
    };
    if fatal {
        return Err(StorageError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        });
    }

    reader
        .records()
        .map(|record| {
            record
                .map(|record| columns.entry(&record))
                .map_err(StorageError::csv(path))
        })
        .collect()
}

/// Rows of a headered CSV that carry a word.
pub(crate) fn read_entries(path: &Path, strict: bool) -> Result<Vec<VocabularyEntry>> {
    let mut entries = read_rows(path, strict)?;
    entries.retain(|entry| {
        if !entry.word.trim().is_empty() {
            return true;
        }
        if !entry.is_blank() {
            tracing::warn!(path = %path.display(), "skipping row with content but no word");
        }
        false
    });
    Ok(entries)
}

/// Load the vocabulary table at `path`.
pub fn read_table(path: &Path) -> Result<VocabularyTable> {
    let entries = read_entries(path, true)?;
    let rows = entries.len();
    let table: VocabularyTable = entries.into_iter().collect();
    if table.len() != rows {
        tracing::warn!(
            path = %path.display(),
            duplicates = rows - table.len(),
            "merged duplicate words while loading"
        );
    }
    Ok(table)
}

/// Serialize `table` with the canonical header.
pub fn serialize_table(table: &VocabularyTable) -> Result<Vec<u8>, csv::Error> {
    serialize_entries(table.iter())
}

/// Serialize rows as given, duplicates and all, under the canonical header.
pub fn serialize_entries<'a>(
    entries: impl IntoIterator<Item = &'a VocabularyEntry>,
) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv_writer(Vec::new());
    writer.write_record(HEADER)?;
    for entry in entries {
        writer.write_record([&entry.word, &entry.translation, &entry.example])?;
    }
    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}

/// Atomically write `table` to `path` without validation.
pub fn write_table(path: &Path, table: &VocabularyTable) -> Result<()> {
    write_entries(path, table.iter())
}

/// Atomically write `entries` to `path`, one CSV row each.
pub fn write_entries<'a>(
    path: &Path,
    entries: impl IntoIterator<Item = &'a VocabularyEntry>,
) -> Result<()> {
    let bytes = serialize_entries(entries).map_err(StorageError::csv(path))?;
    write_atomic_bytes(path, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_with(content: &str) -> (CsvRecordStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vocab_list_english-french.csv");
        fs::write(&path, content).unwrap();
        (CsvRecordStore::new(path), dir)
    }

    #[test]
    fn test_ensure_header_on_empty_file() {
        let (store, _dir) = store_with("");
        assert!(store.ensure_header().unwrap());
        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "word,translation,example\n"
        );
    }

    #[test]
    fn test_ensure_header_prepends_to_headerless_rows() {
        let (store, _dir) = store_with("hello,bonjour,Hello!\n");
        store.ensure_header().unwrap();
        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "word,translation,example\nhello,bonjour,Hello!\n"
        );
    }

    #[test]
    fn test_ensure_header_is_idempotent() {
        let (store, _dir) = store_with("apple\n");
        store.ensure_header().unwrap();
        let first = fs::read(store.path()).unwrap();
        assert!(!store.ensure_header().unwrap());
        assert_eq!(fs::read(store.path()).unwrap(), first);
    }

    #[test]
    fn test_ensure_header_accepts_reordered_columns() {
        let (store, _dir) = store_with("translation,Word,example,notes\nbonjour,hello,Hi,x\n");
        let before = fs::read(store.path()).unwrap();

        assert!(!store.ensure_header().unwrap());
        assert_eq!(fs::read(store.path()).unwrap(), before);
        assert!(!store.is_empty().unwrap());

        let table = store.load().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.get("hello").unwrap(),
            &VocabularyEntry::new("hello", "bonjour", "Hi")
        );
    }

    #[test]
    fn test_ensure_header_on_quoted_header() {
        let (store, _dir) = store_with("\"word\",\"translation\",\"example\"\nhello,,\n");
        assert!(!store.ensure_header().unwrap());
    }

    #[test]
    fn test_ensure_header_creates_missing_file() {
        let dir = tempdir().unwrap();
        let store = CsvRecordStore::new(dir.path().join("nested").join("vocab.csv"));
        assert!(store.ensure_header().unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_is_empty_variants() {
        let (store, _dir) = store_with("word,translation,example\n");
        assert!(store.is_empty().unwrap());

        let (store, _dir) = store_with("word,translation,example\n  ,\t, \n,,\n");
        assert!(store.is_empty().unwrap());

        let (store, _dir) = store_with("word,translation,example\nhello,,\n");
        assert!(!store.is_empty().unwrap());

        let (store, _dir) = store_with("");
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_pending_words_and_all_complete() {
        let (store, _dir) = store_with(
            "word,translation,example\nhello,bonjour,Hello!\nworld,,\ncat,chat,\n",
        );
        assert_eq!(
            store.pending_words().unwrap(),
            Pending::Words(vec!["world".to_string(), "cat".to_string()])
        );

        let (store, _dir) = store_with("word,translation,example\nhello,bonjour,Hello!\n");
        assert_eq!(store.pending_words().unwrap(), Pending::AllComplete);
    }

    #[test]
    fn test_stats() {
        let (store, _dir) = store_with(
            "word,translation,example\nhello,bonjour,Hello!\nworld,monde,The world\ncat,,\n",
        );
        assert_eq!(
            store.stats().unwrap(),
            VocabularyStats {
                total: 3,
                translated: 2,
                pending: 1
            }
        );
    }

    #[test]
    fn test_append_word_sanitizes() {
        let (store, _dir) = store_with("word,translation,example\n");
        assert_eq!(store.append_word("=HYPERLINK(\"x\")").unwrap(), "'=HYPERLINK(\"x\")");
        assert_eq!(store.append_word("hello").unwrap(), "hello");

        assert!(store.word_exists("hello").unwrap());
        assert!(store.word_exists("'=HYPERLINK(\"x\")").unwrap());
        assert!(!store.word_exists("=HYPERLINK(\"x\")").unwrap());
    }

    #[test]
    fn test_append_word_without_trailing_newline() {
        let (store, _dir) = store_with("word,translation,example\nhello,bonjour,Hi");
        store.append_word("world").unwrap();
        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "word,translation,example\nhello,bonjour,Hi\nworld,,\n"
        );
    }

    #[test]
    fn test_word_exists_is_exact() {
        let (store, _dir) = store_with("word,translation,example\nHello,,\n");
        assert!(store.word_exists("Hello").unwrap());
        assert!(!store.word_exists("hello").unwrap());
        assert!(!store.word_exists("Hell").unwrap());
    }

    #[test]
    fn test_save_rejects_empty_table_and_keeps_file() {
        let (store, _dir) = store_with("word,translation,example\nhello,,\n");
        let before = fs::read(store.path()).unwrap();
        assert!(store.save(&VocabularyTable::new()).is_err());
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_save_preserves_order_and_quotes() {
        let (store, _dir) = store_with("word,translation,example\n");
        let table: VocabularyTable = vec![
            VocabularyEntry::new("zebra", "zèbre", "A zebra, striped."),
            VocabularyEntry::new("apple", "pomme", "Say \"apple\"."),
        ]
        .into_iter()
        .collect();

        store.save(&table).unwrap();
        let reloaded = store.load().unwrap();
        assert_eq!(reloaded, table);
        assert!(fs::read_to_string(store.path())
            .unwrap()
            .contains("\"A zebra, striped.\""));
    }

    #[test]
    fn test_read_rows_keeps_duplicates_and_wordless_rows() {
        let (store, _dir) =
            store_with("word,translation,example\nhello,bonjour,Hi\nhello,salut,Hey\n,orphan,row\n");
        let rows = read_rows(store.path(), true).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(read_entries(store.path(), true).unwrap().len(), 2);
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_load_requires_columns() {
        let (store, _dir) = store_with("word,translation\nhello,bonjour\n");
        match store.load() {
            Err(StorageError::MissingColumns { columns, .. }) => {
                assert_eq!(columns, vec!["example".to_string()])
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }
}
