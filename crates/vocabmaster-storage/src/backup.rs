//! Timestamped backup snapshots with per-stem retention.
//!
//! Snapshot names embed a local timestamp with `:` replaced by `_` so they
//! stay valid on every filesystem:
//!
//! ```text
//! vocab_list_english-french_2024-01-15T14_30_45.123456.bak   file snapshot
//! gpt_request_2024-01-15T14_30_46.000012.bak                 raw AI capture
//! pre_restore_2024-01-15T15_02_10.551200.bak                 undo point
//! ```

use crate::error::{Result, StorageError};
use crate::layout::{DataLayout, LanguagePair, DECK_PREFIX, VOCABULARY_PREFIX};
use chrono::{Local, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Snapshots kept per file stem.
pub const FILE_RETENTION: usize = 10;
/// Raw text captures kept.
pub const RAW_CAPTURE_RETENTION: usize = 15;

pub const BACKUP_EXTENSION: &str = "bak";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackupKind {
    Vocabulary,
    AiResponse,
    FlashcardDeck,
    PreRestore,
}

impl BackupKind {
    pub const ALL: [BackupKind; 4] = [
        BackupKind::Vocabulary,
        BackupKind::AiResponse,
        BackupKind::FlashcardDeck,
        BackupKind::PreRestore,
    ];

    /// Filename prefix that identifies this kind.
    pub fn prefix(self) -> &'static str {
        match self {
            BackupKind::Vocabulary => VOCABULARY_PREFIX,
            BackupKind::AiResponse => "gpt_request_",
            BackupKind::FlashcardDeck => DECK_PREFIX,
            BackupKind::PreRestore => "pre_restore_",
        }
    }

    pub fn retention(self) -> usize {
        match self {
            BackupKind::AiResponse => RAW_CAPTURE_RETENTION,
            _ => FILE_RETENTION,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BackupKind::Vocabulary => "vocabulary",
            BackupKind::AiResponse => "ai-response",
            BackupKind::FlashcardDeck => "flashcard-deck",
            BackupKind::PreRestore => "pre-restore",
        }
    }

    pub fn classify(filename: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| filename.starts_with(kind.prefix()))
    }
}

impl std::fmt::Display for BackupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A backup file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub filename: String,
    /// Embedded timestamp, still in underscored form.
    pub timestamp: Option<String>,
    pub kind: BackupKind,
    pub size: u64,
    pub modified: SystemTime,
}

// ============================================================================
// Timestamps
// ============================================================================

/// Current local time in snapshot-filename form.
pub fn backup_timestamp() -> String {
    Local::now()
        .format(TIMESTAMP_FORMAT)
        .to_string()
        .replace(':', "_")
}

fn parse_backup_timestamp(ts: &str) -> Option<NaiveDateTime> {
    let iso = ts.replace('_', ":");
    NaiveDateTime::parse_from_str(&iso, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// Render `2024-01-15T14_30_45.123456` as `2024-01-15 14:30:45`.
/// Anything unparsable comes back unchanged.
pub fn format_backup_timestamp(ts: &str) -> String {
    match parse_backup_timestamp(ts) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

/// Split `{stem}_{timestamp}.bak` into its stem and timestamp.
fn split_snapshot_name(filename: &str) -> Option<(&str, &str)> {
    let body = filename.strip_suffix(".bak")?;
    body.match_indices('_').find_map(|(idx, _)| {
        let ts = &body[idx + 1..];
        parse_backup_timestamp(ts).map(|_| (&body[..idx], ts))
    })
}

// ============================================================================
// Backup manager
// ============================================================================

/// Creates, prunes, and lists the snapshots in one backup directory.
#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
}

impl BackupManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn for_pair(layout: &DataLayout, pair: &LanguagePair) -> Self {
        Self::new(layout.backup_dir(pair))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `source` to `{stem}_{timestamp}.bak` and prune that stem.
    pub fn snapshot(&self, source: &Path) -> Result<PathBuf> {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| StorageError::BackupNotFound(source.to_path_buf()))?;
        let retention = BackupKind::classify(&stem)
            .map(BackupKind::retention)
            .unwrap_or(FILE_RETENTION);
        self.copy_into(source, &stem, retention)
    }

    /// Copy the live file to `pre_restore_{timestamp}.bak`.
    pub fn snapshot_pre_restore(&self, source: &Path) -> Result<PathBuf> {
        self.copy_into(source, "pre_restore", FILE_RETENTION)
    }

    /// Store raw text (an AI response) as `{kind}_{timestamp}.bak`.
    pub fn snapshot_raw(&self, kind: BackupKind, content: &str) -> Result<PathBuf> {
        let stem = kind.prefix().trim_end_matches('_');
        let target = self.reserve(stem)?;
        fs::write(&target, content).map_err(StorageError::io(&target))?;
        tracing::debug!(path = %target.display(), %kind, "raw capture stored");
        self.prune(stem, kind.retention())?;
        Ok(target)
    }

    fn copy_into(&self, source: &Path, stem: &str, retention: usize) -> Result<PathBuf> {
        if !source.is_file() {
            return Err(StorageError::BackupNotFound(source.to_path_buf()));
        }
        let target = self.reserve(stem)?;
        fs::copy(source, &target).map_err(StorageError::io(&target))?;
        tracing::debug!(
            source = %source.display(),
            backup = %target.display(),
            "snapshot created"
        );
        self.prune(stem, retention)?;
        Ok(target)
    }

    /// Pick an unused `{stem}_{timestamp}.bak` path, creating the directory.
    fn reserve(&self, stem: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(StorageError::io(&self.dir))?;
        loop {
            let candidate = self
                .dir
                .join(format!("{stem}_{}.{BACKUP_EXTENSION}", backup_timestamp()));
            if !candidate.exists() {
                return Ok(candidate);
            }
            std::thread::sleep(Duration::from_micros(1));
        }
    }

    /// Snapshots of `stem`, oldest first.
    fn snapshots_of(&self, stem: &str) -> Result<Vec<(SystemTime, String, PathBuf)>> {
        let mut found = Vec::new();
        for dirent in fs::read_dir(&self.dir).map_err(StorageError::io(&self.dir))? {
            let dirent = dirent.map_err(StorageError::io(&self.dir))?;
            let filename = dirent.file_name().to_string_lossy().into_owned();
            match split_snapshot_name(&filename) {
                Some((s, _)) if s == stem => {}
                _ => continue,
            }
            let modified = dirent
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((modified, filename, dirent.path()));
        }
        found.sort();
        Ok(found)
    }

    /// Delete the oldest snapshots of `stem` until at most `keep` remain.
    pub fn prune(&self, stem: &str, keep: usize) -> Result<usize> {
        let snapshots = self.snapshots_of(stem)?;
        let excess = snapshots.len().saturating_sub(keep);
        for (_, _, path) in snapshots.into_iter().take(excess) {
            fs::remove_file(&path).map_err(StorageError::io(&path))?;
            tracing::debug!(path = %path.display(), "pruned old backup");
        }
        Ok(excess)
    }

    /// Every recognized backup, oldest first.
    pub fn list(&self) -> Result<Vec<BackupEntry>> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StorageError::io(&self.dir)(err)),
        };

        let mut entries = Vec::new();
        for dirent in read_dir {
            let dirent = dirent.map_err(StorageError::io(&self.dir))?;
            let path = dirent.path();
            if path.extension().and_then(|e| e.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            let filename = dirent.file_name().to_string_lossy().into_owned();
            let Some(kind) = BackupKind::classify(&filename) else {
                tracing::debug!(file = %filename, "ignoring unrecognized backup file");
                continue;
            };
            let meta = dirent.metadata().map_err(StorageError::io(&path))?;
            entries.push(BackupEntry {
                timestamp: split_snapshot_name(&filename).map(|(_, ts)| ts.to_string()),
                path,
                filename,
                kind,
                size: meta.len(),
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }
        entries.sort_by(|a, b| {
            a.modified
                .cmp(&b.modified)
                .then_with(|| a.filename.cmp(&b.filename))
        });
        Ok(entries)
    }

    pub fn list_kind(&self, kind: BackupKind) -> Result<Vec<BackupEntry>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|entry| entry.kind == kind)
            .collect())
    }

    /// Most recently modified backup of `kind`.
    pub fn latest(&self, kind: BackupKind) -> Result<Option<BackupEntry>> {
        Ok(self.list_kind(kind)?.pop())
    }
}
