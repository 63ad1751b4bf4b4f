//! Restore a vocabulary file from a backup.
//!
//! The engine is a straight line with no retries:
//!
//! ```text
//! validate backup ──► snapshot live file ──► commit ──► report
//!       │                (pre_restore_*)       │
//!       └─ headerless 3/4-column? ─────────────┘ (migrate while committing)
//! ```
//!
//! The pre-restore snapshot is the undo point. Once taken it is never removed,
//! even when the commit fails afterwards.

use crate::atomic::write_atomic_bytes;
use crate::backup::{BackupEntry, BackupKind, BackupManager};
use crate::csv_store::{read_entries, write_entries};
use crate::decision::Decider;
use crate::error::StorageError;
use crate::format::{content_lines, detect, detect_headerless, FormatVersion};
use crate::layout::{DataLayout, LanguagePair};
use crate::migrate::headerless_to_entries;
use crate::VocabularyEntry;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Outcome of checking whether a backup parses as a vocabulary CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupCheck {
    pub valid: bool,
    pub rows: usize,
    pub error: Option<String>,
}

impl BackupCheck {
    fn ok(rows: usize) -> Self {
        Self {
            valid: true,
            rows,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            rows: 0,
            error: Some(error.into()),
        }
    }
}

/// Check that `path` is a readable CSV with the canonical columns.
pub fn validate_backup_parseable(path: &Path) -> BackupCheck {
    if !path.is_file() {
        return BackupCheck::failed("Backup file does not exist");
    }
    match fs::read(path) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {
            return BackupCheck::failed("No header row found")
        }
        Ok(_) => {}
        Err(err) => return BackupCheck::failed(format!("Failed to read backup: {err}")),
    }
    match read_entries(path, true) {
        Ok(entries) => BackupCheck::ok(entries.len()),
        Err(StorageError::MissingColumns { columns, .. }) => {
            BackupCheck::failed(format!("Missing required columns: {}", columns.join(", ")))
        }
        Err(err) => BackupCheck::failed(format!("Failed to parse CSV: {err}")),
    }
}

/// Aggregate result of checking every vocabulary backup of a pair.
#[derive(Debug, Clone, Default)]
pub struct BackupAudit {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub results: Vec<(BackupEntry, BackupCheck)>,
}

// ============================================================================
// Outcomes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStage {
    Validate,
    Snapshot,
    Commit,
}

impl fmt::Display for RestoreStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RestoreStage::Validate => "Backup validation",
            RestoreStage::Snapshot => "Pre-restore snapshot",
            RestoreStage::Commit => "Restore",
        })
    }
}

/// A restore that stopped at `stage`.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct RestoreFailure {
    pub stage: RestoreStage,
    /// Set when the undo snapshot was already written before the failure.
    pub pre_restore_backup: Option<PathBuf>,
    #[source]
    pub source: StorageError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored {
    pub restored_path: PathBuf,
    pub pre_restore_backup: Option<PathBuf>,
    pub rows: usize,
    /// Layout the backup was migrated from, if it was headerless.
    pub migrated_from: Option<FormatVersion>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored(Restored),
    /// The decider declined; nothing on disk changed.
    Cancelled,
}

/// What the commit step will do with a validated backup.
#[derive(Debug, Clone)]
pub enum RestorePlan {
    Verbatim { rows: usize },
    HeaderMigration {
        format: FormatVersion,
        entries: Vec<VocabularyEntry>,
    },
}

// ============================================================================
// Engine
// ============================================================================

pub struct RestoreEngine {
    live_path: PathBuf,
    backups: BackupManager,
}

impl RestoreEngine {
    pub fn new(live_path: impl Into<PathBuf>, backups: BackupManager) -> Self {
        Self {
            live_path: live_path.into(),
            backups,
        }
    }

    pub fn for_pair(layout: &DataLayout, pair: &LanguagePair) -> Self {
        Self::new(
            layout.vocabulary_path(pair),
            BackupManager::for_pair(layout, pair),
        )
    }

    pub fn live_path(&self) -> &Path {
        &self.live_path
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// Step 1: decide whether `backup` can be restored and how.
    pub fn plan(&self, backup: &Path) -> Result<RestorePlan, StorageError> {
        if !backup.is_file() {
            return Err(StorageError::BackupNotFound(backup.to_path_buf()));
        }
        let check = validate_backup_parseable(backup);
        if check.valid {
            return Ok(RestorePlan::Verbatim { rows: check.rows });
        }

        let text = fs::read_to_string(backup).map_err(StorageError::io(backup))?;
        if let Some(format) = detect_headerless(&text) {
            tracing::info!(
                backup = %backup.display(),
                %format,
                "backup has no header; will migrate while restoring"
            );
            let entries = headerless_to_entries(backup, &text)?;
            return Ok(RestorePlan::HeaderMigration { format, entries });
        }

        Err(StorageError::BackupCorrupt {
            path: backup.to_path_buf(),
            reason: check
                .error
                .unwrap_or_else(|| "unrecognized backup layout".to_string()),
        })
    }

    /// Run the full restore of `backup` onto the live vocabulary file.
    pub fn restore(
        &self,
        backup: &Path,
        decider: &mut dyn Decider,
    ) -> Result<RestoreOutcome, RestoreFailure> {
        let fail = |stage, pre_restore_backup, source| RestoreFailure {
            stage,
            pre_restore_backup,
            source,
        };

        let plan = self
            .plan(backup)
            .map_err(|err| fail(RestoreStage::Validate, None, err))?;

        let live_exists = self.live_path.is_file();
        if live_exists {
            let prompt = format!(
                "Replace {} with backup {}?",
                self.live_path.display(),
                backup.display()
            );
            if !decider.confirm(&prompt) {
                tracing::info!(backup = %backup.display(), "restore cancelled");
                return Ok(RestoreOutcome::Cancelled);
            }
        }

        let pre_restore_backup = if live_exists {
            let snapshot = self
                .backups
                .snapshot_pre_restore(&self.live_path)
                .map_err(|err| fail(RestoreStage::Snapshot, None, err))?;
            tracing::info!(snapshot = %snapshot.display(), "live file saved before restore");
            Some(snapshot)
        } else {
            None
        };

        let commit = || -> Result<(usize, Option<FormatVersion>), StorageError> {
            if let Some(parent) = self.live_path.parent() {
                fs::create_dir_all(parent).map_err(StorageError::io(parent))?;
            }
            match &plan {
                RestorePlan::Verbatim { rows } => {
                    let bytes = fs::read(backup).map_err(StorageError::io(backup))?;
                    write_atomic_bytes(&self.live_path, &bytes)?;
                    Ok((*rows, None))
                }
                RestorePlan::HeaderMigration { format, entries } => {
                    write_entries(&self.live_path, entries)?;
                    Ok((entries.len(), Some(*format)))
                }
            }
        };
        let (rows, migrated_from) =
            commit().map_err(|err| fail(RestoreStage::Commit, pre_restore_backup.clone(), err))?;

        tracing::info!(
            backup = %backup.display(),
            live = %self.live_path.display(),
            rows,
            "restore complete"
        );
        Ok(RestoreOutcome::Restored(Restored {
            restored_path: self.live_path.clone(),
            pre_restore_backup,
            rows,
            migrated_from,
        }))
    }

    /// Restore the most recent vocabulary snapshot.
    pub fn restore_latest(
        &self,
        decider: &mut dyn Decider,
    ) -> Result<RestoreOutcome, RestoreFailure> {
        let latest = self
            .backups
            .latest(BackupKind::Vocabulary)
            .and_then(|entry| {
                entry.ok_or_else(|| StorageError::BackupNotFound(self.backups.dir().to_path_buf()))
            })
            .map_err(|source| RestoreFailure {
                stage: RestoreStage::Validate,
                pre_restore_backup: None,
                source,
            })?;
        self.restore(&latest.path, decider)
    }

    /// Restorability of one backup: headered CSV or headerless legacy layout.
    pub fn check(&self, backup: &Path) -> BackupCheck {
        match self.plan(backup) {
            Ok(RestorePlan::Verbatim { rows }) => BackupCheck::ok(rows),
            Ok(RestorePlan::HeaderMigration { entries, .. }) => BackupCheck::ok(entries.len()),
            Err(_) => validate_backup_parseable(backup),
        }
    }

    /// Check every backup of the pair. Vocabulary and pre-restore snapshots
    /// must be restorable, AI captures must have a known tab layout, and deck
    /// snapshots are only counted.
    pub fn validate_all(&self) -> Result<BackupAudit, StorageError> {
        let mut audit = BackupAudit::default();
        for entry in self.backups.list()? {
            let check = match entry.kind {
                BackupKind::Vocabulary | BackupKind::PreRestore => self.check(&entry.path),
                BackupKind::AiResponse => check_ai_response(&entry.path),
                BackupKind::FlashcardDeck => check_deck(&entry.path),
            };
            audit.total += 1;
            if check.valid {
                audit.valid += 1;
            } else {
                audit.invalid += 1;
            }
            audit.results.push((entry, check));
        }
        Ok(audit)
    }
}

fn check_ai_response(path: &Path) -> BackupCheck {
    match detect(path) {
        FormatVersion::Unknown => BackupCheck::failed("Unknown format"),
        FormatVersion::ThreeColumn | FormatVersion::FourColumn | FormatVersion::Mixed => {
            match fs::read_to_string(path) {
                Ok(text) => BackupCheck::ok(content_lines(&text).count()),
                Err(err) => BackupCheck::failed(format!("Failed to read backup: {err}")),
            }
        }
    }
}

/// Card lines of an exported deck; `#` directives are not cards.
fn check_deck(path: &Path) -> BackupCheck {
    match fs::read_to_string(path) {
        Ok(text) => BackupCheck::ok(
            content_lines(&text)
                .filter(|(_, line)| !line.starts_with('#'))
                .count(),
        ),
        Err(err) => BackupCheck::failed(format!("Failed to read backup: {err}")),
    }
}
