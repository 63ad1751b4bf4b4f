//! Enricher: fills pending vocabulary rows with generated content.
//!
//! One pass, strictly sequential:
//! 1. Ensure the header and collect pending words
//! 2. Snapshot the vocabulary file
//! 3. Generate, and capture the raw response as a backup
//! 4. Classify spelling mismatches and resolve them
//! 5. Merge, validate, atomically write, snapshot again

use crate::llm::{GenerationError, TextGenerator};
use crate::reconciliation::{
    classify, merge_generated, MismatchReconciler, ReconciliationConfig,
};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use vocabmaster_storage::{
    BackupKind, BackupManager, CsvRecordStore, DataLayout, Decider, LanguagePair, Pending,
    StorageError,
};

// ============================================================================
// Sync Events for Observability
// ============================================================================

/// Progress events emitted during a pass
#[derive(Debug, Clone, Serialize)]
pub enum SyncEvent {
    /// Words sent to the generator
    Requested { count: usize },
    /// Raw response stored
    ResponseCaptured { path: PathBuf, rejected_lines: usize },
    /// Classification finished
    Classified { mismatches: usize, missing: usize },
    /// Vocabulary written
    Written { merged: usize, path: PathBuf },
}

pub type SyncEventHandler = Box<dyn Fn(&SyncEvent)>;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichReport {
    pub requested: Vec<String>,
    pub merged: usize,
    pub renamed: Vec<(String, String)>,
    pub declined: Vec<String>,
    pub missing: Vec<String>,
    pub rejected_lines: Vec<String>,
    pub raw_capture: PathBuf,
    pub snapshot: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// Every word already has content.
    NothingPending,
    Enriched(EnrichReport),
}

// ============================================================================
// Enricher
// ============================================================================

pub struct Enricher {
    store: CsvRecordStore,
    backups: BackupManager,
    pair: LanguagePair,
    config: ReconciliationConfig,
    handlers: Vec<SyncEventHandler>,
}

impl Enricher {
    pub fn new(layout: &DataLayout, pair: &LanguagePair, config: ReconciliationConfig) -> Self {
        Self {
            store: CsvRecordStore::for_pair(layout, pair),
            backups: BackupManager::for_pair(layout, pair),
            pair: pair.clone(),
            config,
            handlers: Vec::new(),
        }
    }

    pub fn on_event(&mut self, handler: SyncEventHandler) {
        self.handlers.push(handler);
    }

    fn emit(&self, event: SyncEvent) {
        for handler in &self.handlers {
            handler(&event);
        }
    }

    pub fn store(&self) -> &CsvRecordStore {
        &self.store
    }

    /// Run one enrichment pass.
    pub fn run(
        &self,
        generator: &dyn TextGenerator,
        decider: &mut dyn Decider,
    ) -> Result<EnrichOutcome, SyncError> {
        self.store.ensure_header()?;
        let words = match self.store.pending_words()? {
            Pending::AllComplete => {
                tracing::info!(path = %self.store.path().display(), "all words complete");
                return Ok(EnrichOutcome::NothingPending);
            }
            Pending::Words(words) => words,
        };

        self.backups.snapshot(self.store.path())?;
        self.emit(SyncEvent::Requested { count: words.len() });

        let generation = generator.generate(&self.pair, &words)?;
        let raw_capture = self
            .backups
            .snapshot_raw(BackupKind::AiResponse, &generation.raw)?;
        self.emit(SyncEvent::ResponseCaptured {
            path: raw_capture.clone(),
            rejected_lines: generation.rejected.len(),
        });

        let report = classify(&words, &generation.records);
        self.emit(SyncEvent::Classified {
            mismatches: report.mismatches.len(),
            missing: report.missing.len(),
        });

        let mut table = self.store.load()?;
        let resolution = MismatchReconciler::new(self.config, decider).resolve(
            &mut table,
            &report,
            &generation.records,
        );
        let merged = merge_generated(&mut table, &generation.records, &resolution.skip_merge);
        let renamed = resolution.renamed();

        self.store.save(&table)?;
        let snapshot = self.backups.snapshot(self.store.path())?;
        self.emit(SyncEvent::Written {
            merged: merged + renamed.len(),
            path: self.store.path().to_path_buf(),
        });

        tracing::info!(
            requested = words.len(),
            merged,
            renamed = renamed.len(),
            missing = report.missing.len(),
            "enrichment pass complete"
        );
        Ok(EnrichOutcome::Enriched(EnrichReport {
            requested: words,
            merged,
            declined: resolution.declined(),
            renamed,
            missing: report.missing,
            rejected_lines: generation.rejected,
            raw_capture,
            snapshot,
        }))
    }
}
