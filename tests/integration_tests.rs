//! Integration tests for the complete VocabMaster pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - Word entry → enrichment → deck export
//! - Enrichment snapshots → restore → audit
//! - Legacy captures → migration → restore
//!
//! Run with: cargo test --test integration_tests

use std::fs;
use tempfile::tempdir;
use vocabmaster_llm_sync::{
    EnrichOutcome, Enricher, FixedDecider, ReconciliationConfig, ReplayGenerator,
    ResolutionPolicy,
};
use vocabmaster_storage::format::{detect, FormatVersion};
use vocabmaster_storage::migrate::migrate_ai_response;
use vocabmaster_storage::{
    BackupKind, BackupManager, CsvRecordStore, DataLayout, DeckWriter, LanguagePair,
    RestoreEngine, RestoreOutcome,
};

fn spanish_layout(words: &[&str]) -> (tempfile::TempDir, DataLayout, LanguagePair) {
    let dir = tempdir().unwrap();
    let layout = DataLayout::new(dir.path().join("data"));
    let pair = LanguagePair::new("Spanish", "English").unwrap();
    let store = CsvRecordStore::for_pair(&layout, &pair);
    for word in words {
        store.append_word(word).unwrap();
    }
    (dir, layout, pair)
}

// ============================================================================
// Enrichment → deck
// ============================================================================

#[test]
fn test_enrich_then_export_deck() {
    let (_dir, layout, pair) = spanish_layout(&["perro", "gato", "=cmd"]);
    let response = "perro\tperro\tdog\tEl perro ladra.\n\
                    gato\tgato\tcat\tEl gato duerme.\n\
                    '=cmd\t'=cmd\t=SUM(A1)\tNo es una palabra.\n";
    let enricher = Enricher::new(&layout, &pair, ReconciliationConfig::default());

    let outcome = enricher
        .run(&ReplayGenerator::new(response), &mut FixedDecider::no())
        .unwrap();
    let report = match outcome {
        EnrichOutcome::Enriched(report) => report,
        other => panic!("expected an enrichment pass, got {other:?}"),
    };
    assert_eq!(report.merged, 3);
    assert!(report.missing.is_empty());
    assert!(report.raw_capture.is_file());

    let table = enricher.store().load().unwrap();
    let injected = table.get("'=cmd").unwrap();
    assert!(!injected.translation.starts_with('='));

    let summary = DeckWriter::new(&layout).write(&pair).unwrap();
    assert_eq!(summary.cards, 3);
    let deck = fs::read_to_string(&summary.path).unwrap();
    assert!(deck.contains("#deck:Spanish vocabulary"));
    assert!(deck.contains("perro\tdog<br><br>"));

    let kinds: Vec<BackupKind> = BackupManager::for_pair(&layout, &pair)
        .list()
        .unwrap()
        .into_iter()
        .map(|entry| entry.kind)
        .collect();
    assert!(kinds.contains(&BackupKind::AiResponse));
    assert!(kinds.contains(&BackupKind::FlashcardDeck));
    assert_eq!(
        kinds.iter().filter(|k| **k == BackupKind::Vocabulary).count(),
        2
    );
}

#[test]
fn test_second_pass_has_nothing_pending() {
    let (_dir, layout, pair) = spanish_layout(&["casa"]);
    let enricher = Enricher::new(&layout, &pair, ReconciliationConfig::default());
    enricher
        .run(
            &ReplayGenerator::new("casa\tcasa\thouse\tMi casa.\n"),
            &mut FixedDecider::no(),
        )
        .unwrap();

    let again = enricher
        .run(
            &ReplayGenerator::new("casa\tcasa\thome\tOtra casa.\n"),
            &mut FixedDecider::no(),
        )
        .unwrap();
    assert_eq!(again, EnrichOutcome::NothingPending);
    assert_eq!(
        enricher.store().load().unwrap().get("casa").unwrap().translation,
        "house"
    );
}

#[test]
fn test_corrections_follow_policy() {
    let response = "ciudadd\tciudad\tcity\tLa ciudad es grande.\n";

    let (_dir, layout, pair) = spanish_layout(&["ciudadd"]);
    let accept = Enricher::new(
        &layout,
        &pair,
        ReconciliationConfig {
            policy: ResolutionPolicy::AcceptAll,
        },
    );
    accept
        .run(&ReplayGenerator::new(response), &mut FixedDecider::no())
        .unwrap();
    let table = accept.store().load().unwrap();
    assert!(table.contains("ciudad"));
    assert!(!table.contains("ciudadd"));

    let (_dir2, layout2, pair2) = spanish_layout(&["ciudadd"]);
    let skip = Enricher::new(
        &layout2,
        &pair2,
        ReconciliationConfig {
            policy: ResolutionPolicy::SkipAll,
        },
    );
    skip.run(&ReplayGenerator::new(response), &mut FixedDecider::yes())
        .unwrap();
    let table = skip.store().load().unwrap();
    let kept = table.get("ciudadd").unwrap();
    assert!(kept.translation.is_empty());
    assert!(!table.contains("ciudad"));
}

// ============================================================================
// Snapshots → restore
// ============================================================================

#[test]
fn test_restore_pre_enrichment_snapshot() {
    let (_dir, layout, pair) = spanish_layout(&["libro"]);
    let enricher = Enricher::new(&layout, &pair, ReconciliationConfig::default());
    enricher
        .run(
            &ReplayGenerator::new("libro\tlibro\tbook\tLeo un libro.\n"),
            &mut FixedDecider::no(),
        )
        .unwrap();

    let engine = RestoreEngine::for_pair(&layout, &pair);
    let before = engine
        .backups()
        .list_kind(BackupKind::Vocabulary)
        .unwrap()
        .into_iter()
        .next()
        .unwrap();

    let declined = engine.restore(&before.path, &mut FixedDecider::no()).unwrap();
    assert_eq!(declined, RestoreOutcome::Cancelled);
    assert!(enricher.store().load().unwrap().get("libro").unwrap().is_complete());

    let restored = match engine.restore(&before.path, &mut FixedDecider::yes()).unwrap() {
        RestoreOutcome::Restored(restored) => restored,
        RestoreOutcome::Cancelled => panic!("restore was confirmed"),
    };
    assert_eq!(restored.rows, 1);
    let undo = restored.pre_restore_backup.unwrap();
    assert!(undo.is_file());
    assert!(enricher.store().pending_words().unwrap() != vocabmaster_storage::Pending::AllComplete);

    let audit = engine.validate_all().unwrap();
    assert_eq!(audit.invalid, 0);
    assert!(audit.total >= 3);
}

#[test]
fn test_restore_from_migrated_legacy_capture() {
    let (dir, layout, pair) = spanish_layout(&["sol"]);
    let legacy = dir.path().join("gpt_request_2023-05-01T10_00_00.000000.bak");
    fs::write(
        &legacy,
        "sol\tsun\tEl sol brilla.\nluna\tmoon\tLa luna sale.\n",
    )
    .unwrap();
    assert_eq!(detect(&legacy), FormatVersion::ThreeColumn);

    let migration = migrate_ai_response(&legacy, None).unwrap();
    assert_eq!(migration.rows_migrated, 2);
    assert_eq!(detect(&migration.output_path), FormatVersion::FourColumn);

    let engine = RestoreEngine::for_pair(&layout, &pair);
    let outcome = engine
        .restore(&migration.output_path, &mut FixedDecider::yes())
        .unwrap();
    let restored = match outcome {
        RestoreOutcome::Restored(restored) => restored,
        RestoreOutcome::Cancelled => panic!("restore was confirmed"),
    };
    assert_eq!(restored.rows, 2);
    assert_eq!(restored.migrated_from, Some(FormatVersion::FourColumn));

    let table = CsvRecordStore::for_pair(&layout, &pair).load().unwrap();
    assert_eq!(table.get("luna").unwrap().translation, "moon");
}
