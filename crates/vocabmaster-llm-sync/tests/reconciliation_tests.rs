//! Tests for spelling reconciliation

use std::collections::HashSet;
use vocabmaster_llm_sync::reconciliation::*;
use vocabmaster_llm_sync::*;

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn record(recognized: Option<&str>, translation: &str, example: &str) -> GeneratedRecord {
    GeneratedRecord {
        recognized_word: recognized.map(str::to_string),
        translation: translation.to_string(),
        example: example.to_string(),
    }
}

fn pending_table(list: &[&str]) -> VocabularyTable {
    list.iter().map(|w| VocabularyEntry::pending(*w)).collect()
}

/// Decider that replays scripted answers and records the prompts it saw
#[derive(Default)]
struct ScriptedDecider {
    confirms: Vec<bool>,
    choices: Vec<Option<usize>>,
    prompts: Vec<String>,
    options_seen: Vec<Vec<String>>,
}

impl Decider for ScriptedDecider {
    fn confirm(&mut self, prompt: &str) -> bool {
        self.prompts.push(prompt.to_string());
        if self.confirms.is_empty() {
            false
        } else {
            self.confirms.remove(0)
        }
    }

    fn choose(&mut self, prompt: &str, options: &[String]) -> Option<usize> {
        self.prompts.push(prompt.to_string());
        self.options_seen.push(options.to_vec());
        if self.choices.is_empty() {
            None
        } else {
            self.choices.remove(0)
        }
    }
}

// ============================================================================
// Classification Tests
// ============================================================================

#[test]
fn test_single_correction_is_one_mismatch() {
    let response: GeneratedRecords = vec![
        (
            "brethen".to_string(),
            record(Some("brethren"), "frères", "The brethren met."),
        ),
        ("hello".to_string(), record(Some("hello"), "bonjour", "Hello!")),
    ]
    .into_iter()
    .collect();

    let report = classify(&words(&["brethen", "hello"]), &response);
    assert_eq!(report.mismatches.len(), 1);
    assert_eq!(report.mismatches[0].original, "brethen");
    assert_eq!(report.mismatches[0].candidates[0].word, "brethren");
    assert!(report.missing.is_empty());
}

#[test]
fn test_empty_response_reports_everything_missing() {
    let report = classify(&words(&["brethen", "hello"]), &GeneratedRecords::new());
    assert!(report.mismatches.is_empty());
    assert_eq!(report.missing, words(&["brethen", "hello"]));
}

#[test]
fn test_blank_recognized_word_is_missing() {
    let response: GeneratedRecords =
        vec![("hello".to_string(), record(Some("   "), "bonjour", "Hi"))]
            .into_iter()
            .collect();
    let report = classify(&words(&["hello"]), &response);
    assert_eq!(report.missing, words(&["hello"]));
    assert!(report.mismatches.is_empty());
}

#[test]
fn test_case_only_difference_is_mismatch() {
    let response: GeneratedRecords =
        vec![("paris".to_string(), record(Some("Paris"), "Paris", "I love Paris."))]
            .into_iter()
            .collect();
    let report = classify(&words(&["paris"]), &response);
    assert_eq!(report.mismatches.len(), 1);
    assert_eq!(report.mismatches[0].candidates[0].word, "Paris");
}

#[test]
fn test_legacy_extra_key_is_single_candidate() {
    // 3-column responses echo the corrected word as the key
    let response = parse_response("brethren\tfrères\tThe brethren met.\nhello\tbonjour\tHi\n").records;
    let report = classify(&words(&["brethen", "hello"]), &response);

    assert_eq!(report.mismatches.len(), 1);
    let mismatch = &report.mismatches[0];
    assert!(!mismatch.is_ambiguous());
    assert_eq!(mismatch.candidates[0].word, "brethren");
    assert_eq!(mismatch.candidates[0].response_key, "brethren");
}

#[test]
fn test_requested_keys_are_not_candidates() {
    let response = parse_response(
        "recieve\trecevoir\tI receive.\nbrethren\tfrères\tBrethren.\n",
    )
    .records;
    let report = classify(&words(&["brethen", "recieve", "acheive"]), &response);

    // "recieve" was answered under its own key, so only "brethren" is spare
    assert_eq!(report.mismatches.len(), 2);
    for mismatch in &report.mismatches {
        assert!(!mismatch.is_ambiguous());
        assert_eq!(mismatch.candidates[0].word, "brethren");
    }
}

#[test]
fn test_ambiguous_candidates_sorted_by_distance() {
    let response = parse_response("achieve\taccomplir\tx\nbrethren\tfrères\ty\n").records;
    let report = classify(&words(&["brethen", "acheive"]), &response);

    assert_eq!(report.mismatches.len(), 2);
    for mismatch in &report.mismatches {
        assert!(mismatch.is_ambiguous());
    }
    assert_eq!(report.mismatches[0].candidates[0].word, "brethren");
    assert_eq!(report.mismatches[1].candidates[0].word, "achieve");
}

// ============================================================================
// Resolution Tests
// ============================================================================

#[test]
fn test_accept_renames_and_copies_content() {
    let mut table = pending_table(&["brethen", "hello"]);
    let response: GeneratedRecords = vec![
        (
            "brethen".to_string(),
            record(Some("brethren"), "frères", "The brethren met."),
        ),
        ("hello".to_string(), record(Some("hello"), "bonjour", "Hello!")),
    ]
    .into_iter()
    .collect();
    let report = classify(&words(&["brethen", "hello"]), &response);

    let mut decider = ScriptedDecider {
        confirms: vec![true],
        ..Default::default()
    };
    let resolution = MismatchReconciler::new(ReconciliationConfig::default(), &mut decider)
        .resolve(&mut table, &report, &response);
    let merged = merge_generated(&mut table, &response, &resolution.skip_merge);

    assert_eq!(resolution.renamed(), vec![("brethen".to_string(), "brethren".to_string())]);
    assert_eq!(merged, 1);
    let order: Vec<_> = table.iter().map(|e| e.word.as_str()).collect();
    assert_eq!(order, vec!["brethren", "hello"]);
    assert_eq!(table.get("brethren").unwrap().translation, "frères");
    assert!(table.get("hello").unwrap().is_complete());
    assert!(decider.prompts[0].contains("'brethren'"));
}

#[test]
fn test_decline_keeps_spelling_and_blocks_merge() {
    let mut table = pending_table(&["brethen"]);
    let response: GeneratedRecords = vec![(
        "brethen".to_string(),
        record(Some("brethren"), "frères", "The brethren met."),
    )]
    .into_iter()
    .collect();
    let report = classify(&words(&["brethen"]), &response);

    let mut decider = ScriptedDecider {
        confirms: vec![false],
        ..Default::default()
    };
    let resolution = MismatchReconciler::new(ReconciliationConfig::default(), &mut decider)
        .resolve(&mut table, &report, &response);
    let merged = merge_generated(&mut table, &response, &resolution.skip_merge);

    assert_eq!(merged, 0);
    assert_eq!(resolution.declined(), vec!["brethen".to_string()]);
    let entry = table.get("brethen").unwrap();
    assert!(entry.translation.is_empty());
    assert!(entry.example.is_empty());
}

#[test]
fn test_accept_all_never_picks_among_several() {
    let mut table = pending_table(&["brethen", "acheive"]);
    let response = parse_response("achieve\taccomplir\tx\nbrethren\tfrères\ty\n").records;
    let report = classify(&words(&["brethen", "acheive"]), &response);

    let mut decider = ScriptedDecider::default();
    let config = ReconciliationConfig {
        policy: ResolutionPolicy::AcceptAll,
    };
    let resolution = MismatchReconciler::new(config, &mut decider).resolve(&mut table, &report, &response);

    assert!(resolution.renamed().is_empty());
    assert_eq!(decider.options_seen.len(), 2);
    assert!(table.contains("brethen"));
}

#[test]
fn test_explicit_choice_among_candidates() {
    let mut table = pending_table(&["brethen", "acheive"]);
    let response = parse_response("achieve\taccomplir\tx\nbrethren\tfrères\ty\n").records;
    let report = classify(&words(&["brethen", "acheive"]), &response);

    // First question: pick the closest; second: skip
    let mut decider = ScriptedDecider {
        choices: vec![Some(0), None],
        ..Default::default()
    };
    let resolution = MismatchReconciler::new(ReconciliationConfig::default(), &mut decider)
        .resolve(&mut table, &report, &response);

    assert_eq!(resolution.renamed(), vec![("brethen".to_string(), "brethren".to_string())]);
    assert_eq!(table.get("brethren").unwrap().translation, "frères");
    assert!(table.contains("acheive"));
    assert!(resolution.skip_merge.contains("acheive"));
}

#[test]
fn test_out_of_range_choice_is_a_skip() {
    let mut table = pending_table(&["brethen", "acheive"]);
    let response = parse_response("achieve\taccomplir\tx\nbrethren\tfrères\ty\n").records;
    let report = classify(&words(&["brethen", "acheive"]), &response);

    let mut decider = ScriptedDecider {
        choices: vec![Some(7), Some(7)],
        ..Default::default()
    };
    let resolution = MismatchReconciler::new(ReconciliationConfig::default(), &mut decider)
        .resolve(&mut table, &report, &response);
    assert!(resolution.renamed().is_empty());
}

#[test]
fn test_correction_onto_existing_word_is_conflict() {
    let mut table = pending_table(&["brethen"]);
    table.insert(VocabularyEntry::new("brethren", "frères", "Existing."));
    let response: GeneratedRecords = vec![(
        "brethen".to_string(),
        record(Some("brethren"), "confrères", "New."),
    )]
    .into_iter()
    .collect();
    let report = classify(&words(&["brethen"]), &response);

    let mut decider = FixedDecider::yes();
    let resolution = MismatchReconciler::new(ReconciliationConfig::default(), &mut decider)
        .resolve(&mut table, &report, &response);

    assert!(matches!(
        resolution.actions[0],
        ReconciliationAction::Conflict { .. }
    ));
    assert_eq!(table.get("brethren").unwrap().translation, "frères");
    assert_eq!(table.len(), 2);
}

#[test]
fn test_merge_fills_only_blank_fields() {
    let mut table: VocabularyTable = vec![
        VocabularyEntry::new("cat", "chat", ""),
        VocabularyEntry::new("dog", "chien", "The dog barks."),
    ]
    .into_iter()
    .collect();
    let response = parse_response("cat\tcat\tfélin\tThe cat sleeps.\ndog\tdog\tX\tY\n").records;

    let merged = merge_generated(&mut table, &response, &HashSet::new());
    assert_eq!(merged, 1);
    let cat = table.get("cat").unwrap();
    assert_eq!(cat.translation, "chat");
    assert_eq!(cat.example, "The cat sleeps.");
    assert_eq!(table.get("dog").unwrap().translation, "chien");
}

#[test]
fn test_merge_sanitizes_generated_values() {
    let mut table = pending_table(&["plus"]);
    let response = parse_response("plus\tplus\t+1\t=SUM(A1)\n").records;
    merge_generated(&mut table, &response, &HashSet::new());
    let entry = table.get("plus").unwrap();
    assert_eq!(entry.translation, "'+1");
    assert_eq!(entry.example, "'=SUM(A1)");
}
