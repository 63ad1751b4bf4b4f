//! Spelling reconciliation between requested words and generated records.
//!
//! The generator reports, for every word it was sent, the spelling it thinks
//! is correct. Before anything is merged the reconciler sorts each requested
//! word into one of three buckets:
//!
//! - **agreed**: the recognized spelling equals the requested word
//! - **mismatch**: a different spelling was returned (case counts), or the
//!   word is absent while unrequested keys came back that may be corrections
//! - **missing**: nothing usable came back for the word
//!
//! Mismatches are resolved through an injected [`Decider`]. Accepting renames
//! the vocabulary row and copies the generated content; declining keeps the
//! user's spelling and excludes the word from the generic merge.
//!
//! Ambiguous cases (several candidate corrections) always require an explicit
//! choice. Candidates are ordered by edit distance to help, never to pick.

use crate::response::GeneratedRecords;
use std::collections::HashSet;
use vocabmaster_storage::sanitize::sanitize_cell;
use vocabmaster_storage::{Decider, VocabularyTable};

// ============================================================================
// Classification
// ============================================================================

/// A possible correction for a requested word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Corrected spelling to rename the row to.
    pub word: String,
    /// Response key holding the generated content for this candidate.
    pub response_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub original: String,
    pub candidates: Vec<Candidate>,
}

impl Mismatch {
    pub fn is_ambiguous(&self) -> bool {
        self.candidates.len() > 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub mismatches: Vec<Mismatch>,
    pub missing: Vec<String>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty() && self.missing.is_empty()
    }
}

/// Levenshtein distance over lowercase chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Sort each requested word into mismatch / missing / agreed.
pub fn classify(requested: &[String], response: &GeneratedRecords) -> ReconciliationReport {
    let requested_set: HashSet<&str> = requested.iter().map(String::as_str).collect();
    let extras: Vec<Candidate> = response
        .iter()
        .filter(|(key, _)| !requested_set.contains(key))
        .map(|(key, record)| Candidate {
            word: record.recognized().unwrap_or(key).to_string(),
            response_key: key.to_string(),
        })
        .collect();

    let mut report = ReconciliationReport::default();
    for original in requested {
        match response.get(original) {
            Some(record) => match record.recognized() {
                None => report.missing.push(original.clone()),
                Some(recognized) if recognized != original => {
                    report.mismatches.push(Mismatch {
                        original: original.clone(),
                        candidates: vec![Candidate {
                            word: recognized.to_string(),
                            response_key: original.clone(),
                        }],
                    })
                }
                Some(_) => {}
            },
            None if extras.is_empty() => report.missing.push(original.clone()),
            None => {
                let mut candidates = extras.clone();
                candidates.sort_by_key(|c| edit_distance(original, &c.word));
                report.mismatches.push(Mismatch {
                    original: original.clone(),
                    candidates,
                });
            }
        }
    }

    tracing::debug!(
        requested = requested.len(),
        mismatches = report.mismatches.len(),
        missing = report.missing.len(),
        "classified generated records"
    );
    report
}

// ============================================================================
// Resolution
// ============================================================================

/// How single-candidate mismatches are decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPolicy {
    /// Ask the decider for every mismatch.
    #[default]
    Prompt,
    /// Accept single-candidate corrections without asking. Ambiguous ones
    /// still go to the decider.
    AcceptAll,
    /// Keep every original spelling.
    SkipAll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationAction {
    Accepted { original: String, corrected: String },
    Declined { original: String },
    /// Correction accepted but the corrected word is already in the table.
    Conflict { original: String, corrected: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub actions: Vec<ReconciliationAction>,
    /// Response keys the generic merge must not apply.
    pub skip_merge: HashSet<String>,
}

impl Resolution {
    pub fn renamed(&self) -> Vec<(String, String)> {
        self.actions
            .iter()
            .filter_map(|action| match action {
                ReconciliationAction::Accepted {
                    original,
                    corrected,
                } => Some((original.clone(), corrected.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn declined(&self) -> Vec<String> {
        self.actions
            .iter()
            .filter_map(|action| match action {
                ReconciliationAction::Declined { original }
                | ReconciliationAction::Conflict { original, .. } => Some(original.clone()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconciliationConfig {
    pub policy: ResolutionPolicy,
}

/// Drives accept/decline decisions and applies them to a table.
pub struct MismatchReconciler<'d> {
    config: ReconciliationConfig,
    decider: &'d mut dyn Decider,
}

impl<'d> MismatchReconciler<'d> {
    pub fn new(config: ReconciliationConfig, decider: &'d mut dyn Decider) -> Self {
        Self { config, decider }
    }

    fn pick(&mut self, mismatch: &Mismatch) -> Option<usize> {
        let original = &mismatch.original;
        if mismatch.is_ambiguous() {
            if self.config.policy == ResolutionPolicy::SkipAll {
                return None;
            }
            let options: Vec<String> = mismatch.candidates.iter().map(|c| c.word.clone()).collect();
            let prompt = format!("No answer for '{original}'. Was it one of these words?");
            return self
                .decider
                .choose(&prompt, &options)
                .filter(|&idx| idx < options.len());
        }

        let candidate = mismatch.candidates.first()?;
        let accept = match self.config.policy {
            ResolutionPolicy::AcceptAll => true,
            ResolutionPolicy::SkipAll => false,
            ResolutionPolicy::Prompt => self.decider.confirm(&format!(
                "'{original}' was recognized as '{}'. Use the corrected spelling?",
                candidate.word
            )),
        };
        accept.then_some(0)
    }

    /// Decide every mismatch and apply accepted renames to `table`.
    ///
    /// Missing words are added to the skip set as well: an empty recognized
    /// column is not a signal to merge on.
    pub fn resolve(
        &mut self,
        table: &mut VocabularyTable,
        report: &ReconciliationReport,
        response: &GeneratedRecords,
    ) -> Resolution {
        let mut resolution = Resolution::default();
        resolution.skip_merge.extend(report.missing.iter().cloned());

        for mismatch in &report.mismatches {
            let original = mismatch.original.clone();
            let Some(candidate) = self.pick(mismatch).map(|idx| &mismatch.candidates[idx]) else {
                tracing::info!(word = %original, "keeping original spelling");
                resolution.skip_merge.insert(original.clone());
                resolution
                    .actions
                    .push(ReconciliationAction::Declined { original });
                continue;
            };

            let corrected = candidate.word.clone();
            if !table.rename(&original, &corrected) {
                tracing::warn!(
                    word = %original,
                    corrected = %corrected,
                    "cannot apply correction; word missing or corrected spelling already present"
                );
                resolution.skip_merge.insert(original.clone());
                resolution.actions.push(ReconciliationAction::Conflict {
                    original,
                    corrected,
                });
                continue;
            }

            if let (Some(record), Some(entry)) =
                (response.get(&candidate.response_key), table.get_mut(&corrected))
            {
                entry.translation = sanitize_cell(&record.translation);
                entry.example = sanitize_cell(&record.example);
            }
            tracing::info!(word = %original, corrected = %corrected, "applied spelling correction");
            resolution.skip_merge.insert(original.clone());
            resolution.skip_merge.insert(candidate.response_key.clone());
            resolution.actions.push(ReconciliationAction::Accepted {
                original,
                corrected,
            });
        }
        resolution
    }
}

/// Fill blank fields of table rows from the response, skipping `skip`.
///
/// Existing non-blank content is never overwritten. Returns the number of
/// rows that changed.
pub fn merge_generated(
    table: &mut VocabularyTable,
    response: &GeneratedRecords,
    skip: &HashSet<String>,
) -> usize {
    let mut merged = 0;
    for (key, record) in response.iter() {
        if skip.contains(key) {
            continue;
        }
        let Some(entry) = table.get_mut(key) else {
            continue;
        };
        let mut changed = false;
        if entry.translation.trim().is_empty() && !record.translation.trim().is_empty() {
            entry.translation = sanitize_cell(&record.translation);
            changed = true;
        }
        if entry.example.trim().is_empty() && !record.example.trim().is_empty() {
            entry.example = sanitize_cell(&record.example);
            changed = true;
        }
        if changed {
            merged += 1;
        }
    }
    merged
}
