//! Vocabmaster LLM Sync: generated content → vocabulary file
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                       ENRICHMENT PIPELINE                            │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                                                                      │
//! │  ┌──────────┐  pending   ┌───────────┐  raw text  ┌──────────────┐   │
//! │  │  Vocab   │───words───►│ Generator │───────────►│ gpt_request_ │   │
//! │  │  CSV     │            │ (OpenAI)  │            │ *.bak        │   │
//! │  └──────────┘            └─────┬─────┘            └──────────────┘   │
//! │       ▲                        │ records                             │
//! │       │                  ┌─────▼──────┐   confirm/choose             │
//! │   atomic write           │ Mismatch   │◄──────────► Decider          │
//! │   + snapshot             │ Reconciler │                              │
//! │       │                  └─────┬──────┘                              │
//! │       │                  ┌─────▼─────┐                               │
//! │       └──────────────────│   Merge   │                               │
//! │                          └───────────┘                               │
//! │                                                                      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The generator may "correct" a word the user typed. Nothing is renamed
//! without a decision, and a declined correction never leaks its content
//! into the row through the generic merge.

pub mod llm;
pub mod prompt;
pub mod reconciliation;
pub mod response;
pub mod sync;

pub use llm::{Generation, GenerationError, ReplayGenerator, TextGenerator};
pub use reconciliation::{
    classify, merge_generated, Candidate, Mismatch, MismatchReconciler, ReconciliationAction,
    ReconciliationConfig, ReconciliationReport, Resolution, ResolutionPolicy,
};
pub use response::{parse_response, GeneratedRecord, GeneratedRecords, ParsedResponse};
pub use sync::{EnrichOutcome, EnrichReport, Enricher, SyncError, SyncEvent};

// Re-export storage types for convenience
pub use vocabmaster_storage::{
    Decider, FixedDecider, LanguagePair, PairMode, VocabularyEntry, VocabularyTable,
};
