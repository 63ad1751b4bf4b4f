//! Flashcard deck export (tab-separated, Anki import headers).

use crate::atomic::write_atomic_bytes;
use crate::backup::BackupManager;
use crate::csv_store::read_table;
use crate::error::Result;
use crate::layout::{DataLayout, LanguagePair, PairMode};
use crate::VocabularyTable;
use std::path::PathBuf;

pub const DECK_TAG: &str = "vocabmaster";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckSummary {
    pub path: PathBuf,
    pub cards: usize,
    pub backup: PathBuf,
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn deck_name(pair: &LanguagePair) -> String {
    let kind = match pair.mode() {
        PairMode::Translation => "vocabulary",
        PairMode::Definition => "definitions",
    };
    format!("{} {kind}", capitalize(pair.learn()))
}

/// Render the deck file. Rows without both translation and example are left
/// out. Returns the text and the number of cards.
pub fn render_deck(pair: &LanguagePair, table: &VocabularyTable) -> (String, usize) {
    let mut out = String::new();
    out.push_str("#separator:tab\n");
    out.push_str("#html:true\n");
    out.push_str("#notetype:Basic (and reversed card)\n");
    out.push_str(&format!("#tags:{DECK_TAG}\n"));
    out.push_str(&format!("#deck:{}\n", deck_name(pair)));

    let mut cards = 0;
    for entry in table.iter().filter(|e| e.is_complete()) {
        out.push_str(&format!(
            "{}\t{}<br><br><details><summary>example</summary><i>&quot;{}&quot;</i></details>\n",
            entry.word.trim(),
            entry.translation.trim(),
            entry.example.trim()
        ));
        cards += 1;
    }
    (out, cards)
}

/// Writes the deck for a pair and snapshots it.
pub struct DeckWriter<'a> {
    layout: &'a DataLayout,
}

impl<'a> DeckWriter<'a> {
    pub fn new(layout: &'a DataLayout) -> Self {
        Self { layout }
    }

    pub fn write(&self, pair: &LanguagePair) -> Result<DeckSummary> {
        let table = read_table(&self.layout.vocabulary_path(pair))?;
        let (text, cards) = render_deck(pair, &table);

        let path = self.layout.deck_path(pair);
        write_atomic_bytes(&path, text.as_bytes())?;
        let backup = BackupManager::for_pair(self.layout, pair).snapshot(&path)?;
        tracing::info!(path = %path.display(), cards, "flashcard deck written");
        Ok(DeckSummary { path, cards, backup })
    }
}
