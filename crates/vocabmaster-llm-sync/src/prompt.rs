//! Prompt construction for the text generator.

use vocabmaster_storage::{LanguagePair, PairMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

const SYSTEM: &str = "You build vocabulary lists. \
Reply with tab-separated rows only: no header, no commentary, no code fences.";

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Build the request for `words` in the mode implied by `pair`.
pub fn build_prompt(pair: &LanguagePair, words: &[String]) -> Prompt {
    let learn = capitalize(pair.learn());
    let mother = capitalize(pair.mother());
    let list = words.join("\n");

    let task = match pair.mode() {
        PairMode::Translation => format!(
            "Translate the following {learn} words into {mother}.\n\
             For each word write one row with four columns separated by a TAB:\n\
             1. the word exactly as given\n\
             2. the correctly spelled {learn} word (same as column 1 if it was already correct)\n\
             3. two or three {mother} translations, separated by commas\n\
             4. ONE example sentence in {learn}"
        ),
        PairMode::Definition => format!(
            "Define the following {learn} words in {learn}.\n\
             For each word write one row with four columns separated by a TAB:\n\
             1. the word exactly as given\n\
             2. the correctly spelled word (same as column 1 if it was already correct)\n\
             3. a short definition; give up to three senses separated by semicolons\n\
             4. ONE example sentence using the word"
        ),
    };

    Prompt {
        system: SYSTEM.to_string(),
        user: format!("{task}\n\nWrite exactly one row per word, in the order given.\n---\n{list}"),
    }
}
