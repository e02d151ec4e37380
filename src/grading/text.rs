use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will",
    "would", "should", "could", "may", "might", "must", "can",
];

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

fn disallowed_chars_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s.,!?;:\-()]").expect("valid cleanup regex"))
}

/// Lowercases, collapses runs of whitespace and trims.
pub fn preprocess_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let lowered = text.to_lowercase();
    whitespace_re().replace_all(&lowered, " ").trim().to_string()
}

/// Drops everything except word characters, whitespace and basic punctuation,
/// then applies [`preprocess_text`].
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let stripped = disallowed_chars_re().replace_all(text, "");
    preprocess_text(&stripped)
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Cleaned tokens with surrounding punctuation removed.
pub fn tokens(text: &str) -> Vec<String> {
    clean_text(text)
        .split_whitespace()
        .map(|token| token.trim_matches(|ch: char| !ch.is_alphanumeric()).to_string())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Single-word key phrases in first-seen order: at least `min_length`
/// characters and not a stop word.
pub fn extract_key_phrases(text: &str, min_length: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens(text)
        .into_iter()
        .filter(|word| word.chars().count() >= min_length && !is_stop_word(word))
        .filter(|word| seen.insert(word.clone()))
        .collect()
}
