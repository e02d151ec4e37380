use std::sync::OnceLock;

use regex::Regex;

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\w+\b").expect("valid word regex"))
}

/// Counts meaningful words: word-boundary tokens longer than two characters.
pub fn count_words(text: &str) -> usize {
    if text.trim().is_empty() {
        return 0;
    }
    let lowered = text.to_lowercase();
    word_re().find_iter(&lowered).filter(|word| word.as_str().chars().count() > 2).count()
}

/// Counts every word-boundary token. Used for the length penalty, which
/// deliberately does not share the short-word filter of [`count_words`].
pub fn count_all_words(text: &str) -> usize {
    if text.trim().is_empty() {
        return 0;
    }
    word_re().find_iter(text).count()
}

/// Blank text or fewer than three meaningful words.
pub fn is_not_answered(text: &str) -> bool {
    text.trim().is_empty() || count_words(text) < 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_words_skips_short_tokens() {
        assert_eq!(count_words("It is a cat on the mat"), 3);
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("   "), 0);
    }

    #[test]
    fn count_all_words_keeps_short_tokens() {
        assert_eq!(count_all_words("It is a cat on the mat"), 7);
        assert_eq!(count_all_words("\n\t"), 0);
    }

    #[test]
    fn not_answered_rules() {
        assert!(is_not_answered(""));
        assert!(is_not_answered("  \n "));
        assert!(is_not_answered("I do not"));
        assert!(is_not_answered("it is ok"));
        assert!(!is_not_answered("Plants make food"));
    }
}
