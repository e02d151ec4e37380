use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub number: u64,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedItem {
    pub question_no: u64,
    #[serde(rename = "question")]
    pub question_text: String,
    #[serde(rename = "model_answer")]
    pub model_answer_text: String,
    #[serde(rename = "student_answer")]
    pub student_answer_text: String,
    pub has_student_answer: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("No questions found in the question paper")]
    NoQuestionsFound,
    #[error("No model answers found")]
    NoModelAnswersFound,
}

/// Start-of-entry patterns in priority order: `1.` / `1)`, `Q1.` / `Q1)`,
/// `Question 1:` / `Question 1-` / `Question 1.`.
fn entry_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(?i)^(\d+)[.)]\s*(.+)$").expect("valid numbered pattern"),
            Regex::new(r"(?i)^q(\d+)[.)]\s*(.+)$").expect("valid q-prefixed pattern"),
            Regex::new(r"(?i)^question\s+(\d+)[:\-.]\s*(.+)$").expect("valid question pattern"),
        ]
    })
}

fn match_entry_start(line: &str) -> Option<(u64, String)> {
    entry_patterns().iter().find_map(|pattern| {
        let captures = pattern.captures(line)?;
        let digits = captures.get(1)?.as_str();
        let Ok(number) = digits.parse::<u64>() else {
            tracing::warn!(marker = digits, "Entry number out of range; line kept as text");
            return None;
        };
        let rest = captures.get(2).map(|value| value.as_str().trim()).unwrap_or_default();
        Some((number, rest.to_string()))
    })
}

struct OpenEntry {
    number: u64,
    lines: Vec<String>,
}

impl OpenEntry {
    fn close(self) -> Option<Entry> {
        let content = self.lines.join("\n").trim().to_string();
        if content.is_empty() {
            None
        } else {
            Some(Entry { number: self.number, content })
        }
    }
}

/// Segments numbered text into entries, in the order they appear.
///
/// Lines before the first numbering marker are ignored. Blank lines inside
/// an entry are kept so paragraph breaks survive; entries that end up empty
/// are dropped.
pub fn parse_entries(text: &str) -> Vec<Entry> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut entries = Vec::new();
    let mut current: Option<OpenEntry> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();

        if let Some((number, rest)) = match_entry_start(line) {
            if let Some(entry) = current.take().and_then(OpenEntry::close) {
                entries.push(entry);
            }
            let lines = if rest.is_empty() { Vec::new() } else { vec![rest] };
            current = Some(OpenEntry { number, lines });
            continue;
        }

        if let Some(open) = current.as_mut() {
            if !line.is_empty() || !open.lines.is_empty() {
                open.lines.push(line.to_string());
            }
        }
    }

    if let Some(entry) = current.and_then(OpenEntry::close) {
        entries.push(entry);
    }

    entries
}

/// Joins questions with model and student answers by number.
///
/// Output keeps the order questions were parsed in. A missing student answer
/// is reported per item, never as an error.
pub fn match_items(
    questions: &[Entry],
    model_answers: &[Entry],
    student_answers: &[Entry],
) -> Result<Vec<MatchedItem>, ParseError> {
    if questions.is_empty() {
        return Err(ParseError::NoQuestionsFound);
    }
    if model_answers.is_empty() {
        return Err(ParseError::NoModelAnswersFound);
    }

    let model_by_number = number_lookup(model_answers);
    let student_by_number = number_lookup(student_answers);

    Ok(questions
        .iter()
        .map(|question| {
            let student = student_by_number.get(&question.number);
            MatchedItem {
                question_no: question.number,
                question_text: question.content.clone(),
                model_answer_text: model_by_number
                    .get(&question.number)
                    .map(|content| content.to_string())
                    .unwrap_or_default(),
                student_answer_text: student.map(|content| content.to_string()).unwrap_or_default(),
                has_student_answer: student.is_some(),
            }
        })
        .collect())
}

// Later duplicates win, same as building a map from the list.
fn number_lookup(entries: &[Entry]) -> HashMap<u64, &str> {
    entries.iter().map(|entry| (entry.number, entry.content.as_str())).collect()
}

pub fn parse_full_paper(
    questions_text: &str,
    model_answers_text: &str,
    student_answers_text: &str,
) -> Result<Vec<MatchedItem>, ParseError> {
    let questions = parse_entries(questions_text);
    let model_answers = parse_entries(model_answers_text);
    let student_answers = parse_entries(student_answers_text);

    let matched = match_items(&questions, &model_answers, &student_answers)?;
    tracing::info!(
        questions = questions.len(),
        model_answers = model_answers.len(),
        student_answers = student_answers.len(),
        "Parsed paper"
    );
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(number: u64, content: &str) -> Entry {
        Entry { number, content: content.to_string() }
    }

    #[test]
    fn parses_all_marker_styles() {
        let text =
            "1. First\n2) Second\nQ3. Third\nq4) Fourth\nQuestion 5: Fifth\nquestion 6- Sixth";
        let entries = parse_entries(text);
        let numbers: Vec<u64> = entries.iter().map(|item| item.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(entries[4].content, "Fifth");
        assert_eq!(entries[5].content, "Sixth");
    }

    #[test]
    fn keeps_multiline_content_and_paragraph_breaks() {
        let text = "1. Photosynthesis converts light\ninto chemical energy.\n\nIt happens in chloroplasts.\n2. Next";
        let entries = parse_entries(text);
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].content,
            "Photosynthesis converts light\ninto chemical energy.\n\nIt happens in chloroplasts."
        );
    }

    #[test]
    fn ignores_preamble_and_bare_markers() {
        let text = "Name: Student\nClass 10\n1.\n\n2. Real answer";
        let entries = parse_entries(text);
        assert_eq!(entries, vec![entry(2, "Real answer")]);
    }

    #[test]
    fn bare_marker_does_not_open_an_entry() {
        // "1." alone does not match because the remainder is required.
        let entries = parse_entries("1.\nContinuation only");
        assert!(entries.is_empty());
    }

    #[test]
    fn large_markers_open_entries() {
        let entries = parse_entries("1. First\n99999999999. Second");
        assert_eq!(entries, vec![entry(1, "First"), entry(99_999_999_999, "Second")]);

        let entries = parse_entries("1. First\n123456789012345678901234. Not a marker");
        assert_eq!(
            entries,
            vec![entry(1, "First\n123456789012345678901234. Not a marker")]
        );
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(parse_entries("").is_empty());
        assert!(parse_entries("   \n  ").is_empty());
    }

    #[test]
    fn round_trip_single_question() {
        let matched =
            parse_full_paper("1. What is X?", "1. X is Y.", "1. X is Z.").expect("matched paper");
        assert_eq!(
            matched,
            vec![MatchedItem {
                question_no: 1,
                question_text: "What is X?".to_string(),
                model_answer_text: "X is Y.".to_string(),
                student_answer_text: "X is Z.".to_string(),
                has_student_answer: true,
            }]
        );
    }

    #[test]
    fn missing_student_and_model_answers_are_not_fatal() {
        let questions = vec![entry(2, "Second?"), entry(1, "First?"), entry(3, "Third?")];
        let models = vec![entry(1, "A1"), entry(2, "A2")];
        let students = vec![entry(1, "S1")];

        let matched = match_items(&questions, &models, &students).expect("matched");
        let order: Vec<u64> = matched.iter().map(|item| item.question_no).collect();
        assert_eq!(order, vec![2, 1, 3]);

        assert!(!matched[0].has_student_answer);
        assert_eq!(matched[0].student_answer_text, "");
        assert!(matched[1].has_student_answer);
        assert_eq!(matched[2].model_answer_text, "");
    }

    #[test]
    fn empty_inputs_fail() {
        assert_eq!(
            match_items(&[], &[entry(1, "A")], &[]).unwrap_err(),
            ParseError::NoQuestionsFound
        );
        assert_eq!(
            match_items(&[entry(1, "Q")], &[], &[]).unwrap_err(),
            ParseError::NoModelAnswersFound
        );
        assert!(match_items(&[entry(1, "Q")], &[entry(1, "A")], &[]).is_ok());
    }
}
