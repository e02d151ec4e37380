//! Rule engine that turns similarity and coverage signals into marks.
//!
//! Gates run in a fixed order and can only lower the mark: not-answered,
//! wrong definition, band mapping, length penalty, concept gating, then OCR
//! fairness. The final label is always re-derived from the final mark.

use std::sync::Arc;

use serde::Serialize;

use super::concepts::{matched_fraction, ConceptMatcher, SubstringMatcher};
use super::detector::{count_all_words, is_not_answered};
use super::labels::{LabelThresholds, PerformanceLabel};
use super::reason::{reason_for_marks, ReasonContext};
use super::{round1, round3};

pub const NOT_ANSWERED_REASON: &str = "No answer provided.";
pub const WRONG_DEFINITION_REASON: &str = "Answer is conceptually incorrect.";

const WRONG_DEFINITION_SIMILARITY: f64 = 0.20;
const WEIGHT_TOLERANCE: f64 = 0.01;
const OCR_AVERAGE_CAP_QUALITY: f64 = 70.0;
const OCR_POOR_CAP_QUALITY: f64 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringInput {
    /// Semantic similarity in `[0, 1]`.
    pub semantic_similarity: f64,
    /// Concept coverage percentage in `[0, 100]`.
    pub concept_coverage: f64,
    pub semantic_weight: f64,
    pub concept_weight: f64,
    pub max_marks: f64,
    pub student_answer: String,
    pub covered_concepts: Vec<String>,
    pub required_concepts: Vec<String>,
    pub is_ocr_extracted: bool,
    pub ocr_quality_score: f64,
}

impl Default for ScoringInput {
    fn default() -> Self {
        Self {
            semantic_similarity: 0.0,
            concept_coverage: 0.0,
            semantic_weight: 0.5,
            concept_weight: 0.5,
            max_marks: 10.0,
            student_answer: String::new(),
            covered_concepts: Vec::new(),
            required_concepts: Vec::new(),
            is_ocr_extracted: false,
            ocr_quality_score: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringResult {
    pub marks: f64,
    pub label: PerformanceLabel,
    pub combined_score: f64,
    pub length_penalty_applied: bool,
    pub concept_gating_applied: bool,
    pub reason_for_marks: String,
    pub is_not_answered: bool,
    pub is_wrong_definition: bool,
}

impl ScoringResult {
    pub fn not_answered() -> Self {
        Self {
            marks: 0.0,
            label: PerformanceLabel::NotAnswered,
            combined_score: 0.0,
            length_penalty_applied: false,
            concept_gating_applied: false,
            reason_for_marks: NOT_ANSWERED_REASON.to_string(),
            is_not_answered: true,
            is_wrong_definition: false,
        }
    }

    fn wrong_definition(max_marks: f64) -> Self {
        Self {
            marks: round1(1.0_f64.min(max_marks * 0.10)),
            label: PerformanceLabel::Poor,
            combined_score: 0.0,
            length_penalty_applied: false,
            concept_gating_applied: true,
            reason_for_marks: WRONG_DEFINITION_REASON.to_string(),
            is_not_answered: false,
            is_wrong_definition: true,
        }
    }
}

#[derive(Clone)]
pub struct ScoringEngine {
    thresholds: LabelThresholds,
    matcher: Arc<dyn ConceptMatcher>,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(LabelThresholds::default(), Arc::new(SubstringMatcher))
    }
}

impl std::fmt::Debug for ScoringEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringEngine")
            .field("thresholds", &self.thresholds)
            .finish_non_exhaustive()
    }
}

impl ScoringEngine {
    pub fn new(thresholds: LabelThresholds, matcher: Arc<dyn ConceptMatcher>) -> Self {
        Self { thresholds, matcher }
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn ConceptMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn thresholds(&self) -> &LabelThresholds {
        &self.thresholds
    }

    pub fn score(&self, input: &ScoringInput) -> ScoringResult {
        if is_not_answered(&input.student_answer) {
            return ScoringResult::not_answered();
        }

        let similarity = clamp_unit(input.semantic_similarity);
        let coverage = input.concept_coverage.clamp(0.0, 100.0);
        let max_marks = input.max_marks;

        if similarity < WRONG_DEFINITION_SIMILARITY && coverage == 0.0 {
            return ScoringResult::wrong_definition(max_marks);
        }

        let (semantic_weight, concept_weight) =
            normalized_weights(input.semantic_weight, input.concept_weight);
        let combined_score = similarity * semantic_weight + (coverage / 100.0) * concept_weight;

        let (mut marks, mut label) = band_marks(combined_score, max_marks);

        let word_count = count_all_words(&input.student_answer);
        let length_ceiling = length_ceiling(word_count, max_marks);
        if marks > length_ceiling {
            marks = length_ceiling;
            if matches!(label, PerformanceLabel::Excellent | PerformanceLabel::VeryGood) {
                label = PerformanceLabel::Good;
            }
        }

        let concept_ceiling = matched_fraction(
            self.matcher.as_ref(),
            &input.required_concepts,
            &input.covered_concepts,
        )
        .map_or(max_marks, |fraction| concept_ceiling(fraction, max_marks));
        if marks > concept_ceiling {
            marks = concept_ceiling;
            label = if concept_ceiling <= 2.0 {
                PerformanceLabel::Poor
            } else {
                downgrade_to_average(label)
            };
        }

        let scale = max_marks / 10.0;
        if input.is_ocr_extracted {
            if input.ocr_quality_score < OCR_AVERAGE_CAP_QUALITY && marks > 5.0 * scale {
                marks = 5.0 * scale;
                label = downgrade_to_average(label);
            }
            if input.ocr_quality_score < OCR_POOR_CAP_QUALITY && marks > 3.0 * scale {
                marks = 3.0 * scale;
                label = PerformanceLabel::Poor;
            }
        }

        let marks = round1(marks.min(max_marks).max(0.0));
        let final_label = self.thresholds.label_for(marks, max_marks);
        if final_label != label {
            tracing::debug!(
                gate_label = %label,
                final_label = %final_label,
                marks,
                "Final label re-derived from marks"
            );
        }

        let length_penalty_applied = length_ceiling < max_marks;
        let concept_gating_applied = concept_ceiling < max_marks;
        let reason_for_marks = reason_for_marks(&ReasonContext {
            marks,
            semantic_similarity: similarity,
            concept_coverage: coverage,
            word_count,
            covered_count: input.covered_concepts.len(),
            required_count: if input.required_concepts.is_empty() {
                input.covered_concepts.len()
            } else {
                input.required_concepts.len()
            },
            length_penalty_applied,
            concept_gating_applied,
        });

        ScoringResult {
            marks,
            label: final_label,
            combined_score: round3(combined_score),
            length_penalty_applied,
            concept_gating_applied,
            reason_for_marks,
            is_not_answered: false,
            is_wrong_definition: false,
        }
    }
}

/// Scores with the default thresholds and substring concept matching.
pub fn score(input: &ScoringInput) -> ScoringResult {
    ScoringEngine::default().score(input)
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn normalized_weights(semantic: f64, concept: f64) -> (f64, f64) {
    let sum = semantic + concept;
    if sum <= 0.0 || !sum.is_finite() {
        tracing::warn!(semantic, concept, "Weights do not sum to a positive value; using 0.5/0.5");
        return (0.5, 0.5);
    }
    if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
        tracing::warn!(semantic, concept, "Renormalizing scoring weights");
        return (semantic / sum, concept / sum);
    }
    (semantic, concept)
}

/// Maps a combined score onto its band and the mark inside that band.
pub(crate) fn band_marks(combined_score: f64, max_marks: f64) -> (f64, PerformanceLabel) {
    let scale = max_marks / 10.0;
    let (marks, label) = if combined_score < 0.35 {
        let marks =
            if combined_score > 0.0 { (combined_score / 0.35) * 3.0 * scale } else { 0.0 };
        (marks, PerformanceLabel::Poor)
    } else if combined_score < 0.55 {
        (4.0 * scale + (combined_score - 0.35) / 0.20 * scale, PerformanceLabel::Average)
    } else if combined_score < 0.75 {
        (6.0 * scale + (combined_score - 0.55) / 0.20 * scale, PerformanceLabel::Good)
    } else if combined_score < 0.90 {
        (8.0 * scale + (combined_score - 0.75) / 0.15 * scale, PerformanceLabel::VeryGood)
    } else {
        (max_marks, PerformanceLabel::Excellent)
    };
    (round1(marks.min(max_marks)), label)
}

fn length_ceiling(word_count: usize, max_marks: f64) -> f64 {
    match word_count {
        0..=5 => max_marks.min(2.0),
        6..=9 => max_marks * 0.6,
        10..=14 => max_marks * 0.8,
        _ => max_marks,
    }
}

fn concept_ceiling(matched_fraction: f64, max_marks: f64) -> f64 {
    if matched_fraction == 0.0 {
        max_marks.min(2.0)
    } else if matched_fraction < 0.5 {
        max_marks.min(5.0)
    } else {
        max_marks
    }
}

fn downgrade_to_average(label: PerformanceLabel) -> PerformanceLabel {
    match label {
        PerformanceLabel::Excellent | PerformanceLabel::VeryGood | PerformanceLabel::Good => {
            PerformanceLabel::Average
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_ANSWER: &str = "Photosynthesis is the process by which green plants use sunlight \
        water and carbon dioxide to produce glucose and release oxygen";

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    fn input(similarity: f64, coverage: f64, answer: &str) -> ScoringInput {
        ScoringInput {
            semantic_similarity: similarity,
            concept_coverage: coverage,
            student_answer: answer.to_string(),
            ..ScoringInput::default()
        }
    }

    #[test]
    fn blank_answer_is_not_answered_regardless_of_signals() {
        let result = score(&input(0.99, 100.0, ""));
        assert_eq!(result, ScoringResult::not_answered());
        assert_eq!(result.reason_for_marks, "No answer provided.");

        let result = score(&input(0.99, 100.0, "it is ok"));
        assert!(result.is_not_answered);
        assert_eq!(result.marks, 0.0);
    }

    #[test]
    fn wrong_definition_is_a_hard_floor() {
        let result = score(&input(0.1, 0.0, LONG_ANSWER));
        assert!(result.is_wrong_definition);
        assert_eq!(result.marks, 1.0);
        assert_eq!(result.label, PerformanceLabel::Poor);
        assert!(result.concept_gating_applied);
        assert!(!result.length_penalty_applied);
        assert_eq!(result.combined_score, 0.0);

        let small = ScoringInput { max_marks: 5.0, ..input(0.1, 0.0, LONG_ANSWER) };
        assert_eq!(score(&small).marks, 0.5);
    }

    #[test]
    fn excellent_scenario() {
        let answer = "one two three four five six seven eight nine ten eleven twelve thirteen \
            fourteen fifteen sixteen seventeen eighteen nineteen twenty";
        let result = score(&ScoringInput {
            required_concepts: owned(&["sunlight", "glucose"]),
            covered_concepts: owned(&["sunlight", "glucose"]),
            ..input(0.95, 90.0, answer)
        });
        assert_eq!(result.combined_score, 0.925);
        assert_eq!(result.marks, 10.0);
        assert_eq!(result.label, PerformanceLabel::Excellent);
        assert!(!result.length_penalty_applied);
        assert!(!result.concept_gating_applied);
        assert_eq!(result.reason_for_marks, "Comprehensive answer with good understanding.");
    }

    #[test]
    fn four_word_answer_hits_length_ceiling() {
        let result = score(&ScoringInput {
            required_concepts: owned(&["plants", "food"]),
            covered_concepts: owned(&["plants", "food"]),
            ..input(0.95, 90.0, "Plants make food using")
        });
        assert_eq!(result.marks, 2.0);
        assert_eq!(result.label, PerformanceLabel::Poor);
        assert!(result.length_penalty_applied);
        assert!(result
            .reason_for_marks
            .starts_with("Answer too brief to demonstrate understanding."));
    }

    #[test]
    fn length_ceiling_counts_short_words() {
        // Nine tokens, several of them under three characters.
        let result = score(&input(0.95, 90.0, "It is a way to make food by light"));
        assert_eq!(result.marks, 6.0);
        assert_eq!(result.label, PerformanceLabel::Good);
        assert!(result.length_penalty_applied);
        assert!(result.reason_for_marks.starts_with("Answer is too short."));
    }

    #[test]
    fn concept_gating_caps_marks() {
        let none_matched = score(&ScoringInput {
            required_concepts: owned(&["chlorophyll", "glucose"]),
            covered_concepts: owned(&["water"]),
            ..input(0.95, 90.0, LONG_ANSWER)
        });
        assert_eq!(none_matched.marks, 2.0);
        assert_eq!(none_matched.label, PerformanceLabel::Poor);
        assert!(none_matched.concept_gating_applied);

        let few_matched = score(&ScoringInput {
            required_concepts: owned(&["chlorophyll", "glucose", "oxygen"]),
            covered_concepts: owned(&["Glucose"]),
            ..input(0.95, 90.0, LONG_ANSWER)
        });
        assert_eq!(few_matched.marks, 5.0);
        assert_eq!(few_matched.label, PerformanceLabel::Average);
        assert_eq!(
            few_matched.reason_for_marks,
            "Key concepts missing. Comprehensive answer with good understanding."
        );
    }

    #[test]
    fn ocr_quality_caps_marks() {
        let base = input(0.95, 90.0, LONG_ANSWER);
        let medium = score(&ScoringInput {
            is_ocr_extracted: true,
            ocr_quality_score: 60.0,
            ..base.clone()
        });
        assert_eq!(medium.marks, 5.0);
        assert_eq!(medium.label, PerformanceLabel::Average);

        let low = score(&ScoringInput {
            is_ocr_extracted: true,
            ocr_quality_score: 40.0,
            ..base.clone()
        });
        assert_eq!(low.marks, 3.0);
        assert_eq!(low.label, PerformanceLabel::Poor);

        let typed = score(&ScoringInput { ocr_quality_score: 10.0, ..base });
        assert_eq!(typed.marks, 10.0);
    }

    #[test]
    fn weights_are_renormalized() {
        let skewed = score(&ScoringInput {
            semantic_weight: 2.0,
            concept_weight: 2.0,
            ..input(0.6, 60.0, LONG_ANSWER)
        });
        let balanced = score(&input(0.6, 60.0, LONG_ANSWER));
        assert_eq!(skewed, balanced);

        let zero = score(&ScoringInput {
            semantic_weight: 0.0,
            concept_weight: 0.0,
            ..input(0.6, 60.0, LONG_ANSWER)
        });
        assert_eq!(zero, balanced);
    }

    #[test]
    fn band_marks_are_monotonic() {
        let mut previous = 0.0;
        for step in 0..=100 {
            let combined = f64::from(step) / 100.0;
            let (marks, _) = band_marks(combined, 10.0);
            assert!(marks >= previous, "marks dropped at {combined}");
            previous = marks;
        }
    }

    #[test]
    fn marks_stay_in_bounds_and_scoring_is_idempotent() {
        let engine = ScoringEngine::default();
        for max_marks in [1.0, 5.0, 10.0, 20.0] {
            for similarity in [0.0, 0.15, 0.3, 0.5, 0.8, 1.0] {
                for coverage in [0.0, 25.0, 60.0, 100.0] {
                    let case =
                        ScoringInput { max_marks, ..input(similarity, coverage, LONG_ANSWER) };
                    let first = engine.score(&case);
                    assert!(first.marks >= 0.0 && first.marks <= max_marks);
                    assert_eq!(first, engine.score(&case));
                }
            }
        }
    }
}
