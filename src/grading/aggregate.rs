//! Full-paper evaluation: parse, score every question on a bounded worker
//! pool, then summarize once all results are in.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::detector::is_not_answered;
use super::engine::{ScoringEngine, ScoringInput, ScoringResult, WRONG_DEFINITION_REASON};
use super::labels::{OverallThresholds, PerformanceLabel};
use super::parser::{parse_full_paper, MatchedItem, ParseError};
use super::resolvers::{
    ConceptAnalysis, Feedback, FeedbackRequest, ResolverError, Resolvers,
};
use super::text::preprocess_text;
use super::round1;

pub const OCR_WEAKNESS: &str = "OCR extraction limitations may affect evaluation accuracy.";
const OCR_WARNING_QUALITY: f64 = 70.0;

#[derive(Debug, Error)]
pub enum GradingError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    #[error("grading worker failed: {0}")]
    Worker(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaperRequest {
    pub questions_text: String,
    pub model_answers_text: String,
    pub student_answers_text: String,
    pub marks_per_question: f64,
    pub semantic_weight: f64,
    pub concept_weight: f64,
    pub is_ocr_extracted: bool,
    pub ocr_quality_score: f64,
}

/// One question to grade, with everything the engine and resolvers need.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerTask {
    pub question_no: u64,
    pub question: String,
    pub model_answer: String,
    pub student_answer: String,
    pub has_student_answer: bool,
    pub max_marks: f64,
    pub semantic_weight: f64,
    pub concept_weight: f64,
    pub is_ocr_extracted: bool,
    pub ocr_quality_score: f64,
}

impl AnswerTask {
    pub fn from_item(item: MatchedItem, request: &PaperRequest) -> Self {
        Self {
            question_no: item.question_no,
            question: item.question_text,
            model_answer: item.model_answer_text,
            student_answer: item.student_answer_text,
            has_student_answer: item.has_student_answer,
            max_marks: request.marks_per_question,
            semantic_weight: request.semantic_weight,
            concept_weight: request.concept_weight,
            is_ocr_extracted: request.is_ocr_extracted,
            ocr_quality_score: request.ocr_quality_score,
        }
    }

    fn low_ocr_quality(&self) -> bool {
        self.is_ocr_extracted && self.ocr_quality_score < OCR_WARNING_QUALITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    NotAnswered,
    Poor,
    Average,
    Good,
    VeryGood,
    Excellent,
}

impl From<PerformanceLabel> for QuestionStatus {
    fn from(label: PerformanceLabel) -> Self {
        match label {
            PerformanceLabel::NotAnswered => Self::NotAnswered,
            PerformanceLabel::Poor => Self::Poor,
            PerformanceLabel::Average => Self::Average,
            PerformanceLabel::Good => Self::Good,
            PerformanceLabel::VeryGood => Self::VeryGood,
            PerformanceLabel::Excellent => Self::Excellent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PenaltiesApplied {
    pub length_penalty: bool,
    pub concept_gating: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionResult {
    pub question_no: u64,
    pub question: String,
    pub marks: f64,
    pub max_marks: f64,
    pub label: PerformanceLabel,
    /// Percentage, one decimal.
    pub semantic_similarity: f64,
    pub concept_coverage: f64,
    pub covered_concepts: Vec<String>,
    pub missing_concepts: Vec<String>,
    pub required_concepts: Vec<String>,
    pub concept_analysis: Vec<ConceptAnalysis>,
    pub feedback: Feedback,
    pub status: QuestionStatus,
    pub penalties_applied: PenaltiesApplied,
    pub reason_for_marks: String,
    pub combined_score: f64,
    pub is_not_answered: bool,
    pub is_wrong_definition: bool,
    pub is_ocr_extracted: bool,
    pub ocr_quality_score: Option<f64>,
}

impl QuestionResult {
    fn not_answered(task: &AnswerTask) -> Self {
        let scoring = ScoringResult::not_answered();
        let mut weaknesses = vec![scoring.reason_for_marks.clone()];
        if task.low_ocr_quality() {
            weaknesses.push(OCR_WEAKNESS.to_string());
        }
        Self {
            question_no: task.question_no,
            question: task.question.clone(),
            marks: 0.0,
            max_marks: task.max_marks,
            label: scoring.label,
            semantic_similarity: 0.0,
            concept_coverage: 0.0,
            covered_concepts: Vec::new(),
            missing_concepts: Vec::new(),
            required_concepts: Vec::new(),
            concept_analysis: Vec::new(),
            feedback: Feedback {
                strengths: Vec::new(),
                weaknesses,
                suggestions: vec!["Please provide an answer for this question.".to_string()],
            },
            status: QuestionStatus::NotAnswered,
            penalties_applied: PenaltiesApplied::default(),
            reason_for_marks: scoring.reason_for_marks,
            combined_score: 0.0,
            is_not_answered: true,
            is_wrong_definition: false,
            is_ocr_extracted: task.is_ocr_extracted,
            ocr_quality_score: task.is_ocr_extracted.then_some(task.ocr_quality_score),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub excellent: usize,
    pub very_good: usize,
    pub good: usize,
    pub average: usize,
    pub poor: usize,
    pub not_answered: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperSummary {
    pub total_questions: usize,
    pub total_marks: f64,
    pub marks_obtained: f64,
    pub overall_percentage: f64,
    pub overall_performance: PerformanceLabel,
    pub answered_questions: usize,
    pub not_answered_questions: usize,
    pub statistics: Statistics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaperEvaluation {
    pub summary: PaperSummary,
    pub question_wise_results: Vec<QuestionResult>,
}

/// Grades a single answer. Blank or missing answers short-circuit without
/// calling any resolver.
pub async fn evaluate_answer(
    task: &AnswerTask,
    resolvers: &Resolvers,
    engine: &ScoringEngine,
) -> Result<QuestionResult, ResolverError> {
    if !task.has_student_answer || is_not_answered(&task.student_answer) {
        return Ok(QuestionResult::not_answered(task));
    }

    let model_answer = preprocess_text(&task.model_answer);
    let student_answer = preprocess_text(&task.student_answer);

    let similarity = resolvers.similarity.similarity(&model_answer, &student_answer).await?;
    let coverage = resolvers.coverage.coverage(&model_answer, &student_answer).await?;
    let required_concepts =
        resolvers.concepts.extract(&model_answer, resolvers.max_required_concepts).await?;

    let scoring = engine.score(&ScoringInput {
        semantic_similarity: similarity,
        concept_coverage: coverage.coverage,
        semantic_weight: task.semantic_weight,
        concept_weight: task.concept_weight,
        max_marks: task.max_marks,
        student_answer: student_answer.clone(),
        covered_concepts: coverage.covered_concepts.clone(),
        required_concepts: required_concepts.clone(),
        is_ocr_extracted: task.is_ocr_extracted,
        ocr_quality_score: task.ocr_quality_score,
    });

    let mut feedback = resolvers
        .feedback
        .feedback(&FeedbackRequest {
            question: task.question.clone(),
            model_answer,
            student_answer,
            missing_concepts: coverage.missing_concepts.clone(),
            marks: scoring.marks,
            max_marks: task.max_marks,
        })
        .await?;

    if task.low_ocr_quality() {
        feedback.weaknesses.push(OCR_WEAKNESS.to_string());
    }
    if scoring.is_wrong_definition {
        feedback.weaknesses.insert(0, WRONG_DEFINITION_REASON.to_string());
    }

    Ok(QuestionResult {
        question_no: task.question_no,
        question: task.question.clone(),
        marks: scoring.marks,
        max_marks: task.max_marks,
        label: scoring.label,
        semantic_similarity: round1(similarity * 100.0),
        concept_coverage: coverage.coverage,
        covered_concepts: coverage.covered_concepts,
        missing_concepts: coverage.missing_concepts,
        required_concepts,
        concept_analysis: coverage.concept_analysis,
        feedback,
        status: scoring.label.into(),
        penalties_applied: PenaltiesApplied {
            length_penalty: scoring.length_penalty_applied,
            concept_gating: scoring.concept_gating_applied,
        },
        reason_for_marks: scoring.reason_for_marks,
        combined_score: scoring.combined_score,
        is_not_answered: scoring.is_not_answered,
        is_wrong_definition: scoring.is_wrong_definition,
        is_ocr_extracted: task.is_ocr_extracted,
        ocr_quality_score: task.is_ocr_extracted.then_some(task.ocr_quality_score),
    })
}

/// Parses and grades a whole paper. Questions run concurrently, at most
/// `concurrency` at a time; results come back in parse order.
pub async fn aggregate(
    request: &PaperRequest,
    resolvers: &Resolvers,
    engine: &ScoringEngine,
    concurrency: usize,
) -> Result<PaperEvaluation, GradingError> {
    let started = Instant::now();
    let items = parse_full_paper(
        &request.questions_text,
        &request.model_answers_text,
        &request.student_answers_text,
    )?;

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut workers = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let task = AnswerTask::from_item(item, request);
        let resolvers = resolvers.clone();
        let engine = engine.clone();
        let semaphore = semaphore.clone();
        workers.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|err| GradingError::Worker(err.to_string()))?;
            let result = evaluate_answer(&task, &resolvers, &engine).await?;
            Ok::<_, GradingError>((index, result))
        });
    }

    let mut indexed = Vec::with_capacity(workers.len());
    while let Some(joined) = workers.join_next().await {
        let (index, result) = joined.map_err(|err| GradingError::Worker(err.to_string()))??;
        metrics::counter!("question_results_total", "label" => result.label.status_key())
            .increment(1);
        indexed.push((index, result));
    }
    indexed.sort_by_key(|(index, _)| *index);
    let question_wise_results: Vec<QuestionResult> =
        indexed.into_iter().map(|(_, result)| result).collect();

    let summary = summarize(
        &question_wise_results,
        request.marks_per_question,
        &OverallThresholds::default(),
    );

    let elapsed = started.elapsed().as_secs_f64();
    metrics::histogram!("paper_evaluation_duration_seconds").record(elapsed);
    tracing::info!(
        total_questions = summary.total_questions,
        marks_obtained = summary.marks_obtained,
        overall_percentage = summary.overall_percentage,
        overall_performance = %summary.overall_performance,
        elapsed_seconds = elapsed,
        "Paper evaluated"
    );

    Ok(PaperEvaluation { summary, question_wise_results })
}

/// Builds the paper summary from finished question results.
pub fn summarize(
    results: &[QuestionResult],
    marks_per_question: f64,
    thresholds: &OverallThresholds,
) -> PaperSummary {
    let total_questions = results.len();
    let total_marks = total_questions as f64 * marks_per_question;
    let marks_obtained: f64 = results.iter().map(|result| result.marks).sum();
    let overall_percentage =
        if total_marks > 0.0 { marks_obtained / total_marks * 100.0 } else { 0.0 };

    let mut statistics = Statistics::default();
    for result in results {
        let label = if result.status == QuestionStatus::NotAnswered {
            PerformanceLabel::NotAnswered
        } else {
            result.label
        };
        match label {
            PerformanceLabel::Excellent => statistics.excellent += 1,
            PerformanceLabel::VeryGood => statistics.very_good += 1,
            PerformanceLabel::Good => statistics.good += 1,
            PerformanceLabel::Average => statistics.average += 1,
            PerformanceLabel::Poor => statistics.poor += 1,
            PerformanceLabel::NotAnswered => statistics.not_answered += 1,
        }
    }

    PaperSummary {
        total_questions,
        total_marks: round1(total_marks),
        marks_obtained: round1(marks_obtained),
        overall_percentage: round1(overall_percentage),
        overall_performance: thresholds.label_for(overall_percentage),
        answered_questions: total_questions - statistics.not_answered,
        not_answered_questions: statistics.not_answered,
        statistics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(question_no: u64, marks: f64, label: PerformanceLabel) -> QuestionResult {
        let task = AnswerTask {
            question_no,
            question: format!("Question {question_no}"),
            model_answer: String::new(),
            student_answer: String::new(),
            has_student_answer: false,
            max_marks: 10.0,
            semantic_weight: 0.5,
            concept_weight: 0.5,
            is_ocr_extracted: false,
            ocr_quality_score: 100.0,
        };
        QuestionResult { marks, label, status: label.into(), ..QuestionResult::not_answered(&task) }
    }

    #[test]
    fn summary_of_mixed_paper() {
        let results = vec![
            result(1, 8.0, PerformanceLabel::VeryGood),
            result(2, 0.0, PerformanceLabel::NotAnswered),
        ];
        let summary = summarize(&results, 10.0, &OverallThresholds::default());
        assert_eq!(summary.total_questions, 2);
        assert_eq!(summary.total_marks, 20.0);
        assert_eq!(summary.marks_obtained, 8.0);
        assert_eq!(summary.overall_percentage, 40.0);
        assert_eq!(summary.overall_performance, PerformanceLabel::Average);
        assert_eq!(summary.answered_questions, 1);
        assert_eq!(summary.not_answered_questions, 1);
        assert_eq!(summary.statistics.very_good, 1);
        assert_eq!(summary.statistics.not_answered, 1);
    }

    #[test]
    fn summary_of_empty_paper() {
        let summary = summarize(&[], 10.0, &OverallThresholds::default());
        assert_eq!(summary.overall_percentage, 0.0);
        assert_eq!(summary.overall_performance, PerformanceLabel::NotAnswered);
    }

    #[test]
    fn unanswered_result_shape() {
        let unanswered = result(3, 0.0, PerformanceLabel::NotAnswered);
        assert_eq!(unanswered.feedback.weaknesses, vec!["No answer provided."]);
        assert_eq!(unanswered.status, QuestionStatus::NotAnswered);
        assert_eq!(unanswered.ocr_quality_score, None);

        let json = serde_json::to_value(&unanswered).expect("serialize");
        assert_eq!(json["label"], "Not Answered");
        assert_eq!(json["status"], "not_answered");
        assert_eq!(json["penalties_applied"]["length_penalty"], false);
    }

    #[tokio::test]
    async fn unanswered_ocr_question_notes_extraction_quality() {
        let resolvers = crate::test_support::stub_resolvers();
        let engine = ScoringEngine::default();
        let task = |quality: f64| AnswerTask {
            question_no: 2,
            question: "Define osmosis.".to_string(),
            model_answer: "Movement of water across a membrane.".to_string(),
            student_answer: String::new(),
            has_student_answer: false,
            max_marks: 10.0,
            semantic_weight: 0.5,
            concept_weight: 0.5,
            is_ocr_extracted: true,
            ocr_quality_score: quality,
        };

        let low = evaluate_answer(&task(40.0), &resolvers, &engine).await.expect("result");
        assert!(low.is_not_answered);
        assert_eq!(low.feedback.weaknesses, vec!["No answer provided.", OCR_WEAKNESS]);
        assert_eq!(low.ocr_quality_score, Some(40.0));

        let clear = evaluate_answer(&task(85.0), &resolvers, &engine).await.expect("result");
        assert_eq!(clear.feedback.weaknesses, vec!["No answer provided."]);
    }
}
