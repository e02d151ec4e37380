use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::grading::{
    ConceptAnalysis, Feedback, MatchedItem, PaperEvaluation, PerformanceLabel, QuestionResult,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EvaluateRequest {
    #[serde(default)]
    pub(crate) question: String,
    #[serde(alias = "model_answer")]
    #[validate(length(min = 1, message = "modelAnswer must not be empty"))]
    pub(crate) model_answer: String,
    #[serde(default, alias = "student_answer")]
    pub(crate) student_answer: String,
    #[serde(alias = "max_marks")]
    #[validate(range(exclusive_min = 0.0, message = "maxMarks must be greater than 0"))]
    pub(crate) max_marks: f64,
    #[serde(default, alias = "semantic_weight")]
    #[validate(range(min = 0.0, max = 1.0, message = "semanticWeight must be between 0 and 1"))]
    pub(crate) semantic_weight: Option<f64>,
    #[serde(default, alias = "concept_weight")]
    #[validate(range(min = 0.0, max = 1.0, message = "conceptWeight must be between 0 and 1"))]
    pub(crate) concept_weight: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PenaltiesResponse {
    pub(crate) length_penalty: bool,
    pub(crate) concept_gating: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EvaluateResponse {
    pub(crate) evaluation_id: Uuid,
    pub(crate) final_score: f64,
    pub(crate) max_marks: f64,
    pub(crate) label: PerformanceLabel,
    pub(crate) semantic_similarity: f64,
    pub(crate) concept_coverage: f64,
    pub(crate) covered_concepts: Vec<String>,
    pub(crate) missing_concepts: Vec<String>,
    pub(crate) required_concepts: Vec<String>,
    pub(crate) feedback: Feedback,
    pub(crate) concept_analysis: Vec<ConceptAnalysis>,
    pub(crate) penalties_applied: PenaltiesResponse,
    pub(crate) reason_for_marks: String,
    pub(crate) combined_score: f64,
    pub(crate) is_not_answered: bool,
    pub(crate) is_wrong_definition: bool,
}

impl From<QuestionResult> for EvaluateResponse {
    fn from(result: QuestionResult) -> Self {
        Self {
            evaluation_id: Uuid::new_v4(),
            final_score: result.marks,
            max_marks: result.max_marks,
            label: result.label,
            semantic_similarity: result.semantic_similarity,
            concept_coverage: result.concept_coverage,
            covered_concepts: result.covered_concepts,
            missing_concepts: result.missing_concepts,
            required_concepts: result.required_concepts,
            feedback: result.feedback,
            concept_analysis: result.concept_analysis,
            penalties_applied: PenaltiesResponse {
                length_penalty: result.penalties_applied.length_penalty,
                concept_gating: result.penalties_applied.concept_gating,
            },
            reason_for_marks: result.reason_for_marks,
            combined_score: result.combined_score,
            is_not_answered: result.is_not_answered,
            is_wrong_definition: result.is_wrong_definition,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct FullPaperRequest {
    #[validate(length(min = 1, message = "questions must not be empty"))]
    pub(crate) questions: String,
    #[serde(alias = "modelAnswers")]
    #[validate(length(min = 1, message = "model_answers must not be empty"))]
    pub(crate) model_answers: String,
    #[serde(default, alias = "studentAnswers")]
    pub(crate) student_answers: String,
    #[serde(alias = "marksPerQuestion")]
    #[validate(range(exclusive_min = 0.0, message = "marks_per_question must be greater than 0"))]
    pub(crate) marks_per_question: f64,
    #[serde(default, alias = "semanticWeight")]
    #[validate(range(min = 0.0, max = 1.0, message = "semantic_weight must be between 0 and 1"))]
    pub(crate) semantic_weight: Option<f64>,
    #[serde(default, alias = "conceptWeight")]
    #[validate(range(min = 0.0, max = 1.0, message = "concept_weight must be between 0 and 1"))]
    pub(crate) concept_weight: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct HandwrittenPaperRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub(crate) paper: FullPaperRequest,
    #[serde(default, alias = "ocrConfidence")]
    #[validate(range(min = 0.0, max = 100.0, message = "ocr_confidence must be between 0 and 100"))]
    pub(crate) ocr_confidence: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FullPaperResponse {
    pub(crate) evaluation_id: Uuid,
    #[serde(flatten)]
    pub(crate) evaluation: PaperEvaluation,
}

#[derive(Debug, Serialize)]
pub(crate) struct HandwrittenPaperResponse {
    pub(crate) evaluation_id: Uuid,
    #[serde(flatten)]
    pub(crate) evaluation: PaperEvaluation,
    pub(crate) ocr_warning: bool,
    pub(crate) ocr_quality_score: Option<f64>,
    pub(crate) ocr_warning_message: Option<String>,
    pub(crate) is_ocr_extracted: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ParsePaperRequest {
    #[validate(length(min = 1, message = "questions must not be empty"))]
    pub(crate) questions: String,
    #[serde(alias = "modelAnswers")]
    pub(crate) model_answers: String,
    #[serde(default, alias = "studentAnswers")]
    pub(crate) student_answers: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ParsePaperResponse {
    pub(crate) total_questions: usize,
    pub(crate) answered_questions: usize,
    pub(crate) items: Vec<MatchedItem>,
}

impl From<Vec<MatchedItem>> for ParsePaperResponse {
    fn from(items: Vec<MatchedItem>) -> Self {
        Self {
            total_questions: items.len(),
            answered_questions: items.iter().filter(|item| item.has_student_answer).count(),
            items,
        }
    }
}
