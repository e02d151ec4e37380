use axum::{extract::State, routing::post, Json, Router};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::validation::{require_text, validate_weights};
use crate::core::state::AppState;
use crate::grading::{aggregate, evaluate_answer, AnswerTask, PaperEvaluation, PaperRequest};
use crate::schemas::evaluation::{
    EvaluateRequest, EvaluateResponse, FullPaperRequest, FullPaperResponse,
    HandwrittenPaperRequest, HandwrittenPaperResponse,
};
use crate::services::ocr_quality::assess_ocr_quality;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(evaluate_single))
        .route("/full-paper", post(evaluate_full_paper))
        .route("/full-paper/handwritten", post(evaluate_handwritten_paper))
}

fn resolve_weights(
    state: &AppState,
    semantic: Option<f64>,
    concept: Option<f64>,
) -> Result<(f64, f64), ApiError> {
    let grading = state.settings().grading();
    let semantic = semantic.unwrap_or(grading.default_semantic_weight);
    let concept = concept.unwrap_or(grading.default_concept_weight);
    validate_weights(semantic, concept)?;
    Ok((semantic, concept))
}

async fn evaluate_single(
    State(state): State<AppState>,
    Json(payload): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    require_text(&payload.model_answer, "modelAnswer")?;
    let (semantic_weight, concept_weight) =
        resolve_weights(&state, payload.semantic_weight, payload.concept_weight)?;

    let task = AnswerTask {
        question_no: 1,
        question: payload.question,
        model_answer: payload.model_answer,
        has_student_answer: !payload.student_answer.trim().is_empty(),
        student_answer: payload.student_answer,
        max_marks: payload.max_marks,
        semantic_weight,
        concept_weight,
        is_ocr_extracted: false,
        ocr_quality_score: 100.0,
    };

    let result = evaluate_answer(&task, state.resolvers(), state.engine())
        .await
        .map_err(|e| ApiError::internal(e, "Evaluation failed"))?;
    metrics::counter!("evaluations_total", "mode" => "single").increment(1);

    let response = EvaluateResponse::from(result);
    tracing::info!(
        evaluation_id = %response.evaluation_id,
        marks = response.final_score,
        max_marks = response.max_marks,
        label = %response.label,
        "Answer evaluated"
    );
    Ok(Json(response))
}

async fn run_paper(
    state: &AppState,
    payload: FullPaperRequest,
    is_ocr_extracted: bool,
    ocr_quality_score: f64,
) -> Result<PaperEvaluation, ApiError> {
    let (semantic_weight, concept_weight) =
        resolve_weights(state, payload.semantic_weight, payload.concept_weight)?;

    let request = PaperRequest {
        questions_text: payload.questions,
        model_answers_text: payload.model_answers,
        student_answers_text: payload.student_answers,
        marks_per_question: payload.marks_per_question,
        semantic_weight,
        concept_weight,
        is_ocr_extracted,
        ocr_quality_score,
    };

    let evaluation = aggregate(
        &request,
        state.resolvers(),
        state.engine(),
        state.settings().grading().worker_concurrency,
    )
    .await?;
    Ok(evaluation)
}

async fn evaluate_full_paper(
    State(state): State<AppState>,
    Json(payload): Json<FullPaperRequest>,
) -> Result<Json<FullPaperResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let evaluation = run_paper(&state, payload, false, 100.0).await?;
    metrics::counter!("evaluations_total", "mode" => "full_paper").increment(1);

    Ok(Json(FullPaperResponse { evaluation_id: Uuid::new_v4(), evaluation }))
}

async fn evaluate_handwritten_paper(
    State(state): State<AppState>,
    Json(payload): Json<HandwrittenPaperRequest>,
) -> Result<Json<HandwrittenPaperResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let quality = assess_ocr_quality(&payload.paper.student_answers, payload.ocr_confidence);
    if quality.needs_warning {
        tracing::warn!(
            quality_score = quality.quality_score,
            reasons = ?quality.warning_reasons,
            "Low OCR quality for handwritten paper"
        );
    }

    let evaluation = run_paper(&state, payload.paper, true, quality.quality_score).await?;
    metrics::counter!("evaluations_total", "mode" => "handwritten").increment(1);

    Ok(Json(HandwrittenPaperResponse {
        evaluation_id: Uuid::new_v4(),
        evaluation,
        ocr_warning: quality.needs_warning,
        ocr_quality_score: Some(quality.quality_score),
        ocr_warning_message: quality.warning_message(),
        is_ocr_extracted: true,
    }))
}
