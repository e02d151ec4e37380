use axum::{routing::post, Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::grading::parse_full_paper;
use crate::schemas::evaluation::{ParsePaperRequest, ParsePaperResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/parse", post(parse_paper))
}

/// Shows how a paper will be split and matched, without grading it.
async fn parse_paper(
    Json(payload): Json<ParsePaperRequest>,
) -> Result<Json<ParsePaperResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let items =
        parse_full_paper(&payload.questions, &payload.model_answers, &payload.student_answers)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(Json(ParsePaperResponse::from(items)))
}
