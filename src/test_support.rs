use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::core::{config::Settings, state::AppState};
use crate::grading::{
    ConceptAnalysis, ConceptExtractor, ConceptStatus, CoverageReport, CoverageResolver, Feedback,
    FeedbackRequest, FeedbackResolver, ResolverError, Resolvers, ScoringEngine,
    SimilarityResolver,
};
use crate::services::ResolverBackends;

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("DESEVA_ENV", "test");
    std::env::set_var("DESEVA_STRICT_CONFIG", "0");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    for key in [
        "DESEVA_HOST",
        "DESEVA_PORT",
        "OPENAI_API_KEY",
        "FEEDBACK_MODEL",
        "API_V1_STR",
        "PROJECT_NAME",
        "BACKEND_CORS_ORIGINS",
        "DEFAULT_SEMANTIC_WEIGHT",
        "DEFAULT_CONCEPT_WEIGHT",
        "MAX_REQUIRED_CONCEPTS",
        "GRADING_WORKER_CONCURRENCY",
        "CONCEPT_SEMANTIC_MATCH",
    ] {
        std::env::remove_var(key);
    }
}

/// Similarity resolver that ignores its input.
pub(crate) struct FixedSimilarity(pub(crate) f64);

#[async_trait]
impl SimilarityResolver for FixedSimilarity {
    async fn similarity(&self, _left: &str, _right: &str) -> Result<f64, ResolverError> {
        Ok(self.0)
    }
}

/// Reports every listed concept as covered.
pub(crate) struct FixedCoverage(pub(crate) Vec<String>);

#[async_trait]
impl CoverageResolver for FixedCoverage {
    async fn coverage(
        &self,
        _model: &str,
        _student: &str,
    ) -> Result<CoverageReport, ResolverError> {
        Ok(CoverageReport {
            coverage: if self.0.is_empty() { 0.0 } else { 100.0 },
            covered_concepts: self.0.clone(),
            missing_concepts: Vec::new(),
            concept_analysis: self
                .0
                .iter()
                .map(|concept| ConceptAnalysis {
                    concept: concept.clone(),
                    status: ConceptStatus::Covered,
                    coverage: 100.0,
                })
                .collect(),
        })
    }
}

pub(crate) struct FixedConcepts(pub(crate) Vec<String>);

#[async_trait]
impl ConceptExtractor for FixedConcepts {
    async fn extract(
        &self,
        _text: &str,
        max_concepts: usize,
    ) -> Result<Vec<String>, ResolverError> {
        Ok(self.0.iter().take(max_concepts).cloned().collect())
    }
}

pub(crate) struct CannedFeedback;

#[async_trait]
impl FeedbackResolver for CannedFeedback {
    async fn feedback(&self, _request: &FeedbackRequest) -> Result<Feedback, ResolverError> {
        Ok(Feedback {
            strengths: vec!["Clear explanation.".to_string()],
            weaknesses: vec!["Could add an example.".to_string()],
            suggestions: vec!["Review the key terms.".to_string()],
        })
    }
}

/// Resolvers that rate every answer as a strong match on one concept.
pub(crate) fn stub_resolvers() -> Resolvers {
    let concepts = vec!["energy".to_string()];
    Resolvers {
        similarity: Arc::new(FixedSimilarity(0.95)),
        coverage: Arc::new(FixedCoverage(concepts.clone())),
        concepts: Arc::new(FixedConcepts(concepts)),
        feedback: Arc::new(CannedFeedback),
        max_required_concepts: 15,
    }
}

pub(crate) fn stub_state(settings: Settings) -> AppState {
    AppState::new(
        settings,
        stub_resolvers(),
        ResolverBackends { embeddings: false, llm_feedback: false },
        ScoringEngine::default(),
    )
}

pub(crate) fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    let bytes = serde_json::to_vec(&body).expect("serialize body");
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .expect("request body")
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
