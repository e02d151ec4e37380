//! Collaborator seams the aggregator calls for NLP signals.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("resolver is not configured: {0}")]
    NotConfigured(&'static str),
    #[error("resolver request failed: {0}")]
    Request(String),
    #[error("resolver returned an unexpected response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConceptStatus {
    Covered,
    Partial,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptAnalysis {
    pub concept: String,
    pub status: ConceptStatus,
    pub coverage: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Percentage in `[0, 100]`.
    pub coverage: f64,
    pub covered_concepts: Vec<String>,
    pub missing_concepts: Vec<String>,
    pub concept_analysis: Vec<ConceptAnalysis>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRequest {
    pub question: String,
    pub model_answer: String,
    pub student_answer: String,
    pub missing_concepts: Vec<String>,
    pub marks: f64,
    pub max_marks: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Feedback {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
}

#[async_trait]
pub trait SimilarityResolver: Send + Sync {
    /// Similarity of two texts in `[0, 1]`.
    async fn similarity(&self, left: &str, right: &str) -> Result<f64, ResolverError>;
}

#[async_trait]
pub trait CoverageResolver: Send + Sync {
    async fn coverage(&self, model: &str, student: &str) -> Result<CoverageReport, ResolverError>;
}

#[async_trait]
pub trait ConceptExtractor: Send + Sync {
    async fn extract(&self, text: &str, max_concepts: usize) -> Result<Vec<String>, ResolverError>;
}

#[async_trait]
pub trait FeedbackResolver: Send + Sync {
    async fn feedback(&self, request: &FeedbackRequest) -> Result<Feedback, ResolverError>;
}

/// The resolver set one evaluation runs against.
#[derive(Clone)]
pub struct Resolvers {
    pub similarity: Arc<dyn SimilarityResolver>,
    pub coverage: Arc<dyn CoverageResolver>,
    pub concepts: Arc<dyn ConceptExtractor>,
    pub feedback: Arc<dyn FeedbackResolver>,
    pub max_required_concepts: usize,
}

impl std::fmt::Debug for Resolvers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolvers")
            .field("max_required_concepts", &self.max_required_concepts)
            .finish_non_exhaustive()
    }
}
