pub(crate) mod embeddings;
pub(crate) mod feedback;
pub mod lexical;
pub(crate) mod ocr_quality;

use std::sync::Arc;

use anyhow::Result;

use crate::core::config::Settings;
use crate::grading::resolvers::{Resolvers, SimilarityResolver};
use embeddings::{EmbeddingSimilarity, FallbackSimilarity};
use feedback::{FeedbackService, LlmFeedbackService};
use lexical::{ConceptCoverageService, KeyPhraseExtractor, LexicalSimilarity};

/// Which backends the resolver set ended up using.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolverBackends {
    pub(crate) embeddings: bool,
    pub(crate) llm_feedback: bool,
}

/// Wires the production resolver set: remote backends when an API key is
/// configured, each wrapped so failures degrade to the local implementations.
pub(crate) fn resolvers_from_settings(
    settings: &Settings,
) -> Result<(Resolvers, ResolverBackends)> {
    let embedding = EmbeddingSimilarity::from_settings(settings);
    let embeddings_enabled = embedding.is_configured();

    let similarity: Arc<dyn SimilarityResolver> = if embeddings_enabled {
        Arc::new(FallbackSimilarity::new(
            "embeddings",
            Arc::new(embedding),
            Arc::new(LexicalSimilarity),
        ))
    } else {
        tracing::warn!("OPENAI_API_KEY not configured; using lexical similarity");
        Arc::new(LexicalSimilarity)
    };

    let coverage = if settings.grading().concept_semantic_match {
        ConceptCoverageService::with_semantic_matching(similarity.clone())
    } else {
        ConceptCoverageService::new()
    };

    let feedback = FeedbackService::new(Some(LlmFeedbackService::from_settings(settings)?));
    let backends =
        ResolverBackends { embeddings: embeddings_enabled, llm_feedback: feedback.uses_llm() };
    if !backends.llm_feedback {
        tracing::warn!("OPENAI_API_KEY not configured; using rule-based feedback");
    }

    let resolvers = Resolvers {
        similarity,
        coverage: Arc::new(coverage),
        concepts: Arc::new(KeyPhraseExtractor),
        feedback: Arc::new(feedback),
        max_required_concepts: settings.grading().max_required_concepts,
    };

    Ok((resolvers, backends))
}
