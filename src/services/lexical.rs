use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::grading::resolvers::{
    ConceptAnalysis, ConceptExtractor, ConceptStatus, CoverageReport, CoverageResolver,
    ResolverError, SimilarityResolver,
};
use crate::grading::round1;
use crate::grading::text::{clean_text, extract_key_phrases, is_stop_word, tokens};

const COVERAGE_CONCEPTS: usize = 15;
const MIN_PHRASE_LENGTH: usize = 3;
const MIN_BIGRAM_LENGTH: usize = 6;
const SEMANTIC_PRESENT: f64 = 0.5;
const SEMANTIC_COVERED: f64 = 0.7;

/// Cosine similarity of term-frequency vectors. Works offline and is the
/// fallback whenever the embedding backend is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalSimilarity;

impl LexicalSimilarity {
    pub fn score(left: &str, right: &str) -> f64 {
        let left = term_frequencies(left);
        let right = term_frequencies(right);
        if left.is_empty() || right.is_empty() {
            return 0.0;
        }

        let dot: f64 = left
            .iter()
            .filter_map(|(term, count)| right.get(term).map(|other| count * other))
            .sum();
        let norm =
            |counts: &HashMap<String, f64>| counts.values().map(|c| c * c).sum::<f64>().sqrt();
        let denominator = norm(&left) * norm(&right);
        if denominator == 0.0 {
            0.0
        } else {
            (dot / denominator).clamp(0.0, 1.0)
        }
    }
}

fn term_frequencies(text: &str) -> HashMap<String, f64> {
    let mut counts = HashMap::new();
    for token in tokens(text).into_iter().filter(|token| !is_stop_word(token)) {
        *counts.entry(token).or_insert(0.0) += 1.0;
    }
    counts
}

#[async_trait]
impl SimilarityResolver for LexicalSimilarity {
    async fn similarity(&self, left: &str, right: &str) -> Result<f64, ResolverError> {
        Ok(Self::score(left, right))
    }
}

/// Concepts as key phrases, topped up with adjacent-word bigrams.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyPhraseExtractor;

impl KeyPhraseExtractor {
    pub fn concepts(text: &str, max_concepts: usize) -> Vec<String> {
        if text.trim().is_empty() || max_concepts == 0 {
            return Vec::new();
        }

        let mut concepts = extract_key_phrases(text, MIN_PHRASE_LENGTH);
        concepts.truncate(max_concepts);

        let cleaned = clean_text(text);
        let words: Vec<&str> = cleaned.split_whitespace().collect();
        for pair in words.windows(2) {
            if concepts.len() >= max_concepts {
                break;
            }
            let phrase = format!("{} {}", pair[0], pair[1]);
            if phrase.chars().count() >= MIN_BIGRAM_LENGTH && !concepts.contains(&phrase) {
                concepts.push(phrase);
            }
        }

        concepts
    }
}

#[async_trait]
impl ConceptExtractor for KeyPhraseExtractor {
    async fn extract(&self, text: &str, max_concepts: usize) -> Result<Vec<String>, ResolverError> {
        Ok(Self::concepts(text, max_concepts))
    }
}

/// Checks each model-answer concept against the student answer.
///
/// With a semantic resolver attached, concepts that are not found lexically
/// get a second chance through similarity.
#[derive(Clone, Default)]
pub struct ConceptCoverageService {
    semantic: Option<Arc<dyn SimilarityResolver>>,
}

impl ConceptCoverageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_semantic_matching(semantic: Arc<dyn SimilarityResolver>) -> Self {
        Self { semantic: Some(semantic) }
    }

    async fn presence(&self, concept: &str, student: &str) -> ConceptAnalysis {
        let concept_lower = concept.to_lowercase();
        let student_lower = student.to_lowercase();
        let analysis = |status, coverage: f64| ConceptAnalysis {
            concept: concept.to_string(),
            status,
            coverage: round1(coverage),
        };

        if student_lower.contains(&concept_lower) {
            return analysis(ConceptStatus::Covered, 100.0);
        }

        let words: Vec<&str> = concept_lower.split_whitespace().collect();
        if words.len() > 1 {
            let found = words.iter().filter(|word| student_lower.contains(**word)).count();
            let word_coverage = found as f64 / words.len() as f64 * 100.0;
            if word_coverage >= 80.0 {
                return analysis(ConceptStatus::Covered, word_coverage);
            }
            if word_coverage >= 50.0 {
                return analysis(ConceptStatus::Partial, word_coverage);
            }
        }

        if let Some(semantic) = &self.semantic {
            match semantic.similarity(concept, student).await {
                Ok(similarity) if similarity >= SEMANTIC_PRESENT => {
                    let status = if similarity >= SEMANTIC_COVERED {
                        ConceptStatus::Covered
                    } else {
                        ConceptStatus::Partial
                    };
                    return analysis(status, similarity * 100.0);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, concept, "Semantic concept matching failed");
                }
            }
        }

        analysis(ConceptStatus::Missing, 0.0)
    }
}

#[async_trait]
impl CoverageResolver for ConceptCoverageService {
    async fn coverage(&self, model: &str, student: &str) -> Result<CoverageReport, ResolverError> {
        if model.trim().is_empty() || student.trim().is_empty() {
            return Ok(CoverageReport::default());
        }

        let concepts = KeyPhraseExtractor::concepts(model, COVERAGE_CONCEPTS);
        if concepts.is_empty() {
            return Ok(CoverageReport::default());
        }

        let mut report = CoverageReport::default();
        let mut total = 0.0;
        for concept in &concepts {
            let analysis = self.presence(concept, student).await;
            if analysis.status == ConceptStatus::Missing {
                report.missing_concepts.push(concept.clone());
            } else {
                total += analysis.coverage;
                report.covered_concepts.push(concept.clone());
            }
            report.concept_analysis.push(analysis);
        }
        report.coverage = round1(total / concepts.len() as f64);

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexical_similarity_bounds() {
        assert_eq!(LexicalSimilarity::score("", "anything here"), 0.0);
        let same = LexicalSimilarity::score("plants make glucose", "Plants make glucose!");
        assert!((same - 1.0).abs() < 1e-9);
        let disjoint = LexicalSimilarity::score("plants make glucose", "rivers carry sediment");
        assert_eq!(disjoint, 0.0);
        let partial = LexicalSimilarity::score("plants make glucose", "plants need water");
        assert!(partial > 0.0 && partial < 1.0);
    }

    #[test]
    fn extractor_tops_up_with_bigrams() {
        let concepts = KeyPhraseExtractor::concepts("Plants use light energy", 6);
        assert_eq!(
            concepts,
            vec!["plants", "use", "light", "energy", "plants use", "use light"]
        );
        assert_eq!(
            KeyPhraseExtractor::concepts("Plants use light energy", 2),
            vec!["plants", "use"]
        );
        assert!(KeyPhraseExtractor::concepts("   ", 5).is_empty());
    }

    #[tokio::test]
    async fn coverage_reports_each_concept() {
        let service = ConceptCoverageService::new();
        let report = service
            .coverage("chlorophyll absorbs sunlight", "sunlight is absorbed by leaves")
            .await
            .expect("coverage");

        assert!(report.covered_concepts.contains(&"sunlight".to_string()));
        assert!(report.missing_concepts.contains(&"chlorophyll".to_string()));
        assert_eq!(
            report.concept_analysis.len(),
            report.covered_concepts.len() + report.missing_concepts.len()
        );
        assert!(report.coverage > 0.0 && report.coverage < 100.0);
    }

    #[tokio::test]
    async fn semantic_matching_rescues_missing_concepts() {
        struct Always(f64);
        #[async_trait]
        impl SimilarityResolver for Always {
            async fn similarity(&self, _: &str, _: &str) -> Result<f64, ResolverError> {
                Ok(self.0)
            }
        }

        let service = ConceptCoverageService::with_semantic_matching(Arc::new(Always(0.6)));
        let report = service.coverage("osmosis", "water moves across").await.expect("coverage");
        assert_eq!(report.covered_concepts, vec!["osmosis"]);
        assert_eq!(report.concept_analysis[0].status, ConceptStatus::Partial);
        assert_eq!(report.coverage, 60.0);
    }

    #[tokio::test]
    async fn blank_inputs_have_no_coverage() {
        let report = ConceptCoverageService::new().coverage("", "answer").await.expect("coverage");
        assert_eq!(report, CoverageReport::default());
    }
}
