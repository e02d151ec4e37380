//! Grading core: paper parsing, the not-answered detector, the scoring rule
//! engine and the paper aggregator.
//!
//! Everything in here is pure over its inputs except [`aggregate`], which
//! drives injected [`resolvers`] for the NLP signals it needs.

pub mod aggregate;
pub mod concepts;
pub mod detector;
pub mod engine;
pub mod labels;
pub mod parser;
mod reason;
pub mod resolvers;
pub mod text;

pub use aggregate::{
    aggregate, evaluate_answer, summarize, AnswerTask, GradingError, PaperEvaluation,
    PaperRequest, PaperSummary, PenaltiesApplied, QuestionResult, QuestionStatus, Statistics,
};
pub use concepts::{ConceptMatcher, SubstringMatcher};
pub use detector::{count_all_words, count_words, is_not_answered};
pub use engine::{score, ScoringEngine, ScoringInput, ScoringResult};
pub use labels::{LabelThresholds, OverallThresholds, PerformanceLabel};
pub use parser::{match_items, parse_entries, parse_full_paper, Entry, MatchedItem, ParseError};
pub use resolvers::{
    ConceptAnalysis, ConceptExtractor, ConceptStatus, CoverageReport, CoverageResolver, Feedback,
    FeedbackRequest, FeedbackResolver, ResolverError, Resolvers, SimilarityResolver,
};

/// Rounds to one decimal place, half away from zero.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
