const MAX_CLAUSES: usize = 2;
const GENERIC_REASON: &str = "Answer evaluated based on semantic similarity and concept coverage.";
const ZERO_MARKS_REASON: &str = "No meaningful content or completely incorrect.";

pub(super) struct ReasonContext {
    pub marks: f64,
    pub semantic_similarity: f64,
    pub concept_coverage: f64,
    /// Same count the length ceiling was chosen with.
    pub word_count: usize,
    pub covered_count: usize,
    pub required_count: usize,
    pub length_penalty_applied: bool,
    pub concept_gating_applied: bool,
}

fn length_clause(ctx: &ReasonContext) -> Option<&'static str> {
    if !ctx.length_penalty_applied {
        return None;
    }
    Some(match ctx.word_count {
        0..=5 => "Answer too brief to demonstrate understanding",
        6..=9 => "Answer is too short",
        _ => "Answer length insufficient",
    })
}

fn concept_clause(ctx: &ReasonContext) -> Option<&'static str> {
    if !ctx.concept_gating_applied {
        return None;
    }
    if ctx.covered_count == 0 {
        return Some("No key concepts mentioned");
    }
    if ctx.required_count == 0 {
        return None;
    }
    let covered_pct = ctx.covered_count as f64 / ctx.required_count as f64 * 100.0;
    if covered_pct < 50.0 {
        Some("Key concepts missing")
    } else {
        Some("Some key concepts missing")
    }
}

fn quality_clause(ctx: &ReasonContext) -> &'static str {
    match ctx.semantic_similarity {
        s if s < 0.3 => "Answer does not match expected content",
        s if s < 0.5 => "Partial understanding demonstrated",
        s if s < 0.7 => "Core idea mentioned but details missing",
        _ if ctx.concept_coverage < 50.0 => "Core idea correct but key terms missing",
        _ if ctx.concept_coverage < 70.0 => "Good understanding with minor gaps",
        _ => "Comprehensive answer with good understanding",
    }
}

/// Short explanation for a scored answer: length, then concept, then
/// quality clauses, first two kept.
pub(super) fn reason_for_marks(ctx: &ReasonContext) -> String {
    if ctx.marks == 0.0 {
        return ZERO_MARKS_REASON.to_string();
    }

    let clauses: Vec<&str> = [length_clause(ctx), concept_clause(ctx), Some(quality_clause(ctx))]
        .into_iter()
        .flatten()
        .take(MAX_CLAUSES)
        .collect();

    if clauses.is_empty() {
        return GENERIC_REASON.to_string();
    }
    format!("{}.", clauses.join(". "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ReasonContext {
        ReasonContext {
            marks: 6.5,
            semantic_similarity: 0.8,
            concept_coverage: 80.0,
            word_count: 30,
            covered_count: 4,
            required_count: 4,
            length_penalty_applied: false,
            concept_gating_applied: false,
        }
    }

    #[test]
    fn zero_marks_short_circuits() {
        let ctx = ReasonContext { marks: 0.0, ..context() };
        assert_eq!(reason_for_marks(&ctx), ZERO_MARKS_REASON);
    }

    #[test]
    fn quality_clause_alone() {
        assert_eq!(reason_for_marks(&context()), "Comprehensive answer with good understanding.");
        let ctx = ReasonContext { semantic_similarity: 0.4, ..context() };
        assert_eq!(reason_for_marks(&ctx), "Partial understanding demonstrated.");
        let ctx = ReasonContext { concept_coverage: 60.0, ..context() };
        assert_eq!(reason_for_marks(&ctx), "Good understanding with minor gaps.");
    }

    #[test]
    fn keeps_at_most_two_clauses_in_priority_order() {
        let ctx = ReasonContext {
            word_count: 7,
            covered_count: 1,
            required_count: 5,
            length_penalty_applied: true,
            concept_gating_applied: true,
            semantic_similarity: 0.1,
            ..context()
        };
        assert_eq!(reason_for_marks(&ctx), "Answer is too short. Key concepts missing.");
    }

    #[test]
    fn no_concepts_mentioned() {
        let ctx = ReasonContext { covered_count: 0, concept_gating_applied: true, ..context() };
        assert_eq!(
            reason_for_marks(&ctx),
            "No key concepts mentioned. Comprehensive answer with good understanding."
        );
    }
}
