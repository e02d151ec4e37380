use std::collections::BTreeSet;

/// Decides whether a covered concept satisfies a required one.
///
/// Both arguments arrive lowercased and trimmed.
pub trait ConceptMatcher: Send + Sync {
    fn matches(&self, required: &str, covered: &str) -> bool;
}

/// Loose containment in either direction: `"cell"` satisfies `"cell wall"`
/// and vice versa.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl ConceptMatcher for SubstringMatcher {
    fn matches(&self, required: &str, covered: &str) -> bool {
        required.contains(covered) || covered.contains(required)
    }
}

fn normalized_set(concepts: &[String]) -> BTreeSet<String> {
    concepts
        .iter()
        .map(|concept| concept.trim().to_lowercase())
        .filter(|concept| !concept.is_empty())
        .collect()
}

/// Fraction of distinct required concepts matched by at least one covered
/// concept. `None` when nothing is required, meaning gating does not apply.
pub fn matched_fraction(
    matcher: &dyn ConceptMatcher,
    required: &[String],
    covered: &[String],
) -> Option<f64> {
    let required = normalized_set(required);
    if required.is_empty() {
        return None;
    }
    let covered = normalized_set(covered);

    let matched = required
        .iter()
        .filter(|req| covered.iter().any(|cov| matcher.matches(req, cov)))
        .count();

    Some(matched as f64 / required.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn substring_matches_both_directions() {
        let matcher = SubstringMatcher;
        assert!(matcher.matches("cell wall", "cell"));
        assert!(matcher.matches("cell", "cell wall"));
        assert!(!matcher.matches("nucleus", "membrane"));
    }

    #[test]
    fn fraction_is_case_insensitive_and_deduplicated() {
        let required = owned(&["Chlorophyll", "chlorophyll ", "Sunlight", "glucose", "oxygen"]);
        let covered = owned(&["SUNLIGHT", "chlorophyll pigment"]);
        let fraction = matched_fraction(&SubstringMatcher, &required, &covered).expect("gated");
        assert!((fraction - 0.5).abs() < 1e-9);
    }

    #[test]
    fn no_required_concepts_means_no_gating() {
        assert_eq!(matched_fraction(&SubstringMatcher, &[], &owned(&["x"])), None);
        assert_eq!(matched_fraction(&SubstringMatcher, &owned(&["  "]), &[]), None);
    }

    #[test]
    fn custom_matcher_replaces_substring_rule() {
        struct Exact;
        impl ConceptMatcher for Exact {
            fn matches(&self, required: &str, covered: &str) -> bool {
                required == covered
            }
        }
        let fraction =
            matched_fraction(&Exact, &owned(&["cell wall"]), &owned(&["cell"])).expect("gated");
        assert_eq!(fraction, 0.0);
    }
}
