//! Query analysis (phase 1)
//!
//! Pure classification of a query into a [`ResearchPlan`]. Matching is
//! case-insensitive substring search against fixed tables; the first
//! category whose keywords match wins.

use super::types::{ResearchCategory, ResearchPlan};
use crate::constants::research::EXPECTED_SOURCES;
use crate::types::{ResearchError, Result};

/// Category keyword buckets, in priority order
const CATEGORY_KEYWORDS: &[(ResearchCategory, &[&str])] = &[
    (
        ResearchCategory::Philosophical,
        &["meaning", "purpose", "philosophy", "existence"],
    ),
    (
        ResearchCategory::Technical,
        &["technology", "science", "research"],
    ),
    (ResearchCategory::Historical, &["history", "historical", "past"]),
];

/// Concept vocabulary, in output order
const CONCEPT_KEYWORDS: &[(&str, &[&str])] = &[
    ("meaning", &["meaning", "purpose", "significance"]),
    ("life", &["life", "existence", "being"]),
    ("philosophy", &["philosophy", "philosophical", "ethics"]),
    ("science", &["science", "scientific", "research"]),
    ("technology", &["technology", "tech", "innovation"]),
];

const FALLBACK_CONCEPT: &str = "general";

/// Build a research plan from a query.
///
/// Fails only when the query is empty or whitespace.
pub fn analyze_query(query: &str) -> Result<ResearchPlan> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ResearchError::InvalidQuery(
            "query must not be empty".to_string(),
        ));
    }

    let lower = query.to_lowercase();

    Ok(ResearchPlan {
        query: query.to_string(),
        category: classify(&lower),
        key_concepts: extract_concepts(&lower),
        search_strategies: search_strategies(query),
        expected_sources: EXPECTED_SOURCES.iter().map(|s| s.to_string()).collect(),
    })
}

fn classify(lower: &str) -> ResearchCategory {
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(category, _)| *category)
        .unwrap_or(ResearchCategory::General)
}

fn extract_concepts(lower: &str) -> Vec<String> {
    let concepts: Vec<String> = CONCEPT_KEYWORDS
        .iter()
        .filter(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(concept, _)| concept.to_string())
        .collect();

    if concepts.is_empty() {
        vec![FALLBACK_CONCEPT.to_string()]
    } else {
        concepts
    }
}

fn search_strategies(query: &str) -> Vec<String> {
    vec![
        format!("\"{}\"", query),
        format!("{} research", query),
        format!("{} analysis", query),
        format!("{} overview", query),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_meaning_of_life_is_philosophical() {
        let plan = analyze_query("What is the meaning of life?").unwrap();
        assert_eq!(plan.category, ResearchCategory::Philosophical);
        assert!(plan.key_concepts.contains(&"meaning".to_string()));
        assert!(plan.key_concepts.contains(&"life".to_string()));
    }

    #[test]
    fn test_ai_research_is_technical() {
        let plan = analyze_query("Latest developments in AI research").unwrap();
        assert_eq!(plan.category, ResearchCategory::Technical);
        assert_eq!(plan.key_concepts, vec!["science"]);
    }

    #[test]
    fn test_historical_and_general() {
        assert_eq!(
            analyze_query("A history of Roman roads").unwrap().category,
            ResearchCategory::Historical
        );
        let plan = analyze_query("Best sourdough hydration").unwrap();
        assert_eq!(plan.category, ResearchCategory::General);
        assert_eq!(plan.key_concepts, vec!["general"]);
    }

    #[test]
    fn test_first_bucket_wins() {
        // "purpose" (philosophical) beats "science" (technical)
        let plan = analyze_query("The purpose of science").unwrap();
        assert_eq!(plan.category, ResearchCategory::Philosophical);
        assert_eq!(plan.key_concepts, vec!["meaning", "science"]);
    }

    #[test]
    fn test_case_insensitive() {
        let plan = analyze_query("PHILOSOPHY OF TECHNOLOGY").unwrap();
        assert_eq!(plan.category, ResearchCategory::Philosophical);
        assert_eq!(plan.key_concepts, vec!["philosophy", "technology"]);
    }

    #[test]
    fn test_strategies_and_sources() {
        let plan = analyze_query("quantum computing").unwrap();
        assert_eq!(
            plan.search_strategies,
            vec![
                "\"quantum computing\"",
                "quantum computing research",
                "quantum computing analysis",
                "quantum computing overview",
            ]
        );
        assert_eq!(
            plan.expected_sources,
            vec!["academic", "web", "books", "reports"]
        );
    }

    #[test]
    fn test_empty_query_rejected() {
        assert!(matches!(
            analyze_query(""),
            Err(ResearchError::InvalidQuery(_))
        ));
        assert!(matches!(
            analyze_query("   \t\n"),
            Err(ResearchError::InvalidQuery(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_analyze_query_is_deterministic(query in "[a-zA-Z ?]{1,60}") {
            let first = analyze_query(&query);
            let second = analyze_query(&query);
            match (first, second) {
                (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
                (Err(_), Err(_)) => prop_assert!(query.trim().is_empty()),
                _ => prop_assert!(false, "outcomes diverged"),
            }
        }

        #[test]
        fn prop_concepts_never_empty(query in "\\PC{1,80}") {
            if let Ok(plan) = analyze_query(&query) {
                prop_assert!(!plan.key_concepts.is_empty());
                prop_assert_eq!(plan.search_strategies.len(), 4);
            }
        }
    }
}
