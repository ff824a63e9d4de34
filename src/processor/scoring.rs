//! Unified relevance scoring (§4.2): five bounded, additive contributions
//! summed and clamped to `[0, 1]`.

use std::collections::HashSet;

use chrono::Utc;

use crate::types::{normalize_surname, DiscoveredPaper, SourcePaper};

const PROVIDER_RELEVANCE_CAP: f64 = 0.4;
const CITATION_INFLUENCE_CAP: f64 = 0.25;
const RECENCY_WEIGHT: f64 = 0.15;
const AUTHOR_OVERLAP_WEIGHT: f64 = 0.1;
const OPEN_ACCESS_BONUS: f64 = 0.05;

fn provider_relevance_contribution(paper: &DiscoveredPaper) -> f64 {
    (PROVIDER_RELEVANCE_CAP * paper.provider_relevance).min(PROVIDER_RELEVANCE_CAP)
}

fn citation_influence_contribution(paper: &DiscoveredPaper) -> f64 {
    let count = paper.citation_count.unwrap_or(0) as f64;
    (count / 1000.0).min(CITATION_INFLUENCE_CAP)
}

fn recency_contribution(paper: &DiscoveredPaper) -> f64 {
    let Some(date) = paper.publication_date else {
        return 0.0;
    };
    let years_old = (Utc::now().date_naive() - date).num_days() as f64 / 365.25;
    ((10.0 - years_old) / 10.0).max(0.0) * RECENCY_WEIGHT
}

fn author_overlap_contribution(paper: &DiscoveredPaper, source_paper: &SourcePaper) -> f64 {
    if source_paper.authors.is_empty() {
        return 0.0;
    }
    let source_surnames: HashSet<String> = source_paper
        .authors
        .iter()
        .map(|a| normalize_surname(a))
        .collect();
    let paper_surnames: HashSet<String> = paper.authors.iter().map(|a| normalize_surname(a)).collect();
    let overlap = source_surnames.intersection(&paper_surnames).count();
    (overlap as f64 / source_paper.authors.len() as f64) * AUTHOR_OVERLAP_WEIGHT
}

fn open_access_contribution(paper: &DiscoveredPaper) -> f64 {
    if paper.open_access {
        OPEN_ACCESS_BONUS
    } else {
        0.0
    }
}

/// Compute the unified relevance score for one candidate, per the §4.2
/// factor table. `feedback_bias` is the optional additive bias from §6
/// (`[-0.05, +0.05]`); pass `0.0` when feedback is not configured.
pub fn unified_score(paper: &DiscoveredPaper, source_paper: &SourcePaper, feedback_bias: f64) -> f64 {
    let sum = provider_relevance_contribution(paper)
        + citation_influence_contribution(paper)
        + recency_contribution(paper)
        + author_overlap_contribution(paper, source_paper)
        + open_access_contribution(paper)
        + feedback_bias.clamp(-0.05, 0.05);
    sum.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiscoverySource, RelationshipType};
    use chrono::NaiveDate;

    fn base_paper() -> DiscoveredPaper {
        DiscoveredPaper {
            doi: None,
            source_ids: Default::default(),
            title: "Graph Neural Networks".to_string(),
            authors: vec!["A. Lee".to_string()],
            abstract_text: None,
            publication_date: None,
            publication_year: None,
            journal: None,
            primary_topic: None,
            citation_count: None,
            influential_citation_count: None,
            reference_count: None,
            open_access: false,
            provider_relevance: 0.5,
            relevance_score: 0.0,
            source_reliability: 0.9,
            data_completeness: 0.4,
            discovery_source: DiscoverySource::CitationRegistry,
            relationship_type: RelationshipType::SemanticSimilarity,
            metadata: Default::default(),
        }
    }

    fn base_source() -> SourcePaper {
        SourcePaper {
            id: "p1".to_string(),
            title: "Graph Neural Networks".to_string(),
            authors: vec!["A. Lee".to_string(), "B. Kim".to_string()],
            doi: None,
            arxiv_id: None,
            semantic_corpus_id: None,
            abstract_text: None,
            publication_year: Some(2021),
        }
    }

    // === bounds ===

    #[test]
    fn score_is_always_in_unit_interval() {
        let mut paper = base_paper();
        paper.provider_relevance = 1.0;
        paper.citation_count = Some(100_000);
        paper.open_access = true;
        paper.publication_date = Some(Utc::now().date_naive());
        let score = unified_score(&paper, &base_source(), 0.05);
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn zero_contributions_yield_zero_score() {
        let paper = base_paper();
        let source = SourcePaper {
            authors: vec![],
            ..base_source()
        };
        let score = unified_score(&paper, &source, 0.0);
        assert!((score - provider_relevance_contribution(&paper)).abs() < 1e-9);
    }

    // === individual factors ===

    #[test]
    fn provider_relevance_caps_at_0_4() {
        let mut paper = base_paper();
        paper.provider_relevance = 10.0; // clamped upstream normally, defend here too
        assert!(provider_relevance_contribution(&paper) <= 0.4);
    }

    #[test]
    fn citation_influence_caps_at_0_25() {
        let mut paper = base_paper();
        paper.citation_count = Some(1_000_000);
        assert_eq!(citation_influence_contribution(&paper), 0.25);
    }

    #[test]
    fn missing_date_gives_zero_recency() {
        let paper = base_paper();
        assert_eq!(recency_contribution(&paper), 0.0);
    }

    #[test]
    fn recent_paper_scores_higher_recency_than_old_paper() {
        let mut recent = base_paper();
        recent.publication_date = Some(Utc::now().date_naive());
        let mut old = base_paper();
        old.publication_date = NaiveDate::from_ymd_opt(1990, 1, 1);
        assert!(recency_contribution(&recent) > recency_contribution(&old));
    }

    #[test]
    fn author_overlap_scales_with_shared_authors() {
        let mut paper = base_paper();
        paper.authors = vec!["A. Lee".to_string(), "C. Park".to_string()];
        let contribution = author_overlap_contribution(&paper, &base_source());
        // 1 of 2 source authors present -> 0.5 * 0.1
        assert!((contribution - 0.05).abs() < 1e-9);
    }

    #[test]
    fn author_overlap_zero_when_source_has_no_authors() {
        let paper = base_paper();
        let source = SourcePaper {
            authors: vec![],
            ..base_source()
        };
        assert_eq!(author_overlap_contribution(&paper, &source), 0.0);
    }

    #[test]
    fn open_access_adds_fixed_bonus() {
        let mut paper = base_paper();
        paper.open_access = true;
        assert_eq!(open_access_contribution(&paper), 0.05);
    }

    // === idempotence (§8 property 10) ===

    #[test]
    fn scoring_is_idempotent() {
        let paper = base_paper();
        let source = base_source();
        let first = unified_score(&paper, &source, 0.0);
        let second = unified_score(&paper, &source, 0.0);
        assert_eq!(first, second);
    }
}
