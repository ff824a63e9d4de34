//! Result Processor (§4.2): pure synthesis logic — deduplication across
//! heterogeneous sources, then unified scoring, then threshold filtering,
//! into a single, totally ordered list.

pub mod dedup;
pub mod scoring;
pub mod similarity;

use crate::config::DiscoveryConfiguration;
use crate::types::{DiscoveredPaper, SourcePaper};

/// Output of one Result Processor pass.
pub struct ProcessedResults {
    pub papers: Vec<DiscoveredPaper>,
    pub total_raw: usize,
    pub total_after_dedup: usize,
    pub dropped_empty_title: usize,
}

/// Run deduplication, unified scoring, and threshold filtering over a raw
/// candidate bag gathered from all successful sources, producing a single
/// totally-ordered, deduplicated, threshold-filtered list (§4.2).
///
/// `feedback_bias` supplies the optional per-candidate bias of §6; pass
/// `|_| 0.0` when feedback is not configured for this run. This function
/// is pure: it mutates no shared state and its result depends only on its
/// arguments (§9, §8 property 10).
pub fn process(
    source_paper: &SourcePaper,
    raw_candidates: Vec<DiscoveredPaper>,
    configuration: &DiscoveryConfiguration,
    feedback_bias: impl Fn(&DiscoveredPaper) -> f64,
) -> ProcessedResults {
    let total_raw = raw_candidates.len();

    let (deduplicated, dropped_empty_title) = dedup::deduplicate(raw_candidates);
    let total_after_dedup = deduplicated.len();

    let mut scored: Vec<DiscoveredPaper> = deduplicated
        .into_iter()
        .map(|mut paper| {
            let bias = feedback_bias(&paper);
            paper.relevance_score = scoring::unified_score(&paper, source_paper, bias);
            paper
        })
        .filter(|paper| paper.relevance_score >= configuration.min_relevance_threshold)
        .filter(|paper| !configuration.open_access_only || paper.open_access)
        .filter(|paper| match (&configuration.excluded_venues, &paper.journal) {
            (Some(excluded), Some(journal)) => !excluded.contains(journal),
            _ => true,
        })
        .filter(|paper| match &configuration.date_range {
            Some(range) => paper.publication_date.map(|d| range.contains(d)).unwrap_or(false),
            None => true,
        })
        .collect();

    scored.sort_by(total_order);

    ProcessedResults {
        papers: scored,
        total_raw,
        total_after_dedup,
        dropped_empty_title,
    }
}

/// The total, stable tie-break chain of §3/§4.2: score desc, citation
/// count desc, publication year desc, DOI lexicographic asc.
fn total_order(a: &DiscoveredPaper, b: &DiscoveredPaper) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    b.relevance_score
        .partial_cmp(&a.relevance_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.citation_count.unwrap_or(0).cmp(&a.citation_count.unwrap_or(0)))
        .then_with(|| {
            b.publication_year
                .unwrap_or(i32::MIN)
                .cmp(&a.publication_year.unwrap_or(i32::MIN))
        })
        .then_with(|| match (&a.doi, &b.doi) {
            (Some(da), Some(db)) => da.cmp(db),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}
