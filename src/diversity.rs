//! Diversity Optimizer (§4.3): greedily re-ranks an already relevance-sorted
//! list to avoid returning `maxResults` near-duplicate papers from the same
//! topic, venue, or first author, trading off against raw relevance by a
//! penalty weight λ that scales with [`crate::config::DiversityLevel`].

use crate::config::DiversityLevel;
use crate::types::DiscoveredPaper;

/// `true` if `candidate` and `other` agree on this axis. Two `None` values
/// never count as a match (§4.3) — an absent field is not a shared trait.
fn axis_match<T: PartialEq>(candidate: Option<T>, other: Option<T>) -> bool {
    matches!((candidate, other), (Some(a), Some(b)) if a == b)
}

/// `true` if `candidate` shares any of the three diversity axes (topic,
/// venue, first author) with `other`.
fn shares_any_axis(candidate: &DiscoveredPaper, other: &DiscoveredPaper) -> bool {
    axis_match(candidate.primary_topic.as_ref(), other.primary_topic.as_ref())
        || axis_match(candidate.journal.as_ref(), other.journal.as_ref())
        || axis_match(candidate.first_author_surname(), other.first_author_surname())
}

/// Redundancy penalty for adding `candidate` to `selected`: the number of
/// already-selected papers that share at least one axis with it (§4.3). Not
/// the number of axes shared — a candidate overlapping three already-picked
/// papers on the same venue is penalized three times, not once.
fn penalty(candidate: &DiscoveredPaper, selected: &[DiscoveredPaper]) -> f64 {
    selected.iter().filter(|other| shares_any_axis(candidate, other)).count() as f64
}

/// Greedily select up to `max_results` papers from `ranked` (assumed already
/// sorted by the Result Processor's total order), maximizing
/// `relevance_score - lambda * penalty` at each step. Ties in adjusted score
/// are broken in favor of whichever candidate appears earlier in `ranked`
/// (an Open Question resolved here: see `DESIGN.md`).
///
/// With `DiversityLevel::Low` (`lambda == 0`) this reduces to a plain
/// truncation to `max_results`, since penalty never outweighs relevance.
pub fn diversify(ranked: Vec<DiscoveredPaper>, max_results: usize, level: DiversityLevel) -> Vec<DiscoveredPaper> {
    let lambda = level.lambda();
    if lambda == 0.0 || ranked.len() <= max_results {
        return ranked.into_iter().take(max_results).collect();
    }

    let mut remaining: Vec<DiscoveredPaper> = ranked;
    let mut selected: Vec<DiscoveredPaper> = Vec::with_capacity(max_results.min(remaining.len()));

    while selected.len() < max_results && !remaining.is_empty() {
        let mut best_idx = 0;
        let mut best_adjusted = f64::NEG_INFINITY;
        for (idx, candidate) in remaining.iter().enumerate() {
            let adjusted = candidate.relevance_score - lambda * penalty(candidate, &selected);
            if adjusted > best_adjusted {
                best_adjusted = adjusted;
                best_idx = idx;
            }
        }
        selected.push(remaining.remove(best_idx));
    }

    selected
}
