//! Feedback Loop (§3, §6): per-user ratings and implicit interactions are
//! recorded here and folded into a small relevance bias on future *cold*
//! scoring runs. A cached [`crate::types::UnifiedDiscoveryResult`] is never
//! mutated in place by incoming feedback.

use dashmap::DashMap;

use crate::types::{DiscoveredPaper, FeedbackEvent, FeedbackType};

/// Maximum magnitude of the bias any single `(source paper, discovered
/// paper)` pair can contribute to `unified_score` (§4.2's fifth factor).
const MAX_BIAS_MAGNITUDE: f64 = 0.05;

/// Implicit weight assigned to non-`Rating` feedback types, since they carry
/// no explicit normalized rating of their own.
fn implied_weight(event: &FeedbackEvent) -> f64 {
    match event.feedback_type {
        FeedbackType::Rating => event.normalized_rating.clamp(-1.0, 1.0),
        FeedbackType::Click => 0.3,
        FeedbackType::Save => 0.6,
        FeedbackType::Dismiss => -0.6,
    }
}

/// Accumulates feedback events and derives a bounded bias per `(source
/// paper, discovered paper)` pair, averaged across every user who rated it.
pub struct FeedbackStore {
    events: DashMap<(String, String), Vec<FeedbackEvent>>,
}

impl Default for FeedbackStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackStore {
    pub fn new() -> Self {
        Self {
            events: DashMap::new(),
        }
    }

    /// Record one feedback event. Never fails and never touches anything
    /// already cached; the effect is visible only on the next run that
    /// recomputes scores for this `(source paper, discovered paper)` pair.
    pub fn record(&self, event: FeedbackEvent) {
        let key = (
            event.source_paper_id.clone(),
            event.discovered_paper_doi_or_title.clone(),
        );
        self.events.entry(key).or_default().push(event);
    }

    /// The bounded bias to add to [`crate::processor::scoring::unified_score`]
    /// for `paper` discovered against `source_paper_id`, averaged over every
    /// feedback event recorded for that pair. `0.0` if there is none.
    pub fn bias_for(&self, source_paper_id: &str, paper: &DiscoveredPaper) -> f64 {
        let identity = paper.doi.clone().unwrap_or_else(|| paper.title.clone());
        let key = (source_paper_id.to_string(), identity);
        let Some(events) = self.events.get(&key) else {
            return 0.0;
        };
        let average = events.iter().map(implied_weight).sum::<f64>() / events.len() as f64;
        (average * MAX_BIAS_MAGNITUDE).clamp(-MAX_BIAS_MAGNITUDE, MAX_BIAS_MAGNITUDE)
    }

    pub fn event_count(&self) -> usize {
        self.events.iter().map(|entry| entry.value().len()).sum()
    }
}
