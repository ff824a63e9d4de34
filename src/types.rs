//! Core data model: source papers, discovered papers, and the per-run
//! bundles the orchestrator assembles around them.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DiscoveryConfiguration;
use crate::error::SourceErrorKind;

/// One of the three external bibliographic providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiscoverySource {
    CitationRegistry,
    SemanticCorpus,
    TrendAnalyzer,
}

impl DiscoverySource {
    /// All sources, in the fixed enumeration order used for deterministic
    /// `sourceResults` ordering (§5 "Ordering guarantees").
    pub const ALL: [DiscoverySource; 3] = [
        DiscoverySource::CitationRegistry,
        DiscoverySource::SemanticCorpus,
        DiscoverySource::TrendAnalyzer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoverySource::CitationRegistry => "citation_registry",
            DiscoverySource::SemanticCorpus => "semantic_corpus",
            DiscoverySource::TrendAnalyzer => "trend_analyzer",
        }
    }

    /// Stable rank used only as the last tie-break in "preferred source"
    /// selection during deduplication (§4.2): CitationRegistry, then
    /// SemanticCorpus, then TrendAnalyzer.
    pub fn priority_rank(&self) -> u8 {
        match self {
            DiscoverySource::CitationRegistry => 0,
            DiscoverySource::SemanticCorpus => 1,
            DiscoverySource::TrendAnalyzer => 2,
        }
    }
}

/// The nature of the link between source paper and discovered paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipType {
    Cites,
    CitedBy,
    SemanticSimilarity,
    AuthorConnection,
    VenueSimilarity,
    TopicSimilarity,
    MethodologySimilarity,
    TemporalRelationship,
}

/// Identity of the query subject. Read-only input to a discovery run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePaper {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub arxiv_id: Option<String>,
    #[serde(default)]
    pub semantic_corpus_id: Option<String>,
    #[serde(default)]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
}

/// Opaque, provider-specific metadata. The core never parses beyond what
/// the adapter interface requires (§9 "Dynamic JSON metadata blobs").
pub type SourceMetadata = HashMap<String, serde_json::Value>;

/// A candidate related paper emerging from one or more sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredPaper {
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub source_ids: HashMap<DiscoverySource, String>,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub publication_date: Option<NaiveDate>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub journal: Option<String>,
    /// Primary topical field, when the provider supplies one (e.g. a
    /// top-ranked subject concept). Used only as a diversity axis (§4.3);
    /// absence never counts as a match against another paper's absence.
    #[serde(default)]
    pub primary_topic: Option<String>,
    #[serde(default)]
    pub citation_count: Option<u64>,
    #[serde(default)]
    pub influential_citation_count: Option<u64>,
    #[serde(default)]
    pub reference_count: Option<u64>,
    #[serde(default)]
    pub open_access: bool,
    /// Raw relevance reported by the provider, in [0, 1]. Replaced by the
    /// unified `relevance_score` after synthesis.
    pub provider_relevance: f64,
    /// Unified relevance in [0, 1], set by the Result Processor. `0.0`
    /// until scored.
    #[serde(default)]
    pub relevance_score: f64,
    pub source_reliability: f64,
    pub data_completeness: f64,
    pub discovery_source: DiscoverySource,
    pub relationship_type: RelationshipType,
    #[serde(default)]
    pub metadata: SourceMetadata,
}

impl DiscoveredPaper {
    /// Normalized first author surname, used by venue/author diversity axes
    /// and author-overlap scoring. `None` if there are no authors.
    pub fn first_author_surname(&self) -> Option<String> {
        self.authors.first().map(|a| normalize_surname(a))
    }

    /// Fraction of completeness-relevant fields present, per §4.2:
    /// {DOI, >=1 author, journal, publication date, citation count}.
    pub fn compute_data_completeness(&self) -> f64 {
        let checks = [
            self.doi.is_some(),
            !self.authors.is_empty(),
            self.journal.is_some(),
            self.publication_date.is_some(),
            self.citation_count.is_some(),
        ];
        let satisfied = checks.iter().filter(|b| **b).count();
        satisfied as f64 / checks.len() as f64
    }

    pub fn years_old(&self) -> Option<f64> {
        let today = Utc::now().date_naive();
        if let Some(date) = self.publication_date {
            Some((today - date).num_days() as f64 / 365.25)
        } else {
            self.publication_year
                .map(|y| (today.year_ce_f64() - y as f64).max(0.0))
        }
    }
}

trait YearCeF64 {
    fn year_ce_f64(&self) -> f64;
}
impl YearCeF64 for NaiveDate {
    fn year_ce_f64(&self) -> f64 {
        use chrono::Datelike;
        f64::from(self.year())
    }
}

/// Normalize a single author's display name down to a comparable surname:
/// lowercase last whitespace-separated token, alphanumeric only.
pub fn normalize_surname(author: &str) -> String {
    let last = author.trim().rsplit(' ').next().unwrap_or(author.trim());
    last.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Per-source outcome of one discovery run. Always produced for every
/// enabled source (§3 "never an omission").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDiscoveryResult {
    pub source: DiscoverySource,
    pub success: bool,
    #[serde(default)]
    pub papers: Vec<DiscoveredPaper>,
    #[serde(default)]
    pub source_metadata: SourceMetadata,
    pub duration: Duration,
    #[serde(default)]
    pub error: Option<SourceErrorKind>,
}

impl SourceDiscoveryResult {
    pub fn success(
        source: DiscoverySource,
        papers: Vec<DiscoveredPaper>,
        source_metadata: SourceMetadata,
        duration: Duration,
    ) -> Self {
        Self {
            source,
            success: true,
            papers,
            source_metadata,
            duration,
            error: None,
        }
    }

    pub fn failure(source: DiscoverySource, error: SourceErrorKind, duration: Duration) -> Self {
        Self {
            source,
            success: false,
            papers: Vec::new(),
            source_metadata: SourceMetadata::new(),
            duration,
            error: Some(error),
        }
    }
}

/// Transient bundle collected during one discovery run (§3). Primarily of
/// interest to tests and operational tooling via
/// [`crate::orchestrator::Orchestrator::discover_with_trace`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryExecution {
    /// Unique per invocation, independent of the cache key, so repeated
    /// traces of a cache-equivalent request remain distinguishable in logs.
    pub execution_id: Uuid,
    pub source_paper: SourcePaper,
    pub configuration: DiscoveryConfiguration,
    pub started_at: chrono::DateTime<Utc>,
    pub finished_at: chrono::DateTime<Utc>,
    pub source_results: Vec<SourceDiscoveryResult>,
}

/// Aggregate statistics describing how a `UnifiedDiscoveryResult` was
/// synthesized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisMetadata {
    pub total_raw_results: usize,
    pub total_after_dedup: usize,
    pub total_returned: usize,
    pub succeeded_sources: Vec<DiscoverySource>,
    pub failed_sources: Vec<DiscoverySource>,
    pub total_processing: Duration,
    pub overall_confidence: f64,
    pub stage_durations: HashMap<String, Duration>,
}

/// The final value produced by a discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedDiscoveryResult {
    pub source_paper: SourcePaper,
    pub discovered_papers: Vec<DiscoveredPaper>,
    pub source_results: Vec<SourceDiscoveryResult>,
    pub synthesis: SynthesisMetadata,
    pub configuration: DiscoveryConfiguration,
}

/// The kind of interaction or rating a [`FeedbackEvent`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedbackType {
    Rating,
    Click,
    Dismiss,
    Save,
}

/// Per-user rating or interaction record (§3, §6). Consumed by future cold
/// scoring runs only; never mutates a cached result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub user_id: String,
    pub source_paper_id: String,
    pub discovered_paper_doi_or_title: String,
    pub feedback_type: FeedbackType,
    /// Normalized rating in [-1, 1]; for non-`Rating` feedback this is a
    /// fixed implicit value (see `feedback.rs`).
    pub normalized_rating: f64,
}
