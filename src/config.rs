//! Discovery configuration (§3, §6): the only configuration surface
//! `discover()` accepts, validated once at construction time.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::error::DiscoveryError;

/// High-level discovery mode. `Custom` configurations are built via
/// [`DiscoveryConfiguration::custom`] / [`DiscoveryConfiguration::from_json`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscoveryMode {
    Quick,
    Standard,
    Comprehensive,
    Custom,
}

/// Diversity dial controlling the relevance/diversity tradeoff in §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiversityLevel {
    Low,
    Medium,
    High,
}

impl DiversityLevel {
    /// The penalty weight λ for the diversity-optimizer's greedy selection.
    pub fn lambda(&self) -> f64 {
        match self {
            DiversityLevel::Low => 0.00,
            DiversityLevel::Medium => 0.05,
            DiversityLevel::High => 0.12,
        }
    }
}

/// An inclusive `[start, end]` publication-date range filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Recognized configuration options (§3). Constructed via the `comprehensive`
/// / `quick` presets, [`DiscoveryConfiguration::custom`] with builder-style
/// `with_*` methods, or [`DiscoveryConfiguration::from_json`] for a
/// caller-supplied `CUSTOM` configuration where unrecognized keys must be
/// rejected before any I/O.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfiguration {
    pub mode: DiscoveryMode,
    pub include_citation_registry: bool,
    pub include_semantic_corpus: bool,
    pub include_trend_analyzer: bool,
    pub max_results: usize,
    pub diversity_level: DiversityLevel,
    pub max_execution_time: Duration,
    pub min_relevance_threshold: f64,
    pub open_access_only: bool,
    pub excluded_venues: Option<BTreeSet<String>>,
    pub date_range: Option<DateRange>,
}

/// Keys recognized in a JSON `CUSTOM` configuration payload (§6).
const RECOGNIZED_KEYS: &[&str] = &[
    "mode",
    "includeCitationRegistry",
    "includeSemanticCorpus",
    "includeTrendAnalyzer",
    "maxResults",
    "diversityLevel",
    "maxExecutionTimeMs",
    "minRelevanceThreshold",
    "openAccessOnly",
    "excludedVenues",
    "dateRangeStart",
    "dateRangeEnd",
];

impl DiscoveryConfiguration {
    /// The `Comprehensive` preset (§3): all three sources, 50 results,
    /// MEDIUM diversity, 3 minute deadline, threshold 0.3.
    pub fn comprehensive() -> Self {
        Self {
            mode: DiscoveryMode::Comprehensive,
            include_citation_registry: true,
            include_semantic_corpus: true,
            include_trend_analyzer: true,
            max_results: 50,
            diversity_level: DiversityLevel::Medium,
            max_execution_time: Duration::from_secs(180),
            min_relevance_threshold: 0.3,
            open_access_only: false,
            excluded_venues: None,
            date_range: None,
        }
    }

    /// The `Quick` preset (§3): two sources (no TrendAnalyzer), 20 results,
    /// LOW diversity, 1 minute deadline, threshold 0.4.
    pub fn quick() -> Self {
        Self {
            mode: DiscoveryMode::Quick,
            include_citation_registry: true,
            include_semantic_corpus: true,
            include_trend_analyzer: false,
            max_results: 20,
            diversity_level: DiversityLevel::Low,
            max_execution_time: Duration::from_secs(60),
            min_relevance_threshold: 0.4,
            open_access_only: false,
            excluded_venues: None,
            date_range: None,
        }
    }

    /// A `STANDARD` preset: all three sources, 30 results, MEDIUM
    /// diversity, 2 minute deadline, threshold 0.35. Not named explicitly
    /// in §3's two presets but implied by `DiscoveryMode::Standard` being a
    /// distinct recognized mode; chosen as the midpoint between `Quick` and
    /// `Comprehensive` (an Open Question resolved here, see `DESIGN.md`).
    pub fn standard() -> Self {
        Self {
            mode: DiscoveryMode::Standard,
            include_citation_registry: true,
            include_semantic_corpus: true,
            include_trend_analyzer: true,
            max_results: 30,
            diversity_level: DiversityLevel::Medium,
            max_execution_time: Duration::from_secs(120),
            min_relevance_threshold: 0.35,
            open_access_only: false,
            excluded_venues: None,
            date_range: None,
        }
    }

    /// Start building a `CUSTOM` configuration from the `Comprehensive`
    /// defaults.
    pub fn custom() -> Self {
        Self {
            mode: DiscoveryMode::Custom,
            ..Self::comprehensive()
        }
    }

    #[must_use]
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    #[must_use]
    pub fn with_diversity_level(mut self, level: DiversityLevel) -> Self {
        self.diversity_level = level;
        self
    }

    #[must_use]
    pub fn with_max_execution_time(mut self, duration: Duration) -> Self {
        self.max_execution_time = duration;
        self
    }

    #[must_use]
    pub fn with_min_relevance_threshold(mut self, threshold: f64) -> Self {
        self.min_relevance_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_open_access_only(mut self, only: bool) -> Self {
        self.open_access_only = only;
        self
    }

    #[must_use]
    pub fn with_excluded_venues<I: IntoIterator<Item = String>>(mut self, venues: I) -> Self {
        self.excluded_venues = Some(venues.into_iter().collect());
        self
    }

    #[must_use]
    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    #[must_use]
    pub fn with_sources(mut self, citation_registry: bool, semantic_corpus: bool, trend_analyzer: bool) -> Self {
        self.include_citation_registry = citation_registry;
        self.include_semantic_corpus = semantic_corpus;
        self.include_trend_analyzer = trend_analyzer;
        self
    }

    /// Parse and validate a `CUSTOM` configuration from an untyped JSON
    /// payload, rejecting any unrecognized key before any I/O (§6).
    pub fn from_json(value: &serde_json::Value) -> Result<Self, DiscoveryError> {
        let obj = value
            .as_object()
            .ok_or_else(|| DiscoveryError::Configuration("configuration must be a JSON object".into()))?;

        for key in obj.keys() {
            if !RECOGNIZED_KEYS.contains(&key.as_str()) {
                return Err(DiscoveryError::Configuration(format!(
                    "unrecognized configuration key: {key}"
                )));
            }
        }

        let mut config = Self::custom();

        if let Some(v) = obj.get("includeCitationRegistry") {
            config.include_citation_registry = v.as_bool().ok_or_else(|| {
                DiscoveryError::Configuration("includeCitationRegistry must be a boolean".into())
            })?;
        }
        if let Some(v) = obj.get("includeSemanticCorpus") {
            config.include_semantic_corpus = v.as_bool().ok_or_else(|| {
                DiscoveryError::Configuration("includeSemanticCorpus must be a boolean".into())
            })?;
        }
        if let Some(v) = obj.get("includeTrendAnalyzer") {
            config.include_trend_analyzer = v.as_bool().ok_or_else(|| {
                DiscoveryError::Configuration("includeTrendAnalyzer must be a boolean".into())
            })?;
        }
        if let Some(v) = obj.get("maxResults") {
            config.max_results = v
                .as_u64()
                .ok_or_else(|| DiscoveryError::Configuration("maxResults must be an integer".into()))?
                as usize;
        }
        if let Some(v) = obj.get("diversityLevel") {
            let s = v
                .as_str()
                .ok_or_else(|| DiscoveryError::Configuration("diversityLevel must be a string".into()))?;
            config.diversity_level = match s {
                "LOW" => DiversityLevel::Low,
                "MEDIUM" => DiversityLevel::Medium,
                "HIGH" => DiversityLevel::High,
                other => {
                    return Err(DiscoveryError::Configuration(format!(
                        "unrecognized diversityLevel: {other}"
                    )))
                }
            };
        }
        if let Some(v) = obj.get("maxExecutionTimeMs") {
            let ms = v
                .as_u64()
                .ok_or_else(|| DiscoveryError::Configuration("maxExecutionTimeMs must be an integer".into()))?;
            config.max_execution_time = Duration::from_millis(ms);
        }
        if let Some(v) = obj.get("minRelevanceThreshold") {
            config.min_relevance_threshold = v.as_f64().ok_or_else(|| {
                DiscoveryError::Configuration("minRelevanceThreshold must be a number".into())
            })?;
        }
        if let Some(v) = obj.get("openAccessOnly") {
            config.open_access_only = v
                .as_bool()
                .ok_or_else(|| DiscoveryError::Configuration("openAccessOnly must be a boolean".into()))?;
        }
        if let Some(v) = obj.get("excludedVenues") {
            let arr = v
                .as_array()
                .ok_or_else(|| DiscoveryError::Configuration("excludedVenues must be an array".into()))?;
            let mut set = BTreeSet::new();
            for item in arr {
                let s = item.as_str().ok_or_else(|| {
                    DiscoveryError::Configuration("excludedVenues entries must be strings".into())
                })?;
                set.insert(s.to_string());
            }
            config.excluded_venues = Some(set);
        }
        let start = obj.get("dateRangeStart").map(parse_date).transpose()?;
        let end = obj.get("dateRangeEnd").map(parse_date).transpose()?;
        match (start, end) {
            (Some(start), Some(end)) => config.date_range = Some(DateRange { start, end }),
            (None, None) => {}
            _ => {
                return Err(DiscoveryError::Configuration(
                    "dateRangeStart and dateRangeEnd must be provided together".into(),
                ))
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate range/enum constraints named in §3. Presets are always
    /// valid by construction; this is exercised primarily for `CUSTOM`
    /// configurations and defensively for hand-built ones.
    pub fn validate(&self) -> Result<(), DiscoveryError> {
        if !(1..=100).contains(&self.max_results) {
            return Err(DiscoveryError::Configuration(format!(
                "maxResults must be in 1..=100, got {}",
                self.max_results
            )));
        }
        if !(0.0..=1.0).contains(&self.min_relevance_threshold) {
            return Err(DiscoveryError::Configuration(format!(
                "minRelevanceThreshold must be in [0, 1], got {}",
                self.min_relevance_threshold
            )));
        }
        if let Some(range) = &self.date_range {
            if range.start > range.end {
                return Err(DiscoveryError::Configuration(
                    "dateRangeStart must not be after dateRangeEnd".into(),
                ));
            }
        }
        if self.max_execution_time.is_zero() {
            return Err(DiscoveryError::Configuration(
                "maxExecutionTime must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Number of sources enabled by this configuration.
    pub fn enabled_source_count(&self) -> usize {
        [
            self.include_citation_registry,
            self.include_semantic_corpus,
            self.include_trend_analyzer,
        ]
        .iter()
        .filter(|b| **b)
        .count()
    }

    pub fn is_source_enabled(&self, source: crate::types::DiscoverySource) -> bool {
        use crate::types::DiscoverySource;
        match source {
            DiscoverySource::CitationRegistry => self.include_citation_registry,
            DiscoverySource::SemanticCorpus => self.include_semantic_corpus,
            DiscoverySource::TrendAnalyzer => self.include_trend_analyzer,
        }
    }

    /// A stable hex digest of the *normalized* configuration: the excluded
    /// venue set is sorted, booleans are canonicalized, and the threshold
    /// is rounded to 3 decimals, so semantically-equal configurations share
    /// a cache key (§4.1 step 1).
    pub fn normalized_digest(&self) -> String {
        let rounded_threshold = (self.min_relevance_threshold * 1000.0).round() / 1000.0;
        let venues: Vec<&String> = self
            .excluded_venues
            .as_ref()
            .map(|s| s.iter().collect())
            .unwrap_or_default();

        // BTreeSet already yields sorted iteration; format deterministically.
        let canonical = format!(
            "mode={:?}|cr={}|sc={}|ta={}|max={}|div={:?}|deadline_ms={}|thresh={:.3}|oa={}|venues={:?}|range={:?}",
            self.mode,
            self.include_citation_registry,
            self.include_semantic_corpus,
            self.include_trend_analyzer,
            self.max_results,
            self.diversity_level,
            self.max_execution_time.as_millis(),
            rounded_threshold,
            self.open_access_only,
            venues,
            self.date_range,
        );

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }
}

fn parse_date(value: &serde_json::Value) -> Result<NaiveDate, DiscoveryError> {
    let s = value
        .as_str()
        .ok_or_else(|| DiscoveryError::Configuration("date fields must be strings (YYYY-MM-DD)".into()))?;
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DiscoveryError::Configuration(format!("invalid date '{s}': {e}")))
}
