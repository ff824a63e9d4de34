//! Trend-Analyzer adapter: produces fewer but more contextual results,
//! frequently marked open-access. Surfaces topical/methodological/temporal
//! relationships rather than direct citation links.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::SourceErrorKind;
use crate::retry::{with_retry, RetryPolicy};
use crate::sources::{build_http_client, is_retryable_http_error, SourceClient};
use crate::types::{
    DiscoverySource, DiscoveredPaper, RelationshipType, SourceMetadata, SourcePaper,
};

#[derive(Debug, Serialize)]
struct TrendRequest<'a> {
    seed_title: &'a str,
    seed_year: Option<i32>,
    top_k: usize,
}

#[derive(Debug, Deserialize)]
struct TrendResponse {
    #[serde(default)]
    signals: Vec<TrendSignal>,
    #[serde(default)]
    corpus_snapshot: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrendSignal {
    id: String,
    #[serde(default)]
    doi: Option<String>,
    title: String,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    published_date: Option<String>,
    #[serde(default)]
    venue: Option<String>,
    #[serde(default)]
    citation_count: Option<u64>,
    #[serde(default)]
    open_access: bool,
    #[serde(default)]
    topic: Option<String>,
    trend_score: f64,
    /// "topic" | "methodology" | "temporal"
    signal_kind: String,
}

/// Client for the Trend-Analyzer provider.
pub struct TrendAnalyzerClient {
    http: reqwest::Client,
    base_url: String,
    retry_policy: RetryPolicy,
    top_k: usize,
}

impl TrendAnalyzerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: build_http_client(),
            base_url: base_url.into(),
            retry_policy: RetryPolicy::default_jitter(3),
            top_k: 15,
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    async fn fetch(&self, source_paper: &SourcePaper) -> Result<TrendResponse, SourceErrorKind> {
        let url = format!("{}/v1/trends", self.base_url);

        with_retry(
            self.retry_policy,
            "trend_analyzer.discover",
            is_retryable_http_error,
            || {
                let http = self.http.clone();
                let url = url.clone();
                let body = TrendRequest {
                    seed_title: &source_paper.title,
                    seed_year: source_paper.publication_year,
                    top_k: self.top_k,
                };
                async move { http.post(&url).json(&body).send().await }
            },
        )
        .await
        .map_err(|e| SourceErrorKind::ProviderUnavailable {
            message: e.to_string(),
        })?
        .error_for_status()
        .map_err(|e| SourceErrorKind::ProviderUnavailable {
            message: e.to_string(),
        })?
        .json::<TrendResponse>()
        .await
        .map_err(|e| SourceErrorKind::ProviderMalformedResponse {
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl SourceClient for TrendAnalyzerClient {
    fn source(&self) -> DiscoverySource {
        DiscoverySource::TrendAnalyzer
    }

    async fn discover(
        &self,
        source_paper: &SourcePaper,
    ) -> Result<(Vec<DiscoveredPaper>, SourceMetadata), SourceErrorKind> {
        let response = self.fetch(source_paper).await?;

        let papers = response
            .signals
            .into_iter()
            .filter(|s| !s.title.trim().is_empty())
            .map(|s| {
                let relationship = match s.signal_kind.as_str() {
                    "methodology" => RelationshipType::MethodologySimilarity,
                    "temporal" => RelationshipType::TemporalRelationship,
                    _ => RelationshipType::TopicSimilarity,
                };
                let publication_date = s
                    .published_date
                    .as_deref()
                    .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

                let mut source_ids = std::collections::HashMap::new();
                source_ids.insert(DiscoverySource::TrendAnalyzer, s.id);

                let mut paper = DiscoveredPaper {
                    doi: s.doi,
                    source_ids,
                    title: s.title,
                    authors: s.authors,
                    abstract_text: None,
                    publication_date,
                    publication_year: publication_date.map(|d| {
                        use chrono::Datelike;
                        d.year()
                    }),
                    journal: s.venue,
                    primary_topic: s.topic,
                    citation_count: s.citation_count,
                    influential_citation_count: None,
                    reference_count: None,
                    open_access: s.open_access,
                    provider_relevance: s.trend_score.clamp(0.0, 1.0),
                    relevance_score: 0.0,
                    source_reliability: 0.8,
                    data_completeness: 0.0,
                    discovery_source: DiscoverySource::TrendAnalyzer,
                    relationship_type: relationship,
                    metadata: SourceMetadata::new(),
                };
                paper.data_completeness = paper.compute_data_completeness();
                paper
            })
            .collect();

        let mut metadata = SourceMetadata::new();
        if let Some(snapshot) = response.corpus_snapshot {
            metadata.insert("corpus_snapshot".to_string(), serde_json::Value::String(snapshot));
        }

        Ok((papers, metadata))
    }

    async fn health_check(&self) -> bool {
        self.http
            .get(format!("{}/v1/health", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
