//! Semantic-Corpus adapter: best for semantic similarity, author and venue
//! connections. Queries by title/abstract text rather than DOI, so it
//! always attempts a query regardless of whether the source paper carries
//! a DOI.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceErrorKind;
use crate::retry::{with_retry, RetryPolicy};
use crate::sources::{build_http_client, is_retryable_http_error, SourceClient};
use crate::types::{
    DiscoverySource, DiscoveredPaper, RelationshipType, SourceMetadata, SourcePaper,
};

#[derive(Debug, Serialize)]
struct CorpusRequest<'a> {
    query_title: &'a str,
    query_authors: &'a [String],
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct CorpusResponse {
    #[serde(default)]
    matches: Vec<CorpusMatch>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CorpusMatch {
    paper_id: String,
    #[serde(default)]
    doi: Option<String>,
    title: String,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    abstract_text: Option<String>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    venue: Option<String>,
    #[serde(default)]
    citation_count: Option<u64>,
    #[serde(default)]
    influential_citation_count: Option<u64>,
    #[serde(default)]
    is_open_access: bool,
    #[serde(default)]
    field_of_study: Option<String>,
    score: f64,
    /// "semantic" | "author" | "venue"
    match_type: String,
}

/// Client for the Semantic-Corpus provider.
pub struct SemanticCorpusClient {
    http: reqwest::Client,
    base_url: String,
    retry_policy: RetryPolicy,
    limit: usize,
}

impl SemanticCorpusClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: build_http_client(),
            base_url: base_url.into(),
            retry_policy: RetryPolicy::default_jitter(3),
            limit: 30,
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    async fn fetch(&self, source_paper: &SourcePaper) -> Result<CorpusResponse, SourceErrorKind> {
        let url = format!("{}/v2/similar", self.base_url);

        with_retry(
            self.retry_policy,
            "semantic_corpus.discover",
            is_retryable_http_error,
            || {
                let http = self.http.clone();
                let url = url.clone();
                let body = CorpusRequest {
                    query_title: &source_paper.title,
                    query_authors: &source_paper.authors,
                    limit: self.limit,
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
        .json::<CorpusResponse>()
        .await
        .map_err(|e| SourceErrorKind::ProviderMalformedResponse {
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl SourceClient for SemanticCorpusClient {
    fn source(&self) -> DiscoverySource {
        DiscoverySource::SemanticCorpus
    }

    async fn discover(
        &self,
        source_paper: &SourcePaper,
    ) -> Result<(Vec<DiscoveredPaper>, SourceMetadata), SourceErrorKind> {
        let response = self.fetch(source_paper).await?;

        let papers = response
            .matches
            .into_iter()
            .filter(|m| !m.title.trim().is_empty())
            .map(|m| {
                let relationship = match m.match_type.as_str() {
                    "author" => RelationshipType::AuthorConnection,
                    "venue" => RelationshipType::VenueSimilarity,
                    _ => RelationshipType::SemanticSimilarity,
                };
                let mut source_ids = std::collections::HashMap::new();
                source_ids.insert(DiscoverySource::SemanticCorpus, m.paper_id);

                let mut paper = DiscoveredPaper {
                    doi: m.doi,
                    source_ids,
                    title: m.title,
                    authors: m.authors,
                    abstract_text: m.abstract_text,
                    publication_date: None,
                    publication_year: m.year,
                    journal: m.venue,
                    primary_topic: m.field_of_study,
                    citation_count: m.citation_count,
                    influential_citation_count: m.influential_citation_count,
                    reference_count: None,
                    open_access: m.is_open_access,
                    provider_relevance: m.score.clamp(0.0, 1.0),
                    relevance_score: 0.0,
                    source_reliability: 0.9,
                    data_completeness: 0.0,
                    discovery_source: DiscoverySource::SemanticCorpus,
                    relationship_type: relationship,
                    metadata: SourceMetadata::new(),
                };
                paper.data_completeness = paper.compute_data_completeness();
                paper
            })
            .collect();

        let mut metadata = SourceMetadata::new();
        if let Some(version) = response.model_version {
            metadata.insert("model_version".to_string(), serde_json::Value::String(version));
        }

        Ok((papers, metadata))
    }

    async fn health_check(&self) -> bool {
        self.http
            .get(format!("{}/v2/health", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
