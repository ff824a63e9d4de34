//! Citation-Registry adapter: best for citation-network relationships
//! (CITES / CITED_BY). Keyed by DOI — per the adapter contract (§4.4),
//! papers without a DOI yield a successful empty result rather than a
//! failure, since this provider has nothing to look up.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceErrorKind;
use crate::retry::{with_retry, RetryPolicy};
use crate::sources::{build_http_client, is_retryable_http_error, SourceClient};
use crate::types::{
    DiscoverySource, DiscoveredPaper, RelationshipType, SourceMetadata, SourcePaper,
};

#[derive(Debug, Serialize)]
struct RegistryRequest<'a> {
    doi: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct RegistryResponse {
    #[serde(default)]
    entries: Vec<RegistryEntry>,
    #[serde(default)]
    coverage: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegistryEntry {
    doi: Option<String>,
    title: String,
    #[serde(default)]
    authors: Vec<RegistryAuthor>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    venue: Option<String>,
    #[serde(default)]
    cited_by_count: Option<u64>,
    #[serde(default)]
    influential_count: Option<u64>,
    #[serde(default)]
    reference_count: Option<u64>,
    #[serde(default)]
    is_open_access: bool,
    #[serde(default)]
    subject: Option<String>,
    relevance: f64,
    /// "cites" | "cited_by"
    direction: String,
}

#[derive(Debug, Deserialize)]
struct RegistryAuthor {
    name: String,
}

/// Client for the Citation-Registry provider.
pub struct CitationRegistryClient {
    http: reqwest::Client,
    base_url: String,
    retry_policy: RetryPolicy,
    max_results: usize,
}

impl CitationRegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: build_http_client(),
            base_url: base_url.into(),
            retry_policy: RetryPolicy::default_jitter(3),
            max_results: 25,
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    async fn fetch(&self, doi: &str) -> Result<RegistryResponse, SourceErrorKind> {
        let url = format!("{}/v1/citations", self.base_url);

        with_retry(
            self.retry_policy,
            "citation_registry.discover",
            is_retryable_http_error,
            || {
                let http = self.http.clone();
                let url = url.clone();
                let body = RegistryRequest {
                    doi,
                    max_results: self.max_results,
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
        .json::<RegistryResponse>()
        .await
        .map_err(|e| SourceErrorKind::ProviderMalformedResponse {
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl SourceClient for CitationRegistryClient {
    fn source(&self) -> DiscoverySource {
        DiscoverySource::CitationRegistry
    }

    async fn discover(
        &self,
        source_paper: &SourcePaper,
    ) -> Result<(Vec<DiscoveredPaper>, SourceMetadata), SourceErrorKind> {
        let Some(doi) = source_paper.doi.as_deref().filter(|d| !d.is_empty()) else {
            // Adapter contract (§4.4): needs a DOI and lacks one -> success, empty list.
            return Ok((Vec::new(), SourceMetadata::new()));
        };

        let response = self.fetch(doi).await?;

        let papers = response
            .entries
            .into_iter()
            .filter(|entry| !entry.title.trim().is_empty())
            .map(|entry| {
                let relationship = match entry.direction.as_str() {
                    "cited_by" => RelationshipType::CitedBy,
                    _ => RelationshipType::Cites,
                };
                let mut paper = DiscoveredPaper {
                    doi: entry.doi,
                    source_ids: Default::default(),
                    title: entry.title,
                    authors: entry.authors.into_iter().map(|a| a.name).collect(),
                    abstract_text: None,
                    publication_date: None,
                    publication_year: entry.year,
                    journal: entry.venue,
                    primary_topic: entry.subject,
                    citation_count: entry.cited_by_count,
                    influential_citation_count: entry.influential_count,
                    reference_count: entry.reference_count,
                    open_access: entry.is_open_access,
                    provider_relevance: entry.relevance.clamp(0.0, 1.0),
                    relevance_score: 0.0,
                    source_reliability: 0.95,
                    data_completeness: 0.0,
                    discovery_source: DiscoverySource::CitationRegistry,
                    relationship_type: relationship,
                    metadata: SourceMetadata::new(),
                };
                paper.data_completeness = paper.compute_data_completeness();
                paper
            })
            .collect();

        let mut metadata = SourceMetadata::new();
        if let Some(coverage) = response.coverage {
            metadata.insert("coverage".to_string(), serde_json::Value::String(coverage));
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
