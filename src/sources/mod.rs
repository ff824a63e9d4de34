//! Source Clients (§4.4): the uniform adapter contract implemented by the
//! three external bibliographic providers. Grounded on the thin
//! `reqwest`-based tool adapters in `dashflow-arxiv` / `dashflow-tavily`
//! and the `SourceProvider` trait in the `meta_search.rs` reference file.

pub mod citation_registry;
pub mod semantic_corpus;
pub mod trend_analyzer;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::SourceErrorKind;
use crate::types::{DiscoverySource, DiscoveredPaper, SourceDiscoveryResult, SourceMetadata, SourcePaper};

pub use citation_registry::CitationRegistryClient;
pub use semantic_corpus::SemanticCorpusClient;
pub use trend_analyzer::TrendAnalyzerClient;

/// Default connect timeout for source-client HTTP requests.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default total request timeout for source-client HTTP requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// The uniform operation every external provider adapter implements
/// (§4.4). Implementations own their own retry policy with exponential
/// backoff (`crate::retry`); the orchestrator never retries a source
/// directly.
///
/// `discover` itself must not panic and must not produce side effects
/// after being dropped/cancelled (§5 cancellation). It is intentionally
/// fallible — callers (the orchestrator's fan-out loop) translate the
/// `Result` into a [`SourceDiscoveryResult`] with a measured duration.
#[async_trait]
pub trait SourceClient: Send + Sync {
    fn source(&self) -> DiscoverySource;

    async fn discover(
        &self,
        source_paper: &SourcePaper,
    ) -> Result<(Vec<DiscoveredPaper>, SourceMetadata), SourceErrorKind>;

    /// Lightweight liveness probe. Not on the critical path of `discover()`;
    /// exposed for operational tooling (SPEC_FULL.md, "Provider health
    /// check").
    async fn health_check(&self) -> bool {
        true
    }
}

/// Run `client.discover(source_paper)`, measuring wall-clock duration and
/// converting any error into a failed [`SourceDiscoveryResult`]. This is
/// the boundary the orchestrator's fan-out tasks call through; it never
/// returns an `Err` because per-source failures are data, not exceptions
/// (§4.1, §7).
pub async fn run_source(
    client: &dyn SourceClient,
    source_paper: &SourcePaper,
) -> SourceDiscoveryResult {
    let source = client.source();
    let start = Instant::now();
    match client.discover(source_paper).await {
        Ok((papers, metadata)) => {
            let elapsed = start.elapsed();
            info!(source = source.as_str(), count = papers.len(), elapsed_ms = elapsed.as_millis() as u64, "source discovery succeeded");
            SourceDiscoveryResult::success(source, papers, metadata, elapsed)
        }
        Err(kind) => {
            let elapsed = start.elapsed();
            warn!(source = source.as_str(), error = %kind, elapsed_ms = elapsed.as_millis() as u64, "source discovery failed");
            SourceDiscoveryResult::failure(source, kind, elapsed)
        }
    }
}

/// Build the shared `reqwest::Client` each adapter uses, mirroring
/// `dashflow-tavily::create_http_client`'s timeout configuration.
pub fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Classify a `reqwest::Error` as retryable (transport/timeout/5xx) or not
/// (4xx, decoding) — mirrors the retryable/non-retryable split documented
/// on `dashflow-remote-node`'s `RemoteNodeConfig::retry_policy`.
pub fn is_retryable_http_error(err: &reqwest::Error) -> bool {
    if err.is_timeout() || err.is_connect() {
        return true;
    }
    if let Some(status) = err.status() {
        return status.is_server_error();
    }
    false
}
