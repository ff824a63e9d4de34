//! Discovery Orchestrator (§3, §4.1): fans a request out to the enabled
//! source clients, synthesizes their results, and caches the outcome.
//! Grounded on the bounded-parallel, per-provider-timeout fan-out in
//! `meta_search.rs`'s `MetaSearchClient::search`, adapted from an unbounded
//! provider list to the three fixed [`DiscoverySource`] adapters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::cache::{cache_key, DiscoveryCache, PersistentCacheStore};
use crate::config::DiscoveryConfiguration;
use crate::diversity::diversify;
use crate::error::{DiscoveryError, SourceErrorKind};
use crate::feedback::FeedbackStore;
use crate::processor;
use crate::sources::{run_source, SourceClient};
use crate::types::{
    DiscoveredPaper, DiscoveryExecution, DiscoverySource, SourceDiscoveryResult, SourcePaper,
    SynthesisMetadata, UnifiedDiscoveryResult,
};

/// Ambient, deployment-level tunables, distinct from [`DiscoveryConfiguration`]
/// (the per-call surface): how big the cache is, how long entries live, and
/// how many source fan-out tasks may run at once. Overridable via
/// `DISCOVERY_*` environment variables, mirroring
/// `dashflow_registry::cache::CacheConfig::from_env`.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    pub executor_concurrency: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            cache_capacity: 1_000,
            cache_ttl: Duration::from_secs(8 * 3600),
            executor_concurrency: 8,
        }
    }
}

impl OrchestratorSettings {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            cache_capacity: env_usize("DISCOVERY_CACHE_CAPACITY", default.cache_capacity),
            cache_ttl: Duration::from_secs(env_u64(
                "DISCOVERY_CACHE_TTL_SECS",
                default.cache_ttl.as_secs(),
            )),
            executor_concurrency: env_usize(
                "DISCOVERY_EXECUTOR_CONCURRENCY",
                default.executor_concurrency,
            ),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Per-source observability counters (SPEC_FULL.md "Per-source observability
/// counters"), updated with atomic operations from the fan-out loop.
#[derive(Debug, Default)]
struct SourceCounters {
    total_calls: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
}

/// Point-in-time snapshot of one source's [`SourceCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceMetrics {
    pub total_calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
}

/// Entry point of the crate: owns the registered source clients, the
/// Discovery Cache, and an optional feedback store.
pub struct Orchestrator {
    clients: HashMap<DiscoverySource, Arc<dyn SourceClient>>,
    cache: DiscoveryCache,
    feedback: Option<Arc<FeedbackStore>>,
    executor_concurrency: usize,
    metrics: HashMap<DiscoverySource, SourceCounters>,
}

impl Orchestrator {
    pub fn new(settings: OrchestratorSettings) -> Self {
        Self {
            clients: HashMap::new(),
            cache: DiscoveryCache::new(settings.cache_capacity, settings.cache_ttl),
            feedback: None,
            executor_concurrency: settings.executor_concurrency.max(1),
            metrics: DiscoverySource::ALL.into_iter().map(|s| (s, SourceCounters::default())).collect(),
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: Arc<dyn SourceClient>) -> Self {
        self.clients.insert(client.source(), client);
        self
    }

    #[must_use]
    pub fn with_persistent_cache(mut self, store: Arc<dyn PersistentCacheStore>) -> Self {
        self.cache = self.cache.with_persistent_store(store);
        self
    }

    #[must_use]
    pub fn with_feedback_store(mut self, feedback: Arc<FeedbackStore>) -> Self {
        self.feedback = Some(feedback);
        self
    }

    /// Probe every registered client's `health_check()` concurrently.
    /// Not on the `discover()` critical path (SPEC_FULL.md "Provider health
    /// check").
    pub async fn health_check(&self) -> HashMap<DiscoverySource, bool> {
        let mut results = HashMap::new();
        for (source, client) in &self.clients {
            results.insert(*source, client.health_check().await);
        }
        results
    }

    /// Snapshot the per-source call/success/failure/timeout counters
    /// accumulated across every `discover()`/`discover_with_trace()` call
    /// made through this orchestrator, including cache hits' underlying
    /// fan-out when they first populated the cache. One entry per source
    /// this orchestrator was constructed to track, regardless of whether a
    /// client was ever registered for it.
    pub fn metrics_snapshot(&self) -> HashMap<DiscoverySource, SourceMetrics> {
        self.metrics
            .iter()
            .map(|(source, counters)| {
                (
                    *source,
                    SourceMetrics {
                        total_calls: counters.total_calls.load(Ordering::Relaxed),
                        successes: counters.successes.load(Ordering::Relaxed),
                        failures: counters.failures.load(Ordering::Relaxed),
                        timeouts: counters.timeouts.load(Ordering::Relaxed),
                    },
                )
            })
            .collect()
    }

    fn record_metrics(&self, result: &SourceDiscoveryResult) {
        let Some(counters) = self.metrics.get(&result.source) else {
            return;
        };
        counters.total_calls.fetch_add(1, Ordering::Relaxed);
        if result.success {
            counters.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            counters.failures.fetch_add(1, Ordering::Relaxed);
            if matches!(result.error, Some(SourceErrorKind::Timeout)) {
                counters.timeouts.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Run one discovery request, serving from cache when possible (§4.1).
    /// The only errors that surface here are configuration errors raised
    /// before any I/O; per-source failures are absorbed into
    /// `source_results` instead (§7).
    #[instrument(skip(self, configuration), fields(source_paper = %source_paper.id))]
    pub async fn discover(
        &self,
        source_paper: SourcePaper,
        configuration: DiscoveryConfiguration,
    ) -> Result<UnifiedDiscoveryResult, DiscoveryError> {
        configuration.validate()?;
        let key = cache_key(&source_paper, &configuration);

        let result = self
            .cache
            .get_or_compute(
                &key,
                |result| {
                    !(result.synthesis.total_returned == 0 && !result.synthesis.failed_sources.is_empty())
                },
                || self.execute(source_paper, configuration),
            )
            .await;

        Ok(result)
    }

    /// Like [`Self::discover`], but bypasses the cache entirely and returns
    /// the full execution trace alongside the result. Intended for tests and
    /// operational tooling, not the request-serving hot path.
    pub async fn discover_with_trace(
        &self,
        source_paper: SourcePaper,
        configuration: DiscoveryConfiguration,
    ) -> Result<(UnifiedDiscoveryResult, DiscoveryExecution), DiscoveryError> {
        configuration.validate()?;
        let execution_id = Uuid::new_v4();
        let started_at = Utc::now();
        let result = self
            .execute_traced(execution_id, source_paper.clone(), configuration.clone())
            .await;
        let finished_at = Utc::now();
        let execution = DiscoveryExecution {
            execution_id,
            source_paper,
            configuration,
            started_at,
            finished_at,
            source_results: result.source_results.clone(),
        };
        Ok((result, execution))
    }

    async fn execute_traced(
        &self,
        execution_id: Uuid,
        source_paper: SourcePaper,
        configuration: DiscoveryConfiguration,
    ) -> UnifiedDiscoveryResult {
        info!(%execution_id, "starting traced discovery execution");
        self.execute(source_paper, configuration).await
    }

    async fn execute(
        &self,
        source_paper: SourcePaper,
        configuration: DiscoveryConfiguration,
    ) -> UnifiedDiscoveryResult {
        let overall_start = Instant::now();
        let fan_out_start = Instant::now();

        let semaphore = Arc::new(Semaphore::new(self.executor_concurrency));
        let mut tasks = Vec::new();
        for source in DiscoverySource::ALL {
            if !configuration.is_source_enabled(source) {
                continue;
            }
            let Some(client) = self.clients.get(&source).cloned() else {
                warn!(source = source.as_str(), "no client registered for enabled source");
                continue;
            };
            let semaphore = semaphore.clone();
            let task_source_paper = source_paper.clone();
            let deadline = configuration.max_execution_time;
            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let started = Instant::now();
                match tokio::time::timeout(deadline, run_source(client.as_ref(), &task_source_paper)).await {
                    Ok(result) => result,
                    Err(_) => SourceDiscoveryResult::failure(source, SourceErrorKind::Timeout, started.elapsed()),
                }
            }));
        }

        let mut by_source: HashMap<DiscoverySource, SourceDiscoveryResult> = HashMap::new();
        for joined in future::join_all(tasks).await {
            match joined {
                Ok(result) => {
                    self.record_metrics(&result);
                    by_source.insert(result.source, result);
                }
                Err(join_err) => warn!(error = %join_err, "source task panicked"),
            }
        }

        // Deterministic output order regardless of completion order (§5).
        let source_results: Vec<SourceDiscoveryResult> = DiscoverySource::ALL
            .into_iter()
            .filter_map(|source| by_source.remove(&source))
            .collect();
        let fan_out_duration = fan_out_start.elapsed();

        let succeeded_sources: Vec<DiscoverySource> =
            source_results.iter().filter(|r| r.success).map(|r| r.source).collect();
        let failed_sources: Vec<DiscoverySource> =
            source_results.iter().filter(|r| !r.success).map(|r| r.source).collect();

        let raw_candidates: Vec<DiscoveredPaper> = source_results
            .iter()
            .filter(|r| r.success)
            .flat_map(|r| r.papers.clone())
            .collect();

        let processing_start = Instant::now();
        let feedback = self.feedback.clone();
        let bias_source_id = source_paper.id.clone();
        let processed = processor::process(&source_paper, raw_candidates, &configuration, |paper| {
            feedback
                .as_ref()
                .map(|store| store.bias_for(&bias_source_id, paper))
                .unwrap_or(0.0)
        });
        let processing_duration = processing_start.elapsed();
        let total_raw = processed.total_raw;
        let total_after_dedup = processed.total_after_dedup;

        let diversity_start = Instant::now();
        let discovered_papers = diversify(processed.papers, configuration.max_results, configuration.diversity_level);
        let diversity_duration = diversity_start.elapsed();
        let total_returned = discovered_papers.len();

        let overall_confidence = compute_overall_confidence(&succeeded_sources, &configuration, &discovered_papers);

        let mut stage_durations = HashMap::new();
        stage_durations.insert("fan_out".to_string(), fan_out_duration);
        stage_durations.insert("processing".to_string(), processing_duration);
        stage_durations.insert("diversity".to_string(), diversity_duration);

        info!(
            succeeded = succeeded_sources.len(),
            failed = failed_sources.len(),
            returned = total_returned,
            total_ms = overall_start.elapsed().as_millis() as u64,
            "discovery run complete"
        );

        UnifiedDiscoveryResult {
            source_paper,
            discovered_papers,
            source_results,
            synthesis: SynthesisMetadata {
                total_raw_results: total_raw,
                total_after_dedup,
                total_returned,
                succeeded_sources,
                failed_sources,
                total_processing: overall_start.elapsed(),
                overall_confidence,
                stage_durations,
            },
            configuration,
        }
    }
}

/// `overallConfidence = 0.4 * (succeeded / enabled) + 0.6 * avg(relevanceScore
/// of returned)`, the second term taken as `0.0` when nothing was returned.
fn compute_overall_confidence(
    succeeded_sources: &[DiscoverySource],
    configuration: &DiscoveryConfiguration,
    discovered_papers: &[DiscoveredPaper],
) -> f64 {
    let enabled = configuration.enabled_source_count().max(1);
    let succeeded_fraction = succeeded_sources.len() as f64 / enabled as f64;
    let avg_relevance = if discovered_papers.is_empty() {
        0.0
    } else {
        discovered_papers.iter().map(|p| p.relevance_score).sum::<f64>() / discovered_papers.len() as f64
    };
    (0.4 * succeeded_fraction + 0.6 * avg_relevance).clamp(0.0, 1.0)
}
