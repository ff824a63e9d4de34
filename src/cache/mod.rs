//! Discovery Cache (§4.5): an in-memory TTL/LRU tier checked first, backed
//! by an optional pluggable persistent tier, with single-flight coalescing
//! so concurrent identical requests share one computation rather than
//! stampeding the source providers.

pub mod memory;
pub mod persistent;

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry as DashEntry;
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::{debug, instrument};

use crate::config::DiscoveryConfiguration;
use crate::types::{SourcePaper, UnifiedDiscoveryResult};
use memory::InMemoryCacheStore;
pub use persistent::{NoPersistentStore, PersistentCacheStore};

/// Cache key for a `(source_paper, configuration)` pair (§4.1 step 1): the
/// source paper's identity (DOI, falling back to arXiv / Semantic-Corpus id,
/// falling back to its opaque `id`) plus the configuration's normalized
/// digest, hashed together so distinct-but-equivalent configurations share
/// an entry.
pub fn cache_key(source_paper: &SourcePaper, configuration: &DiscoveryConfiguration) -> String {
    use sha2::{Digest, Sha256};

    let identity = source_paper
        .doi
        .as_deref()
        .or(source_paper.arxiv_id.as_deref())
        .or(source_paper.semantic_corpus_id.as_deref())
        .unwrap_or(&source_paper.id);

    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    hasher.update(b"|");
    hasher.update(configuration.normalized_digest().as_bytes());
    format!("discovery:{}", hex::encode(hasher.finalize()))
}

/// Two-tier cache with single-flight coalescing, sitting in front of one
/// discovery run.
pub struct DiscoveryCache {
    memory: InMemoryCacheStore<UnifiedDiscoveryResult>,
    persistent: Option<Arc<dyn PersistentCacheStore>>,
    inflight: DashMap<String, watch::Receiver<bool>>,
    ttl: Duration,
}

impl DiscoveryCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            memory: InMemoryCacheStore::new(capacity),
            persistent: None,
            inflight: DashMap::new(),
            ttl,
        }
    }

    #[must_use]
    pub fn with_persistent_store(mut self, store: Arc<dyn PersistentCacheStore>) -> Self {
        self.persistent = Some(store);
        self
    }

    async fn read_through(&self, key: &str) -> Option<UnifiedDiscoveryResult> {
        if let Some(hit) = self.memory.get(key) {
            return Some(hit);
        }
        let store = self.persistent.as_ref()?;
        match store.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<UnifiedDiscoveryResult>(&bytes) {
                Ok(value) => {
                    self.memory.set(key.to_string(), value.clone(), self.ttl);
                    Some(value)
                }
                Err(e) => {
                    debug!(error = %e, "discarding unparseable persistent cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                debug!(error = %e, "persistent cache read failed, treating as miss");
                None
            }
        }
    }

    async fn write_through(&self, key: &str, value: &UnifiedDiscoveryResult) {
        self.memory.set(key.to_string(), value.clone(), self.ttl);
        if let Some(store) = &self.persistent {
            match serde_json::to_vec(value) {
                Ok(bytes) => {
                    if let Err(e) = store.set(key, &bytes, self.ttl).await {
                        debug!(error = %e, "persistent cache write failed");
                    }
                }
                Err(e) => debug!(error = %e, "failed to serialize cache value"),
            }
        }
    }

    /// Look up `key`; if absent, run `compute` exactly once among all
    /// concurrent callers sharing that key (single-flight), caching the
    /// result only when `should_cache` accepts it (§4.5: a run where every
    /// source failed, or that yielded nothing, is never cached).
    ///
    /// Coalescing is built on a `watch` channel rather than `Notify`: a
    /// follower's `rx.borrow()` always reflects the leader's current state
    /// and `rx.changed()` compares version numbers, so there is no window in
    /// which a follower that hasn't yet started waiting can miss the
    /// leader's completion the way `Notify::notify_waiters()` can drop a
    /// waiter that had not yet polled `notified()`.
    #[instrument(skip(self, compute, should_cache), fields(cache_key = key))]
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        should_cache: impl Fn(&UnifiedDiscoveryResult) -> bool,
        compute: F,
    ) -> UnifiedDiscoveryResult
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = UnifiedDiscoveryResult>,
    {
        if let Some(hit) = self.read_through(key).await {
            debug!("cache hit");
            return hit;
        }

        loop {
            enum Role {
                Leader(watch::Sender<bool>),
                Follower(watch::Receiver<bool>),
            }

            let role = match self.inflight.entry(key.to_string()) {
                DashEntry::Occupied(entry) => Role::Follower(entry.get().clone()),
                DashEntry::Vacant(entry) => {
                    let (tx, rx) = watch::channel(false);
                    entry.insert(rx);
                    Role::Leader(tx)
                }
            };

            match role {
                Role::Leader(tx) => {
                    debug!("cache miss, computing as single-flight leader");
                    let result = compute().await;
                    if should_cache(&result) {
                        self.write_through(key, &result).await;
                    }
                    self.inflight.remove(key);
                    let _ = tx.send(true);
                    return result;
                }
                Role::Follower(mut rx) => {
                    if !*rx.borrow() {
                        // Err means the leader's sender was dropped without
                        // ever sending (its task panicked) — fall through
                        // and race to become the new leader.
                        let _ = rx.changed().await;
                    }
                    if let Some(hit) = self.read_through(key).await {
                        return hit;
                    }
                    // The leader's run wasn't cached (rejected by
                    // `should_cache`); race to become the new leader instead
                    // of returning stale data.
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscoveryConfiguration;
    use crate::types::SynthesisMetadata;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration as StdDuration;

    fn source_paper(id: &str) -> SourcePaper {
        SourcePaper {
            id: id.to_string(),
            title: "Graph Neural Networks".to_string(),
            authors: vec![],
            doi: None,
            arxiv_id: None,
            semantic_corpus_id: None,
            abstract_text: None,
            publication_year: None,
        }
    }

    fn empty_result(source_paper: SourcePaper) -> UnifiedDiscoveryResult {
        UnifiedDiscoveryResult {
            source_paper,
            discovered_papers: Vec::new(),
            source_results: Vec::new(),
            synthesis: SynthesisMetadata {
                total_raw_results: 0,
                total_after_dedup: 0,
                total_returned: 0,
                succeeded_sources: Vec::new(),
                failed_sources: Vec::new(),
                total_processing: StdDuration::from_secs(0),
                overall_confidence: 0.0,
                stage_durations: HashMap::new(),
            },
            configuration: DiscoveryConfiguration::comprehensive(),
        }
    }

    // === cache key ===

    #[test]
    fn cache_key_is_stable_for_equivalent_inputs() {
        let config = DiscoveryConfiguration::comprehensive();
        let a = cache_key(&source_paper("p1"), &config);
        let b = cache_key(&source_paper("p1"), &config);
        assert_eq!(a, b);
    }

    #[test]
    fn cache_key_differs_across_source_papers() {
        let config = DiscoveryConfiguration::comprehensive();
        let a = cache_key(&source_paper("p1"), &config);
        let b = cache_key(&source_paper("p2"), &config);
        assert_ne!(a, b);
    }

    // === get_or_compute basics ===

    #[tokio::test]
    async fn miss_then_hit_skips_second_compute() {
        let cache = DiscoveryCache::new(10, Duration::from_secs(60));
        let calls = AtomicU32::new(0);
        let key = "k1";

        let first = cache
            .get_or_compute(key, |_| true, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { empty_result(source_paper("p1")) }
            })
            .await;
        let second = cache
            .get_or_compute(key, |_| true, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { empty_result(source_paper("p1")) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.source_paper.id, second.source_paper.id);
    }

    #[tokio::test]
    async fn should_cache_false_recomputes_every_time() {
        let cache = DiscoveryCache::new(10, Duration::from_secs(60));
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            cache
                .get_or_compute("k1", |_| false, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { empty_result(source_paper("p1")) }
                })
                .await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    // === single-flight coalescing ===

    #[tokio::test]
    async fn concurrent_identical_requests_compute_once() {
        let cache = Arc::new(DiscoveryCache::new(10, Duration::from_secs(60)));
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute("shared-key", |_| true, || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async {
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            empty_result(source_paper("p1"))
                        }
                    })
                    .await
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    // === no lost wakeup: a follower registered before the leader finishes
    // always observes completion, driven by hand under a manual executor so
    // the ordering below is exact rather than a best-effort race. ===

    #[test]
    fn follower_registered_before_completion_is_woken_not_lost() {
        use tokio_test::{assert_pending, assert_ready, task};

        let cache = DiscoveryCache::new(10, Duration::from_secs(60));
        let (gate_tx, gate_rx) = tokio::sync::oneshot::channel::<()>();
        let mut gate_rx = Some(gate_rx);

        let mut leader = task::spawn(cache.get_or_compute("k", |_| true, || async {
            gate_rx.take().unwrap().await.ok();
            empty_result(source_paper("p1"))
        }));
        assert_pending!(leader.poll());

        let mut follower = task::spawn(cache.get_or_compute("k", |_| true, || async {
            panic!("follower must never become the computing leader")
        }));
        assert_pending!(follower.poll());

        gate_tx.send(()).unwrap();
        assert_ready!(leader.poll());
        assert_ready!(follower.poll());
    }
}
