//! End-to-end scenarios against `Orchestrator`, using in-process fake
//! `SourceClient`s (no real network) so the fan-out, cache, and synthesis
//! layers are exercised together the way the unit tests in each module
//! cannot.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use discovery_orchestrator::config::{DiscoveryConfiguration, DiversityLevel};
use discovery_orchestrator::error::SourceErrorKind;
use discovery_orchestrator::orchestrator::{Orchestrator, OrchestratorSettings};
use discovery_orchestrator::sources::SourceClient;
use discovery_orchestrator::types::{
    DiscoveredPaper, DiscoverySource, RelationshipType, SourceMetadata, SourcePaper,
};

fn source_paper() -> SourcePaper {
    SourcePaper {
        id: "P1".to_string(),
        title: "Graph Neural Networks".to_string(),
        authors: vec!["A. Lee".to_string(), "B. Kim".to_string()],
        doi: None,
        arxiv_id: None,
        semantic_corpus_id: None,
        abstract_text: None,
        publication_year: Some(2021),
    }
}

fn paper(source: DiscoverySource, title: &str, doi: Option<&str>) -> DiscoveredPaper {
    DiscoveredPaper {
        doi: doi.map(String::from),
        source_ids: Default::default(),
        title: title.to_string(),
        authors: vec!["C. Zhao".to_string()],
        abstract_text: None,
        publication_date: None,
        publication_year: Some(2019),
        journal: Some("Journal of Example Studies".to_string()),
        primary_topic: Some("graph-learning".to_string()),
        citation_count: Some(120),
        influential_citation_count: None,
        reference_count: None,
        open_access: false,
        provider_relevance: 0.7,
        relevance_score: 0.0,
        source_reliability: 0.9,
        data_completeness: 0.6,
        discovery_source: source,
        relationship_type: RelationshipType::SemanticSimilarity,
        metadata: Default::default(),
    }
}

/// A scriptable fake adapter: returns a fixed paper list after an optional
/// delay, or fails with a fixed error, and counts its own invocations.
struct ScriptedClient {
    source: DiscoverySource,
    papers: Vec<DiscoveredPaper>,
    delay: Duration,
    fail: Option<SourceErrorKind>,
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl SourceClient for ScriptedClient {
    fn source(&self) -> DiscoverySource {
        self.source
    }

    async fn discover(
        &self,
        _source_paper: &SourcePaper,
    ) -> Result<(Vec<DiscoveredPaper>, SourceMetadata), SourceErrorKind> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delay > Duration::ZERO {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(err) = &self.fail {
            return Err(err.clone());
        }
        Ok((self.papers.clone(), SourceMetadata::new()))
    }
}

fn counting_client(
    source: DiscoverySource,
    papers: Vec<DiscoveredPaper>,
    delay: Duration,
    fail: Option<SourceErrorKind>,
) -> (Arc<ScriptedClient>, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let client = Arc::new(ScriptedClient {
        source,
        papers,
        delay,
        fail,
        calls: calls.clone(),
    });
    (client, calls)
}

// === S1: happy path, three sources ===

#[tokio::test]
async fn s1_happy_path_three_sources() {
    let (citation, _) = counting_client(
        DiscoverySource::CitationRegistry,
        vec![
            paper(DiscoverySource::CitationRegistry, "Paper A", Some("10.1/a")),
            paper(DiscoverySource::CitationRegistry, "Paper B", Some("10.1/b")),
            paper(DiscoverySource::CitationRegistry, "Paper C", Some("10.1/c")),
        ],
        Duration::ZERO,
        None,
    );
    let (semantic, _) = counting_client(
        DiscoverySource::SemanticCorpus,
        vec![
            // Duplicate of Paper A by DOI.
            paper(DiscoverySource::SemanticCorpus, "Paper A", Some("10.1/a")),
            paper(DiscoverySource::SemanticCorpus, "Paper D", Some("10.1/d")),
            paper(DiscoverySource::SemanticCorpus, "Paper E", Some("10.1/e")),
            paper(DiscoverySource::SemanticCorpus, "Paper F", Some("10.1/f")),
        ],
        Duration::ZERO,
        None,
    );
    let (trend, _) = counting_client(
        DiscoverySource::TrendAnalyzer,
        vec![
            paper(DiscoverySource::TrendAnalyzer, "Paper G", Some("10.1/g")),
            {
                let mut p = paper(DiscoverySource::TrendAnalyzer, "Paper H", Some("10.1/h"));
                p.open_access = true;
                p
            },
        ],
        Duration::ZERO,
        None,
    );

    let orchestrator = Orchestrator::new(OrchestratorSettings::default())
        .with_client(citation)
        .with_client(semantic)
        .with_client(trend);

    let result = orchestrator
        .discover(source_paper(), DiscoveryConfiguration::comprehensive())
        .await
        .unwrap();

    assert_eq!(result.synthesis.succeeded_sources.len(), 3);
    assert!(result.synthesis.failed_sources.is_empty());
    assert_eq!(result.synthesis.total_raw_results, 9);
    assert_eq!(result.synthesis.total_after_dedup, 8);
    assert!(result.discovered_papers.len() <= 50);
    assert!(result.synthesis.overall_confidence >= 0.6);

    let scores: Vec<f64> = result.discovered_papers.iter().map(|p| p.relevance_score).collect();
    for window in scores.windows(2) {
        assert!(window[0] >= window[1], "results must be sorted by descending relevance");
    }
}

// === S2: timeout on one source ===

#[tokio::test(start_paused = true)]
async fn s2_timeout_on_one_source() {
    let (citation, _) = counting_client(
        DiscoverySource::CitationRegistry,
        vec![paper(DiscoverySource::CitationRegistry, "Paper A", Some("10.1/a"))],
        Duration::ZERO,
        None,
    );
    let (semantic, _) = counting_client(
        DiscoverySource::SemanticCorpus,
        vec![paper(DiscoverySource::SemanticCorpus, "Paper B", Some("10.1/b"))],
        Duration::ZERO,
        None,
    );
    let (trend, _) = counting_client(
        DiscoverySource::TrendAnalyzer,
        vec![],
        Duration::from_secs(2),
        None,
    );

    let orchestrator = Orchestrator::new(OrchestratorSettings::default())
        .with_client(citation)
        .with_client(semantic)
        .with_client(trend);

    let config = DiscoveryConfiguration::custom()
        .with_max_execution_time(Duration::from_millis(500))
        .with_min_relevance_threshold(0.0);

    let result = orchestrator.discover(source_paper(), config).await.unwrap();

    assert_eq!(result.synthesis.failed_sources, vec![DiscoverySource::TrendAnalyzer]);
    assert_eq!(result.synthesis.succeeded_sources.len(), 2);
    let trend_result = result
        .source_results
        .iter()
        .find(|r| r.source == DiscoverySource::TrendAnalyzer)
        .unwrap();
    assert!(matches!(trend_result.error, Some(SourceErrorKind::Timeout)));
    assert_eq!(result.discovered_papers.len(), 2);
}

// === S3: all sources fail, nothing cached ===

#[tokio::test]
async fn s3_all_sources_fail_and_result_is_not_cached() {
    let unavailable = || SourceErrorKind::ProviderUnavailable {
        message: "simulated outage".to_string(),
    };
    let (citation, citation_calls) = counting_client(
        DiscoverySource::CitationRegistry,
        vec![],
        Duration::ZERO,
        Some(unavailable()),
    );
    let (semantic, _) =
        counting_client(DiscoverySource::SemanticCorpus, vec![], Duration::ZERO, Some(unavailable()));
    let (trend, _) = counting_client(DiscoverySource::TrendAnalyzer, vec![], Duration::ZERO, Some(unavailable()));

    let orchestrator = Orchestrator::new(OrchestratorSettings::default())
        .with_client(citation)
        .with_client(semantic)
        .with_client(trend);

    let config = DiscoveryConfiguration::comprehensive();
    let result = orchestrator.discover(source_paper(), config.clone()).await.unwrap();

    assert!(result.discovered_papers.is_empty());
    assert_eq!(result.synthesis.failed_sources.len(), 3);
    assert_eq!(result.synthesis.overall_confidence, 0.0);

    // Not cached: a second call re-invokes the (still failing) client.
    assert_eq!(citation_calls.load(Ordering::SeqCst), 1);
    orchestrator.discover(source_paper(), config).await.unwrap();
    assert_eq!(citation_calls.load(Ordering::SeqCst), 2);
}

// === S4: single-flight coalescing ===

#[tokio::test]
async fn s4_concurrent_identical_requests_invoke_each_source_once() {
    let (citation, citation_calls) = counting_client(
        DiscoverySource::CitationRegistry,
        vec![paper(DiscoverySource::CitationRegistry, "Paper A", Some("10.1/a"))],
        Duration::from_millis(30),
        None,
    );
    let (semantic, semantic_calls) = counting_client(
        DiscoverySource::SemanticCorpus,
        vec![paper(DiscoverySource::SemanticCorpus, "Paper B", Some("10.1/b"))],
        Duration::from_millis(30),
        None,
    );
    let (trend, trend_calls) = counting_client(
        DiscoverySource::TrendAnalyzer,
        vec![paper(DiscoverySource::TrendAnalyzer, "Paper C", Some("10.1/c"))],
        Duration::from_millis(30),
        None,
    );

    let orchestrator = Arc::new(
        Orchestrator::new(OrchestratorSettings::default())
            .with_client(citation)
            .with_client(semantic)
            .with_client(trend),
    );

    let mut handles = Vec::new();
    for _ in 0..10 {
        let orchestrator = orchestrator.clone();
        handles.push(tokio::spawn(async move {
            orchestrator
                .discover(source_paper(), DiscoveryConfiguration::comprehensive())
                .await
                .unwrap()
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    assert_eq!(citation_calls.load(Ordering::SeqCst), 1);
    assert_eq!(semantic_calls.load(Ordering::SeqCst), 1);
    assert_eq!(trend_calls.load(Ordering::SeqCst), 1);

    let first = &results[0];
    for other in &results[1..] {
        assert_eq!(other.discovered_papers.len(), first.discovered_papers.len());
        assert_eq!(other.synthesis.total_returned, first.synthesis.total_returned);
    }
}

// === S5: diversity HIGH vs LOW ===

#[tokio::test]
async fn s5_diversity_high_prefers_distinct_axes_over_low() {
    let mut papers = Vec::new();
    for i in 0..20 {
        let mut p = paper(DiscoverySource::CitationRegistry, &format!("Paper {i}"), Some(&format!("10.1/p{i}")));
        p.provider_relevance = 0.95 - (i as f64) * 0.0375; // spans ~0.95 down to ~0.20 pre-synthesis
        p.authors = vec!["Same Author".to_string()];
        p.journal = Some("Same Venue".to_string());
        p.primary_topic = Some("same-topic".to_string());
        papers.push(p);
    }
    // Give the lowest-ranked candidate a distinct topic/venue/author so HIGH
    // diversity has a reason to reach for it.
    let distinct = papers.last_mut().unwrap();
    distinct.primary_topic = Some("distinct-topic".to_string());
    distinct.journal = Some("Distinct Venue".to_string());
    distinct.authors = vec!["Distinct Author".to_string()];

    let (citation, _) = counting_client(DiscoverySource::CitationRegistry, papers, Duration::ZERO, None);

    let low_orchestrator =
        Orchestrator::new(OrchestratorSettings::default()).with_client(citation.clone());
    let low_config = DiscoveryConfiguration::custom()
        .with_sources(true, false, false)
        .with_max_results(5)
        .with_min_relevance_threshold(0.0)
        .with_diversity_level(DiversityLevel::Low);
    let low_result = low_orchestrator.discover(source_paper(), low_config).await.unwrap();

    let high_orchestrator = Orchestrator::new(OrchestratorSettings::default()).with_client(citation);
    let high_config = DiscoveryConfiguration::custom()
        .with_sources(true, false, false)
        .with_max_results(5)
        .with_min_relevance_threshold(0.0)
        .with_diversity_level(DiversityLevel::High);
    let high_result = high_orchestrator.discover(source_paper(), high_config).await.unwrap();

    assert_eq!(low_result.discovered_papers.len(), 5);
    assert_eq!(high_result.discovered_papers.len(), 5);

    let low_has_distinct = low_result.discovered_papers.iter().any(|p| p.journal.as_deref() == Some("Distinct Venue"));
    let high_has_distinct = high_result
        .discovered_papers
        .iter()
        .any(|p| p.journal.as_deref() == Some("Distinct Venue"));

    assert!(!low_has_distinct, "LOW diversity should return pure top-5 by score");
    assert!(high_has_distinct, "HIGH diversity should reach for the distinct-axis candidate");
}

// === S6: cache hit ===

#[tokio::test]
async fn s6_second_identical_call_is_served_from_cache() {
    let (citation, calls) = counting_client(
        DiscoverySource::CitationRegistry,
        vec![paper(DiscoverySource::CitationRegistry, "Paper A", Some("10.1/a"))],
        Duration::ZERO,
        None,
    );
    let (semantic, _) = counting_client(DiscoverySource::SemanticCorpus, vec![], Duration::ZERO, None);

    let orchestrator = Orchestrator::new(OrchestratorSettings::default())
        .with_client(citation)
        .with_client(semantic);

    let config = DiscoveryConfiguration::quick();
    let first = orchestrator.discover(source_paper(), config.clone()).await.unwrap();

    let started = std::time::Instant::now();
    let second = orchestrator.discover(source_paper(), config).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.discovered_papers.len(), second.discovered_papers.len());
    assert!(elapsed < Duration::from_millis(50), "cache hit should be near-instant, took {elapsed:?}");
}
