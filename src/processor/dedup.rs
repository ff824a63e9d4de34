//! Deduplication (§4.2): groups candidates into equivalence classes and
//! keeps one representative per class.

use crate::processor::similarity::{author_overlap, title_similarity};
use crate::types::DiscoveredPaper;

/// Equivalence predicate of §4.2.
pub(crate) fn are_equivalent(a: &DiscoveredPaper, b: &DiscoveredPaper) -> bool {
    if let (Some(doi_a), Some(doi_b)) = (a.doi.as_deref(), b.doi.as_deref()) {
        if !doi_a.is_empty() && !doi_b.is_empty() && doi_a.eq_ignore_ascii_case(doi_b) {
            return true;
        }
    }

    let title_sim = title_similarity(&a.title, &b.title);
    if title_sim < 0.85 {
        return false;
    }

    let overlap = author_overlap(&a.authors, &b.authors);
    if overlap >= 0.7 {
        return true;
    }

    if title_sim >= 0.95 {
        if let (Some(ya), Some(yb)) = (a.publication_year, b.publication_year) {
            return (ya - yb).abs() <= 1;
        }
    }

    false
}

/// Simple union-find over candidate indices, used to materialize
/// equivalence classes from the pairwise predicate above (equivalence is
/// not guaranteed transitive in the strict mathematical sense, but closing
/// under the union-find keeps the dedup behavior deterministic and
/// order-independent, which is what §4.2 calls for in practice).
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

/// Select the best representative from an equivalence class by the
/// priority chain of §4.2: has-DOI > no-DOI, then higher citation count,
/// then higher data completeness, with source-preference ties broken
/// CitationRegistry > SemanticCorpus > TrendAnalyzer.
fn pick_representative(mut group: Vec<DiscoveredPaper>) -> DiscoveredPaper {
    group.sort_by(|a, b| {
        let a_has_doi = a.doi.as_deref().is_some_and(|d| !d.is_empty());
        let b_has_doi = b.doi.as_deref().is_some_and(|d| !d.is_empty());
        b_has_doi
            .cmp(&a_has_doi)
            .then_with(|| b.citation_count.unwrap_or(0).cmp(&a.citation_count.unwrap_or(0)))
            .then_with(|| {
                b.data_completeness
                    .partial_cmp(&a.data_completeness)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.discovery_source.priority_rank().cmp(&b.discovery_source.priority_rank()))
    });
    group.into_iter().next().expect("group is non-empty")
}

/// Deduplicate candidates, returning `(representatives, dropped_empty_title_count)`.
/// Candidates with an empty title are dropped silently (§4.2 "Failure
/// semantics"); the caller increments an observability counter with the
/// returned count.
pub fn deduplicate(candidates: Vec<DiscoveredPaper>) -> (Vec<DiscoveredPaper>, usize) {
    let mut dropped_empty_title = 0usize;
    let candidates: Vec<DiscoveredPaper> = candidates
        .into_iter()
        .filter(|p| {
            let keep = !p.title.trim().is_empty();
            if !keep {
                dropped_empty_title += 1;
            }
            keep
        })
        .collect();

    let n = candidates.len();
    let mut dsu = DisjointSet::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            if are_equivalent(&candidates[i], &candidates[j]) {
                dsu.union(i, j);
            }
        }
    }

    let mut groups: std::collections::HashMap<usize, Vec<DiscoveredPaper>> =
        std::collections::HashMap::new();
    for (idx, paper) in candidates.into_iter().enumerate() {
        let root = dsu.find(idx);
        groups.entry(root).or_default().push(paper);
    }

    let representatives = groups.into_values().map(pick_representative).collect();
    (representatives, dropped_empty_title)
}
