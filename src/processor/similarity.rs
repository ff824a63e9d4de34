//! Title/author similarity primitives underpinning the dedup equivalence
//! predicate of §4.2.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::types::normalize_surname;

fn non_alphanumeric_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\p{Alphanumeric}]+").expect("static pattern is valid"))
}

/// Lowercase, strip non-alphanumeric, collapse whitespace.
pub fn normalize_title(title: &str) -> String {
    non_alphanumeric_run().replace_all(title, " ").trim().to_lowercase()
}

/// Levenshtein edit distance over characters.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    if n == 0 {
        return m;
    }
    if m == 0 {
        return n;
    }

    let mut prev: Vec<usize> = (0..=m).collect();
    let mut curr = vec![0usize; m + 1];

    for i in 1..=n {
        curr[0] = i;
        for j in 1..=m {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[m]
}

/// Token bigrams of a normalized, whitespace-tokenized string.
fn token_bigrams(normalized: &str) -> HashSet<(String, String)> {
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    if tokens.len() < 2 {
        return tokens
            .windows(1)
            .map(|w| (w[0].to_string(), String::new()))
            .collect();
    }
    tokens
        .windows(2)
        .map(|w| (w[0].to_string(), w[1].to_string()))
        .collect()
}

fn jaccard(a: &HashSet<(String, String)>, b: &HashSet<(String, String)>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Similarity of two (unnormalized) titles in `[0, 1]`: `1 -
/// editDistance/maxLen` when the edit distance is small (`<= 3`),
/// otherwise a Jaccard index over token bigrams (§4.2).
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let na = normalize_title(a);
    let nb = normalize_title(b);
    if na == nb {
        return 1.0;
    }

    let distance = edit_distance(&na, &nb);
    if distance <= 3 {
        let max_len = na.chars().count().max(nb.chars().count()).max(1);
        return (1.0 - distance as f64 / max_len as f64).clamp(0.0, 1.0);
    }

    jaccard(&token_bigrams(&na), &token_bigrams(&nb))
}

/// Fraction of normalized author surnames shared between two author lists,
/// relative to the larger list (§4.2).
pub fn author_overlap(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let set_a: HashSet<String> = a.iter().map(|name| normalize_surname(name)).collect();
    let set_b: HashSet<String> = b.iter().map(|name| normalize_surname(name)).collect();
    let intersection = set_a.intersection(&set_b).count();
    let denom = set_a.len().max(set_b.len());
    if denom == 0 {
        0.0
    } else {
        intersection as f64 / denom as f64
    }
}
