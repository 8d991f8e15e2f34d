//! Keyword search over note content.
//!
//! Scoring is store-independent:
//!
//! - a single-term query scores the number of case-insensitive occurrences
//!   of the query in the note (plain substring search);
//! - a multi-term query scores each distinct query term (three or more
//!   characters, not a stopword) found in the note, plus a bonus for every
//!   occurrence of the whole phrase.
//!
//! Notes scoring zero are dropped. Ties are broken by path so results are
//! deterministic.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::models::Note;
use crate::store::NoteStore;

/// Terms shorter than this are ignored in multi-term queries.
const MIN_TERM_LEN: usize = 3;

const STOPWORDS: &[&str] = &[
    "and", "are", "but", "for", "from", "has", "have", "into", "its", "not", "now", "that",
    "the", "their", "then", "there", "these", "this", "was", "were", "what", "when", "which",
    "will", "with", "you", "your",
];

/// A scored search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub note: Note,
    /// Raw keyword score (higher is better, always > 0).
    pub score: f64,
}

/// Distinct lowercase query terms used for multi-term scoring.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    query
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() >= MIN_TERM_LEN && !STOPWORDS.contains(&t.as_str()))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Score `content` against `query`; zero means no match.
pub fn score_content(content: &str, query: &str) -> f64 {
    let phrase = query.trim().to_lowercase();
    if phrase.is_empty() {
        return 0.0;
    }
    let haystack = content.to_lowercase();
    let phrase_hits = haystack.matches(phrase.as_str()).count() as f64;

    let terms = query_terms(&phrase);
    if terms.len() <= 1 {
        return phrase_hits;
    }

    let matched = terms
        .iter()
        .filter(|t| haystack.contains(t.as_str()))
        .count() as f64;
    matched + phrase_hits * terms.len() as f64
}

/// Scan every note in `store` and return the best `limit` matches.
///
/// Unreadable notes are logged and skipped.
pub async fn keyword_search<S: NoteStore + ?Sized>(
    store: &S,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchHit>> {
    if query.trim().is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let mut hits = Vec::new();
    for entry in store.list("", true)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "search: skipping unlistable entry");
                continue;
            }
        };
        match store.read(&entry.path).await {
            Ok(note) => {
                let score = score_content(&note.content, query);
                if score > 0.0 {
                    hits.push(SearchHit { note, score });
                }
            }
            Err(e) => {
                tracing::warn!(path = %entry.path, error = %e, "search: skipping unreadable note");
            }
        }
    }

    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.note.path.cmp(&b.note.path))
    });
    hits.truncate(limit);

    tracing::debug!(query, results = hits.len(), "keyword search completed");
    Ok(hits)
}

/// Min-max normalise raw scores into `[0, 1]`.
///
/// A single hit, or hits that all share one score, normalise to `1.0`.
pub fn normalize_scores(hits: &[SearchHit]) -> Vec<f64> {
    if hits.is_empty() {
        return Vec::new();
    }
    let min = hits.iter().map(|h| h.score).fold(f64::INFINITY, f64::min);
    let max = hits.iter().map(|h| h.score).fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    hits.iter()
        .map(|h| {
            if range.abs() < f64::EPSILON {
                1.0
            } else {
                (h.score - min) / range
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryNoteStore;

    fn make_hit(path: &str, score: f64) -> SearchHit {
        SearchHit {
            note: Note::parse(path, ""),
            score,
        }
    }

    #[test]
    fn test_single_term_counts_occurrences() {
        assert_eq!(score_content("Rust rust RUST", "rust"), 3.0);
        assert_eq!(score_content("nothing here", "rust"), 0.0);
        assert_eq!(score_content("anything", "   "), 0.0);
    }

    #[test]
    fn test_multi_term_counts_distinct_terms() {
        let content = "Notes on machine learning and neural networks.";
        assert_eq!(score_content(content, "machine learning"), 2.0 + 2.0);
        assert_eq!(score_content(content, "machine vision"), 1.0);
        assert_eq!(score_content(content, "the and for"), 0.0);
    }

    #[test]
    fn test_query_terms_dedup_and_filter() {
        assert_eq!(
            query_terms("The Rust, rust and an API"),
            vec!["rust".to_string(), "api".to_string()]
        );
    }

    #[tokio::test]
    async fn test_keyword_search_ranks_and_limits() {
        let store = InMemoryNoteStore::with_notes([
            ("a.md", "rust"),
            ("b.md", "rust rust rust"),
            ("c.md", "python"),
            ("d.md", "rust rust"),
        ]);
        let hits = keyword_search(&store, "rust", 2).await.unwrap();
        let paths: Vec<&str> = hits.iter().map(|h| h.note.path.as_str()).collect();
        assert_eq!(paths, vec!["b.md", "d.md"]);
    }

    #[tokio::test]
    async fn test_keyword_search_skips_unreadable() {
        let store = InMemoryNoteStore::with_notes([("a.md", "rust")]);
        store.insert_unreadable("b.md");
        let hits = store.search("rust", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_keyword_search_tie_break_by_path() {
        let store = InMemoryNoteStore::with_notes([("z.md", "rust"), ("a.md", "rust")]);
        let hits = keyword_search(&store, "rust", 10).await.unwrap();
        assert_eq!(hits[0].note.path, "a.md");
    }

    #[test]
    fn test_normalize_range() {
        let hits = vec![make_hit("a", 10.0), make_hit("b", 5.0), make_hit("c", 0.0)];
        let norm = normalize_scores(&hits);
        assert!((norm[0] - 1.0).abs() < 1e-9);
        assert!((norm[1] - 0.5).abs() < 1e-9);
        assert!((norm[2] - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_all_equal() {
        let hits = vec![make_hit("a", 3.0), make_hit("b", 3.0)];
        for s in normalize_scores(&hits) {
            assert!((s - 1.0).abs() < 1e-9);
        }
    }
}
