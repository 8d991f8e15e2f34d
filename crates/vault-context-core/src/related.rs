//! Lexical related-note discovery.
//!
//! The leading words of the source note become a keyword query; the
//! store's search ranks the rest of the vault against it. This is a
//! heuristic: a weak or empty result is an accepted outcome, never an error.

use crate::models::Note;
use crate::store::NoteStore;
use crate::tokens::leading_words;

/// Number of leading words of the source note used as the query.
pub const RELATED_QUERY_WORDS: usize = 100;

pub struct RelatedNoteFinder<'a, S: NoteStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: NoteStore + ?Sized> RelatedNoteFinder<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Up to `max_results` notes similar to `source`, excluding `source`
    /// itself, in search order.
    pub async fn find_related(&self, source: &Note, max_results: usize) -> Vec<Note> {
        if max_results == 0 {
            return Vec::new();
        }
        let query = leading_words(&source.content, RELATED_QUERY_WORDS);
        if query.is_empty() {
            return Vec::new();
        }

        let hits = match self.store.search(&query, max_results + 1).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(path = %source.path, error = %e, "related search failed");
                return Vec::new();
            }
        };

        hits.into_iter()
            .map(|hit| hit.note)
            .filter(|note| note.path != source.path)
            .take(max_results)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryNoteStore;

    fn store() -> InMemoryNoteStore {
        InMemoryNoteStore::with_notes([
            ("ml.md", "machine learning with neural networks and gradient descent"),
            ("dl.md", "deep neural networks need gradient descent"),
            ("nn.md", "neural networks overview"),
            ("cooking.md", "pasta recipes"),
        ])
    }

    #[tokio::test]
    async fn test_excludes_source_and_bounds_results() {
        let store = store();
        let source = store.read("ml.md").await.unwrap();
        let related = RelatedNoteFinder::new(&store).find_related(&source, 2).await;
        assert_eq!(related.len(), 2);
        assert!(related.iter().all(|n| n.path != "ml.md"));
        assert_eq!(related[0].path, "dl.md");
    }

    #[tokio::test]
    async fn test_unrelated_vault_yields_nothing() {
        let store = store();
        let source = store.read("cooking.md").await.unwrap();
        let related = RelatedNoteFinder::new(&store).find_related(&source, 3).await;
        assert!(related.is_empty());
    }

    #[tokio::test]
    async fn test_empty_source_and_zero_limit() {
        let store = store();
        let empty = Note::parse("empty.md", "");
        assert!(RelatedNoteFinder::new(&store).find_related(&empty, 3).await.is_empty());
        let source = store.read("ml.md").await.unwrap();
        assert!(RelatedNoteFinder::new(&store).find_related(&source, 0).await.is_empty());
    }
}
