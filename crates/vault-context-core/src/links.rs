//! Backlink discovery by full vault scan.
//!
//! No reverse-link index is kept: every call lists and reads every note.

use crate::models::BacklinkInfo;
use crate::store::NoteStore;
use crate::wikilink::{excerpt, link_matches, parse_links};

/// Characters of context kept on each side of a matched link.
pub const BACKLINK_CONTEXT_RADIUS: usize = 50;

/// Finds notes that link to a target via `[[wikilinks]]`.
pub struct LinkIndexer<'a, S: NoteStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: NoteStore + ?Sized> LinkIndexer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// One [`BacklinkInfo`] per note containing at least one link to
    /// `target_name`, in listing order.
    ///
    /// Notes that fail to list or read are logged and skipped. If the vault
    /// root cannot be listed the result is empty.
    pub async fn find_backlinks(&self, target_name: &str) -> Vec<BacklinkInfo> {
        let listing = match self.store.list("", true) {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!(error = %e, "backlink scan: vault listing failed");
                return Vec::new();
            }
        };

        let mut backlinks = Vec::new();
        for entry in listing {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "backlink scan: skipping unlistable entry");
                    continue;
                }
            };
            let note = match self.store.read(&entry.path).await {
                Ok(note) => note,
                Err(e) => {
                    tracing::warn!(path = %entry.path, error = %e, "backlink scan: skipping note");
                    continue;
                }
            };

            let first = parse_links(&note.content).find(|link| link_matches(link.target, target_name));
            if let Some(link) = first {
                backlinks.push(BacklinkInfo {
                    note_path: note.path.clone(),
                    note_title: note.title.clone(),
                    context: excerpt(&note.content, link.start, link.end, BACKLINK_CONTEXT_RADIUS)
                        .to_string(),
                });
            }
        }

        tracing::debug!(target_name, count = backlinks.len(), "backlink scan completed");
        backlinks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryNoteStore;

    #[tokio::test]
    async fn test_finds_plain_and_display_links() {
        let store = InMemoryNoteStore::with_notes([
            ("Other Note.md", "target body"),
            ("a.md", "See [[Other Note]] for details."),
            ("b.md", "Also [[Other Note|see here]]."),
            ("c.md", "Unrelated [[Something Else]]."),
        ]);
        let backlinks = LinkIndexer::new(&store).find_backlinks("Other Note").await;
        let paths: Vec<&str> = backlinks.iter().map(|b| b.note_path.as_str()).collect();
        assert_eq!(paths, vec!["a.md", "b.md"]);
        assert!(backlinks[0].context.contains("[[Other Note]]"));
        assert!(backlinks[1].context.contains("[[Other Note|see here]]"));
    }

    #[tokio::test]
    async fn test_one_entry_per_referring_note() {
        let store = InMemoryNoteStore::with_notes([(
            "a.md",
            "first [[Topic]] then again [[Topic]] and [[Topic|t]]",
        )]);
        let backlinks = LinkIndexer::new(&store).find_backlinks("Topic").await;
        assert_eq!(backlinks.len(), 1);
        assert_eq!(backlinks[0].note_title, "a");
    }

    #[tokio::test]
    async fn test_name_with_extension_matches_bare_link() {
        let store = InMemoryNoteStore::with_notes([("a.md", "[[Topic]]")]);
        let backlinks = LinkIndexer::new(&store).find_backlinks("Topic.md").await;
        assert_eq!(backlinks.len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_note_is_skipped() {
        let store = InMemoryNoteStore::with_notes([("a.md", "[[Topic]]"), ("c.md", "[[Topic]]")]);
        store.insert_unreadable("b.md");
        let backlinks = LinkIndexer::new(&store).find_backlinks("Topic").await;
        assert_eq!(backlinks.len(), 2);
    }

    #[tokio::test]
    async fn test_no_references() {
        let store = InMemoryNoteStore::with_notes([("a.md", "no links")]);
        assert!(LinkIndexer::new(&store).find_backlinks("Topic").await.is_empty());
    }
}
