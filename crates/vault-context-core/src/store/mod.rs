//! Read-only note storage abstraction.
//!
//! The [`NoteStore`] trait is everything the context pipeline needs from a
//! vault: read one note, enumerate notes under a folder, and a keyword
//! search. Implementations must not cache note contents between calls; the
//! vault is edited externally at any time.
//!
//! | Implementation | Backing |
//! |----------------|---------|
//! | [`memory::InMemoryNoteStore`] | `BTreeMap` behind a `RwLock` (tests, embedding) |
//! | `vault_context::vault::FsNoteStore` | Local directory tree |

pub mod memory;

use async_trait::async_trait;

use crate::error::{Result, VaultError};
use crate::models::{Note, NotePath};
use crate::search::{keyword_search, SearchHit};

/// Lazily produced, finite, non-restartable sequence of note paths.
pub type NoteListing<'a> = Box<dyn Iterator<Item = Result<NotePath>> + Send + 'a>;

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Read and parse the note at a vault-relative path.
    ///
    /// Fails with [`VaultError::InvalidPath`] before touching storage when
    /// the path escapes the vault root, and with [`VaultError::NotFound`]
    /// when no document exists there.
    async fn read(&self, path: &str) -> Result<Note>;

    /// Enumerate notes under `folder` (`""` for the vault root).
    ///
    /// A folder with no notes, or one that does not exist, yields an empty
    /// sequence. Individual entries may fail; callers skip those.
    fn list(&self, folder: &str, recursive: bool) -> Result<NoteListing<'_>>;

    /// Keyword search over note content, best matches first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        keyword_search(self, query, limit).await
    }
}

/// Lexically normalise a vault-relative path.
///
/// Backslashes are treated as separators, `.` segments are dropped and `..`
/// pops the previous segment. Absolute paths and any `..` that would climb
/// above the root are rejected.
pub fn normalize_path(path: &str) -> Result<String> {
    let unified = path.replace('\\', "/");
    if unified.starts_with('/') || has_drive_prefix(&unified) {
        return Err(VaultError::InvalidPath(path.to_string()));
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(VaultError::InvalidPath(path.to_string()));
                }
            }
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain() {
        assert_eq!(normalize_path("Projects/ML.md").unwrap(), "Projects/ML.md");
        assert_eq!(normalize_path("./a//b/./c.md").unwrap(), "a/b/c.md");
        assert_eq!(normalize_path("a/../b.md").unwrap(), "b.md");
        assert_eq!(normalize_path("a\\b.md").unwrap(), "a/b.md");
        assert_eq!(normalize_path("").unwrap(), "");
    }

    #[test]
    fn test_normalize_rejects_escape() {
        for bad in ["../outside.md", "a/../../x.md", "/etc/passwd", "C:\\x.md", "..\\x.md"] {
            assert!(
                matches!(normalize_path(bad), Err(VaultError::InvalidPath(_))),
                "expected rejection for {}",
                bad
            );
        }
    }
}
