//! Filesystem-backed note store.
//!
//! Serves a local directory tree of markdown files. Every read goes to
//! disk; nothing is cached, so edits made in Obsidian (or anywhere else)
//! are visible on the next call.
//!
//! # Path safety
//!
//! Requested paths are normalised lexically first, which rejects absolute
//! paths and `..` escapes before the filesystem is touched. The resolved
//! file is then canonicalised and must still lie under the canonical vault
//! root, so a symlink pointing out of the vault is refused as an invalid
//! path rather than read.
//!
//! # Listing
//!
//! Listings walk the tree lazily with `walkdir` in file-name order,
//! keeping files that match the include globs and none of the exclude globs
//! (relative to the vault root). `.obsidian/`, `.trash/` and `.git/` are
//! always excluded. Reads apply the same filter, so a file that never
//! lists (editor state, attachments) is reported as not found.

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use vault_context_core::models::{Note, NotePath};
use vault_context_core::store::{normalize_path, NoteListing, NoteStore};
use vault_context_core::{Result, VaultError};

use crate::config::VaultConfig;

const DEFAULT_EXCLUDES: [&str; 3] = ["**/.obsidian/**", "**/.trash/**", "**/.git/**"];

pub struct FsNoteStore {
    root: PathBuf,
    include: GlobSet,
    exclude: GlobSet,
    follow_symlinks: bool,
}

impl FsNoteStore {
    /// Open the vault described by `config`. The root must be an existing
    /// directory.
    pub fn open(config: &VaultConfig) -> anyhow::Result<Self> {
        if !config.root.is_dir() {
            bail!(
                "Vault root does not exist or is not a directory: {}",
                config.root.display()
            );
        }
        let root = std::fs::canonicalize(&config.root)
            .with_context(|| format!("Failed to resolve vault root: {}", config.root.display()))?;

        let include = build_globset(&config.include_globs)?;
        let mut excludes: Vec<String> = DEFAULT_EXCLUDES.iter().map(|p| p.to_string()).collect();
        excludes.extend(config.exclude_globs.iter().cloned());
        let exclude = build_globset(&excludes)?;

        tracing::debug!(root = %root.display(), "vault opened");

        Ok(Self {
            root,
            include,
            exclude,
            follow_symlinks: config.follow_symlinks,
        })
    }

    /// Canonical vault root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a vault-relative path passes the include and exclude globs.
    fn is_note_path(&self, relative: &str) -> bool {
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }

    /// Confirm `full` still lies inside the vault once symlinks are resolved.
    async fn ensure_within_root(&self, requested: &str, full: &Path) -> Result<()> {
        let canonical = tokio::fs::canonicalize(full)
            .await
            .map_err(|e| VaultError::io(requested, e))?;
        if !canonical.starts_with(&self.root) {
            tracing::warn!(path = requested, "refusing path that resolves outside the vault");
            return Err(VaultError::InvalidPath(requested.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NoteStore for FsNoteStore {
    async fn read(&self, path: &str) -> Result<Note> {
        let normalized = normalize_path(path)?;
        if normalized.is_empty() {
            return Err(VaultError::InvalidPath(path.to_string()));
        }
        if !self.is_note_path(&normalized) {
            return Err(VaultError::NotFound(path.to_string()));
        }
        let full = self.root.join(&normalized);

        match tokio::fs::metadata(&full).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(VaultError::NotFound(path.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VaultError::NotFound(path.to_string()));
            }
            Err(e) => return Err(VaultError::io(normalized, e)),
        }
        self.ensure_within_root(&normalized, &full).await?;

        let raw = tokio::fs::read_to_string(&full)
            .await
            .map_err(|e| VaultError::io(normalized.clone(), e))?;

        tracing::debug!(path = %normalized, bytes = raw.len(), "note read");
        Ok(Note::parse(normalized, &raw))
    }

    fn list(&self, folder: &str, recursive: bool) -> Result<NoteListing<'_>> {
        let folder = normalize_path(folder)?;
        let start = self.root.join(&folder);
        if !start.is_dir() {
            return Ok(Box::new(std::iter::empty()));
        }

        let mut walker = WalkDir::new(&start)
            .min_depth(1)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name();
        if !recursive {
            walker = walker.max_depth(1);
        }

        let iter = walker.into_iter().filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    return Some(Err(VaultError::io(path, std::io::Error::from(e))));
                }
            };
            if !entry.file_type().is_file() {
                return None;
            }

            let relative = entry.path().strip_prefix(&self.root).ok()?;
            let rel_str = relative.to_string_lossy().replace('\\', "/");
            if !self.is_note_path(&rel_str) {
                return None;
            }

            let modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from);

            Some(Ok(NotePath {
                path: rel_str,
                modified,
            }))
        });

        Ok(Box::new(iter))
    }
}

fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(root: &Path) -> VaultConfig {
        VaultConfig {
            root: root.to_path_buf(),
            include_globs: vec!["**/*.md".to_string()],
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }

    fn vault() -> (TempDir, FsNoteStore) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("Projects/Archive")).unwrap();
        fs::create_dir_all(root.join(".obsidian")).unwrap();
        fs::write(root.join("Inbox.md"), "root note").unwrap();
        fs::write(
            root.join("Projects/ML.md"),
            "---\ntitle: Machine Learning\n---\nmodels",
        )
        .unwrap();
        fs::write(root.join("Projects/Archive/Old.md"), "old").unwrap();
        fs::write(root.join("Projects/image.png"), [0u8, 1, 2]).unwrap();
        fs::write(root.join(".obsidian/workspace.md"), "internal").unwrap();
        let store = FsNoteStore::open(&config(root)).unwrap();
        (tmp, store)
    }

    fn paths(listing: NoteListing<'_>) -> Vec<String> {
        listing.map(|p| p.unwrap().path).collect()
    }

    #[tokio::test]
    async fn test_read_parses_note() {
        let (_tmp, store) = vault();
        let note = store.read("Projects/ML.md").await.unwrap();
        assert_eq!(note.path, "Projects/ML.md");
        assert_eq!(note.title, "Machine Learning");
        assert_eq!(note.content, "models");
    }

    #[tokio::test]
    async fn test_read_sees_external_edits() {
        let (tmp, store) = vault();
        assert_eq!(store.read("Inbox.md").await.unwrap().content, "root note");
        fs::write(tmp.path().join("Inbox.md"), "edited").unwrap();
        assert_eq!(store.read("Inbox.md").await.unwrap().content, "edited");
    }

    #[tokio::test]
    async fn test_read_missing_directory_and_traversal() {
        let (_tmp, store) = vault();
        assert!(matches!(
            store.read("Nope.md").await,
            Err(VaultError::NotFound(_))
        ));
        assert!(matches!(
            store.read("Projects").await,
            Err(VaultError::NotFound(_))
        ));
        assert!(matches!(
            store.read("../etc/passwd").await,
            Err(VaultError::InvalidPath(_))
        ));
        assert!(matches!(
            store.read("/etc/passwd").await,
            Err(VaultError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_read_only_serves_listed_notes() {
        let (tmp, store) = vault();
        fs::create_dir_all(tmp.path().join(".git")).unwrap();
        fs::write(tmp.path().join(".git/config"), "[core]").unwrap();
        fs::write(tmp.path().join(".obsidian/workspace.json"), "{}").unwrap();
        for path in [
            ".obsidian/workspace.json",
            ".obsidian/workspace.md",
            ".git/config",
            "Projects/image.png",
        ] {
            assert!(
                matches!(store.read(path).await, Err(VaultError::NotFound(_))),
                "{} should not be readable",
                path
            );
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_out_of_vault_rejected() {
        let (tmp, store) = vault();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.md"), "secret").unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.md"),
            tmp.path().join("Leak.md"),
        )
        .unwrap();
        assert!(matches!(
            store.read("Leak.md").await,
            Err(VaultError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_list_recursive_sorted_and_filtered() {
        let (_tmp, store) = vault();
        assert_eq!(
            paths(store.list("", true).unwrap()),
            vec!["Inbox.md", "Projects/Archive/Old.md", "Projects/ML.md"]
        );
    }

    #[test]
    fn test_list_flat_and_missing_folder() {
        let (_tmp, store) = vault();
        assert_eq!(
            paths(store.list("Projects", false).unwrap()),
            vec!["Projects/ML.md"]
        );
        assert!(paths(store.list("Nowhere", true).unwrap()).is_empty());
        assert!(store.list("../", true).is_err());
    }

    #[test]
    fn test_list_reports_modified_time() {
        let (_tmp, store) = vault();
        let first = store.list("", true).unwrap().next().unwrap().unwrap();
        assert!(first.modified.is_some());
    }

    #[test]
    fn test_user_excludes_apply() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("Templates")).unwrap();
        fs::write(tmp.path().join("Templates/t.md"), "template").unwrap();
        fs::write(tmp.path().join("a.md"), "a").unwrap();
        let mut cfg = config(tmp.path());
        cfg.exclude_globs = vec!["Templates/**".to_string()];
        let store = FsNoteStore::open(&cfg).unwrap();
        assert_eq!(paths(store.list("", true).unwrap()), vec!["a.md"]);
    }

    #[test]
    fn test_open_missing_root() {
        let tmp = TempDir::new().unwrap();
        assert!(FsNoteStore::open(&config(&tmp.path().join("missing"))).is_err());
    }
}
