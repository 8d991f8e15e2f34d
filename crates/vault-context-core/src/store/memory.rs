//! In-memory [`NoteStore`] implementation for tests and embedding.
//!
//! Raw note text lives in a `BTreeMap` behind `std::sync::RwLock`; every
//! [`read`](NoteStore::read) parses the stored text afresh, matching the
//! no-caching behaviour of the filesystem store.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Result, VaultError};
use crate::models::{Note, NotePath};

use super::{normalize_path, NoteListing, NoteStore};

enum StoredNote {
    Text {
        raw: String,
        modified: Option<DateTime<Utc>>,
    },
    /// Listed, but every read fails with an I/O error.
    Unreadable,
}

/// In-memory note store.
pub struct InMemoryNoteStore {
    notes: RwLock<BTreeMap<String, StoredNote>>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self {
            notes: RwLock::new(BTreeMap::new()),
        }
    }

    /// Build a store from `(path, raw text)` pairs.
    pub fn with_notes<I, P, R>(notes: I) -> Self
    where
        I: IntoIterator<Item = (P, R)>,
        P: Into<String>,
        R: Into<String>,
    {
        let store = Self::new();
        for (path, raw) in notes {
            store.insert(path, raw);
        }
        store
    }

    /// Insert or replace a note.
    pub fn insert(&self, path: impl Into<String>, raw: impl Into<String>) {
        self.insert_with_modified(path, raw, None);
    }

    pub fn insert_with_modified(
        &self,
        path: impl Into<String>,
        raw: impl Into<String>,
        modified: Option<DateTime<Utc>>,
    ) {
        self.notes.write().unwrap().insert(
            path.into(),
            StoredNote::Text {
                raw: raw.into(),
                modified,
            },
        );
    }

    /// Register a path that lists normally but cannot be read.
    pub fn insert_unreadable(&self, path: impl Into<String>) {
        self.notes
            .write()
            .unwrap()
            .insert(path.into(), StoredNote::Unreadable);
    }

    pub fn remove(&self, path: &str) {
        self.notes.write().unwrap().remove(path);
    }

    pub fn len(&self) -> usize {
        self.notes.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.read().unwrap().is_empty()
    }
}

impl Default for InMemoryNoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn read(&self, path: &str) -> Result<Note> {
        let normalized = normalize_path(path)?;
        let notes = self.notes.read().unwrap();
        match notes.get(&normalized) {
            Some(StoredNote::Text { raw, .. }) => Ok(Note::parse(normalized, raw)),
            Some(StoredNote::Unreadable) => Err(VaultError::io(
                normalized,
                std::io::Error::new(std::io::ErrorKind::InvalidData, "unreadable note"),
            )),
            None => Err(VaultError::NotFound(path.to_string())),
        }
    }

    fn list(&self, folder: &str, recursive: bool) -> Result<NoteListing<'_>> {
        let folder = normalize_path(folder)?;
        let prefix = if folder.is_empty() {
            String::new()
        } else {
            format!("{}/", folder)
        };

        // Snapshot under the lock; the iterator itself holds no guard.
        let entries: Vec<NotePath> = self
            .notes
            .read()
            .unwrap()
            .iter()
            .filter_map(|(path, stored)| {
                let rest = path.strip_prefix(&prefix)?;
                if !recursive && rest.contains('/') {
                    return None;
                }
                let modified = match stored {
                    StoredNote::Text { modified, .. } => *modified,
                    StoredNote::Unreadable => None,
                };
                Some(NotePath {
                    path: path.clone(),
                    modified,
                })
            })
            .collect();

        Ok(Box::new(entries.into_iter().map(Ok)))
    }
}
