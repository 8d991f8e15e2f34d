//! Vault discovery queries.
//!
//! The companion to [`context`](crate::context): where context assembly
//! returns full note bodies, queries return lightweight [`NoteInfo`]
//! summaries so a caller can find what to read first.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};
use crate::models::{Note, NotePath, ResponseFormat};
use crate::related::RelatedNoteFinder;
use crate::search::normalize_scores;
use crate::store::NoteStore;

/// Characters of body text included in a detailed [`NoteInfo`].
pub const EXCERPT_CHARS: usize = 200;

pub const DEFAULT_QUERY_LIMIT: usize = 10;

/// Metadata filters; every supplied filter must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Match notes carrying any of these tags (a leading `#` is ignored).
    #[serde(default)]
    pub tags: Vec<String>,
    /// Only notes modified within the last N days.
    #[serde(default)]
    pub days: Option<u32>,
    /// Restrict to this folder (recursive).
    #[serde(default)]
    pub folder: Option<String>,
}

/// A discovery query, discriminated by `query_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query_type", rename_all = "snake_case")]
pub enum QueryRequest {
    SemanticSearch {
        query: String,
    },
    ListStructure {
        #[serde(default)]
        path: String,
    },
    FindRelated {
        reference_note: String,
        /// Defaults to the query limit.
        #[serde(default)]
        max_related: Option<usize>,
    },
    SearchByMetadata {
        #[serde(default)]
        filters: SearchFilters,
    },
    RecentChanges,
}

impl QueryRequest {
    pub fn query_type(&self) -> &'static str {
        match self {
            QueryRequest::SemanticSearch { .. } => "semantic_search",
            QueryRequest::ListStructure { .. } => "list_structure",
            QueryRequest::FindRelated { .. } => "find_related",
            QueryRequest::SearchByMetadata { .. } => "search_by_metadata",
            QueryRequest::RecentChanges => "recent_changes",
        }
    }
}

/// Summary of one note in a query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteInfo {
    pub path: String,
    pub title: String,
    /// In `[0, 1]`; `1.0` for queries without a ranking.
    pub relevance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

impl NoteInfo {
    pub fn from_note(note: &Note, format: ResponseFormat, relevance: f64) -> Self {
        let mut info = NoteInfo {
            path: note.path.clone(),
            title: note.title.clone(),
            relevance,
            excerpt: None,
            tags: None,
            created: None,
            modified: None,
        };
        if format == ResponseFormat::Detailed {
            if !note.content.is_empty() {
                info.excerpt = Some(note.content.chars().take(EXCERPT_CHARS).collect());
            }
            if let Some(fm) = &note.frontmatter {
                info.tags = Some(fm.tags().to_vec());
                info.created = fm.created().map(str::to_string);
                info.modified = fm.modified().map(str::to_string);
            }
        }
        info
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub results: Vec<NoteInfo>,
    pub total_found: usize,
    /// More matches may exist than were returned.
    pub truncated: bool,
    /// Guidance for refining the query, when useful.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl QueryResult {
    fn empty(suggestion: impl Into<String>) -> Self {
        Self {
            results: Vec::new(),
            total_found: 0,
            truncated: false,
            suggestion: Some(suggestion.into()),
        }
    }
}

/// Runs discovery queries against a [`NoteStore`].
pub struct VaultQuery<'a, S: NoteStore + ?Sized> {
    store: &'a S,
    now: Option<DateTime<Utc>>,
}

impl<'a, S: NoteStore + ?Sized> VaultQuery<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store, now: None }
    }

    /// Pin the clock used by the `days` filter.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub async fn run(
        &self,
        request: &QueryRequest,
        limit: usize,
        format: ResponseFormat,
    ) -> Result<QueryResult> {
        if limit == 0 {
            return Err(VaultError::InvalidArgument(
                "limit must be at least 1".to_string(),
            ));
        }
        tracing::info!(query_type = request.query_type(), limit, %format, "query started");

        let result = match request {
            QueryRequest::SemanticSearch { query } => {
                self.semantic_search(query, limit, format).await?
            }
            QueryRequest::ListStructure { path } => self.list_structure(path, limit, format).await?,
            QueryRequest::FindRelated {
                reference_note,
                max_related,
            } => {
                self.find_related(reference_note, max_related.unwrap_or(limit), format)
                    .await?
            }
            QueryRequest::SearchByMetadata { filters } => {
                self.search_by_metadata(filters, limit, format).await?
            }
            QueryRequest::RecentChanges => self.recent_changes(limit, format).await?,
        };

        tracing::info!(
            query_type = request.query_type(),
            result_count = result.results.len(),
            truncated = result.truncated,
            "query completed"
        );
        Ok(result)
    }

    /// Keyword search ranked by relevance.
    pub async fn semantic_search(
        &self,
        query: &str,
        limit: usize,
        format: ResponseFormat,
    ) -> Result<QueryResult> {
        if query.trim().is_empty() {
            return Err(VaultError::InvalidArgument(
                "query must not be empty".to_string(),
            ));
        }
        let mut hits = self.store.search(query, limit.saturating_add(1)).await?;
        let truncated = hits.len() > limit;
        hits.truncate(limit);
        let relevance = normalize_scores(&hits);
        let results: Vec<NoteInfo> = hits
            .iter()
            .zip(relevance)
            .map(|(hit, r)| NoteInfo::from_note(&hit.note, format, r))
            .collect();

        let suggestion = if results.is_empty() {
            Some(format!(
                "No notes found matching '{}'. Try broader terms or check spelling.",
                query
            ))
        } else if truncated {
            Some(format!(
                "Showing {} of many results. Try narrowing your search with specific tags or date ranges.",
                limit
            ))
        } else {
            None
        };

        Ok(QueryResult {
            total_found: results.len(),
            results,
            truncated,
            suggestion,
        })
    }

    /// Notes under `path` (recursive; empty means the vault root).
    pub async fn list_structure(
        &self,
        path: &str,
        limit: usize,
        format: ResponseFormat,
    ) -> Result<QueryResult> {
        let entries = self.listing(path)?;
        let total = entries.len();

        let mut results = Vec::new();
        for entry in entries.iter().take(limit) {
            match self.store.read(&entry.path).await {
                Ok(note) => results.push(NoteInfo::from_note(&note, format, 1.0)),
                Err(e) => tracing::warn!(path = %entry.path, error = %e, "list_structure: skipping note"),
            }
        }

        let truncated = total > limit;
        let suggestion = truncated.then(|| {
            format!(
                "Showing {} of {} notes in folder. Try narrowing to a specific subfolder.",
                limit, total
            )
        });

        Ok(QueryResult {
            results,
            total_found: total,
            truncated,
            suggestion,
        })
    }

    /// Notes similar to `reference_note`. A missing reference note is
    /// reported through the suggestion rather than as an error.
    pub async fn find_related(
        &self,
        reference_note: &str,
        max_related: usize,
        format: ResponseFormat,
    ) -> Result<QueryResult> {
        let reference = match self.store.read(reference_note).await {
            Ok(note) => note,
            Err(e) if e.is_not_found() => {
                tracing::warn!(note = reference_note, "find_related: reference note not found");
                return Ok(QueryResult::empty(format!(
                    "Reference note '{}' not found.",
                    reference_note
                )));
            }
            Err(e) => return Err(e),
        };

        let related = RelatedNoteFinder::new(self.store)
            .find_related(&reference, max_related)
            .await;
        let results: Vec<NoteInfo> = related
            .iter()
            .map(|n| NoteInfo::from_note(n, format, 1.0))
            .collect();

        Ok(QueryResult {
            total_found: results.len(),
            truncated: max_related > 0 && results.len() >= max_related,
            results,
            suggestion: None,
        })
    }

    /// Notes matching every supplied filter, in listing order.
    pub async fn search_by_metadata(
        &self,
        filters: &SearchFilters,
        limit: usize,
        format: ResponseFormat,
    ) -> Result<QueryResult> {
        let folder = filters.folder.as_deref().unwrap_or("");
        // `Some(None)`: a window reaching past the earliest representable
        // time, so any known modification time qualifies.
        let threshold = filters.days.map(|days| {
            let now = self.now.unwrap_or_else(Utc::now);
            Duration::try_days(i64::from(days)).and_then(|window| now.checked_sub_signed(window))
        });
        let wanted: Vec<&str> = filters.tags.iter().map(|t| bare_tag(t)).collect();

        let mut results = Vec::new();
        for entry in self.listing(folder)? {
            if results.len() >= limit {
                break;
            }
            if let Some(threshold) = threshold {
                match (entry.modified, threshold) {
                    (Some(modified), Some(since)) if modified >= since => {}
                    (Some(_), None) => {}
                    _ => continue,
                }
            }

            let note = match self.store.read(&entry.path).await {
                Ok(note) => note,
                Err(e) => {
                    tracing::warn!(path = %entry.path, error = %e, "search_by_metadata: skipping note");
                    continue;
                }
            };

            if !wanted.is_empty() {
                let tags = note.frontmatter.as_ref().map(|fm| fm.tags()).unwrap_or(&[]);
                if !tags.iter().any(|t| wanted.contains(&bare_tag(t))) {
                    continue;
                }
            }
            results.push(NoteInfo::from_note(&note, format, 1.0));
        }

        let truncated = results.len() >= limit;
        let suggestion = truncated.then(|| {
            format!(
                "Showing {} results. Add more specific filters to narrow down.",
                limit
            )
        });

        Ok(QueryResult {
            total_found: results.len(),
            results,
            truncated,
            suggestion,
        })
    }

    /// Most recently modified notes first. Notes without a known
    /// modification time sort last.
    pub async fn recent_changes(&self, limit: usize, format: ResponseFormat) -> Result<QueryResult> {
        let mut entries = self.listing("")?;
        entries.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.path.cmp(&b.path)));

        let mut results = Vec::new();
        for entry in entries.iter().take(limit) {
            match self.store.read(&entry.path).await {
                Ok(note) => results.push(NoteInfo::from_note(&note, format, 1.0)),
                Err(e) => tracing::warn!(path = %entry.path, error = %e, "recent_changes: skipping note"),
            }
        }

        Ok(QueryResult {
            total_found: results.len(),
            results,
            truncated: false,
            suggestion: None,
        })
    }

    fn listing(&self, folder: &str) -> Result<Vec<NotePath>> {
        let mut entries = Vec::new();
        for entry in self.store.list(folder, true)? {
            match entry {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(error = %e, "query: skipping unlistable entry"),
            }
        }
        Ok(entries)
    }
}

fn bare_tag(tag: &str) -> &str {
    tag.trim().trim_start_matches('#')
}
