//! Context assembly: the five retrieval strategies.
//!
//! Every strategy is a single read-only pass over the store that returns a
//! uniformly shaped [`ContextResult`]:
//!
//! | Strategy | Primary | Related notes | Backlinks |
//! |----------|---------|---------------|-----------|
//! | [`read_note`](ContextAssembler::read_note) | target | - | - |
//! | [`read_multiple`](ContextAssembler::read_multiple) | first readable target | remaining readable targets | - |
//! | [`gather_related`](ContextAssembler::gather_related) | target | lexical matches | - |
//! | [`daily_note`](ContextAssembler::daily_note) | first matching template | - | - |
//! | [`note_with_backlinks`](ContextAssembler::note_with_backlinks) | target | referring notes | referring excerpts |
//!
//! Failures on the required target propagate; failures on secondary notes
//! are logged and the note is left out. Empty sequences are omitted from the
//! result rather than returned empty.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};
use crate::links::LinkIndexer;
use crate::models::{ContextResult, NoteContent, ResponseFormat};
use crate::related::RelatedNoteFinder;
use crate::store::NoteStore;

/// Placeholder replaced by the `YYYY-MM-DD` date in daily-note templates.
pub const DATE_PLACEHOLDER: &str = "{date}";

/// Conventional daily-note locations, tried in order.
pub const DEFAULT_DAILY_NOTE_TEMPLATES: [&str; 4] = [
    "Daily/{date}.md",
    "daily/{date}.md",
    "{date}.md",
    "Journal/{date}.md",
];

pub const DEFAULT_MAX_RELATED: usize = 3;

fn default_max_related() -> usize {
    DEFAULT_MAX_RELATED
}

/// A context request, discriminated by `context_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "context_type", rename_all = "snake_case")]
pub enum ContextRequest {
    ReadNote {
        target: String,
    },
    ReadMultiple {
        targets: Vec<String>,
    },
    GatherRelated {
        target: String,
        #[serde(default = "default_max_related")]
        max_related: usize,
    },
    DailyNote {
        #[serde(default)]
        date: Option<String>,
    },
    NoteWithBacklinks {
        target: String,
    },
}

impl ContextRequest {
    pub fn context_type(&self) -> &'static str {
        match self {
            ContextRequest::ReadNote { .. } => "read_note",
            ContextRequest::ReadMultiple { .. } => "read_multiple",
            ContextRequest::GatherRelated { .. } => "gather_related",
            ContextRequest::DailyNote { .. } => "daily_note",
            ContextRequest::NoteWithBacklinks { .. } => "note_with_backlinks",
        }
    }
}

/// Orchestrates the store, [`LinkIndexer`] and [`RelatedNoteFinder`].
///
/// Holds no state between calls.
pub struct ContextAssembler<'a, S: NoteStore + ?Sized> {
    store: &'a S,
    daily_templates: Vec<String>,
    today: Option<NaiveDate>,
}

impl<'a, S: NoteStore + ?Sized> ContextAssembler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            daily_templates: DEFAULT_DAILY_NOTE_TEMPLATES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            today: None,
        }
    }

    /// Replace the ordered daily-note path templates.
    pub fn with_daily_templates(mut self, templates: Vec<String>) -> Self {
        self.daily_templates = templates;
        self
    }

    /// Pin the date used for `"today"` (defaults to the current UTC date).
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Dispatch a request to its strategy.
    pub async fn run(&self, request: &ContextRequest, format: ResponseFormat) -> Result<ContextResult> {
        match request {
            ContextRequest::ReadNote { target } => self.read_note(target, format).await,
            ContextRequest::ReadMultiple { targets } => self.read_multiple(targets, format).await,
            ContextRequest::GatherRelated {
                target,
                max_related,
            } => self.gather_related(target, *max_related, format).await,
            ContextRequest::DailyNote { date } => self.daily_note(date.as_deref(), format).await,
            ContextRequest::NoteWithBacklinks { target } => {
                self.note_with_backlinks(target, format).await
            }
        }
    }

    /// The target note alone.
    pub async fn read_note(&self, target: &str, format: ResponseFormat) -> Result<ContextResult> {
        tracing::info!(note = target, %format, "read_note started");
        let note = self.store.read(target).await?;
        let result = ContextResult::single(NoteContent::from_note(&note, format));
        tracing::info!(
            path = %note.path,
            word_count = note.word_count,
            token_estimate = result.token_estimate,
            "read_note completed"
        );
        Ok(result)
    }

    /// Read every target in order; the first readable one is primary.
    ///
    /// Unreadable targets are logged and skipped. Fails with
    /// [`VaultError::NoResults`] only after every target was attempted.
    pub async fn read_multiple(
        &self,
        targets: &[String],
        format: ResponseFormat,
    ) -> Result<ContextResult> {
        if targets.is_empty() {
            return Err(VaultError::InvalidArgument(
                "targets must not be empty".to_string(),
            ));
        }
        tracing::info!(count = targets.len(), %format, "read_multiple started");

        let mut primary = None;
        let mut related = Vec::new();
        for target in targets {
            match self.store.read(target).await {
                Ok(note) => {
                    let content = NoteContent::from_note(&note, format);
                    if primary.is_none() {
                        primary = Some(content);
                    } else {
                        related.push(content);
                    }
                }
                Err(e) => {
                    tracing::warn!(note = %target, error = %e, "read_multiple: skipping target");
                }
            }
        }

        let Some(primary) = primary else {
            return Err(VaultError::NoResults {
                tried: targets.to_vec(),
            });
        };

        let result = ContextResult::assemble(primary, related, Vec::new());
        tracing::info!(
            read = 1 + result.related_notes.as_ref().map_or(0, Vec::len),
            token_estimate = result.token_estimate,
            "read_multiple completed"
        );
        Ok(result)
    }

    /// The target plus up to `max_related` lexically similar notes.
    pub async fn gather_related(
        &self,
        target: &str,
        max_related: usize,
        format: ResponseFormat,
    ) -> Result<ContextResult> {
        tracing::info!(note = target, max_related, %format, "gather_related started");
        let primary = self.store.read(target).await?;

        let related: Vec<NoteContent> = RelatedNoteFinder::new(self.store)
            .find_related(&primary, max_related)
            .await
            .iter()
            .map(|n| NoteContent::from_note(n, format))
            .collect();

        let result = ContextResult::assemble(
            NoteContent::from_note(&primary, format),
            related,
            Vec::new(),
        );
        tracing::info!(
            related_count = result.related_notes.as_ref().map_or(0, Vec::len),
            token_estimate = result.token_estimate,
            "gather_related completed"
        );
        Ok(result)
    }

    /// The daily note for `date` (`None` or `"today"` mean the current date).
    ///
    /// Candidate paths are tried in template order; if none exists the
    /// error lists all of them.
    pub async fn daily_note(
        &self,
        date: Option<&str>,
        format: ResponseFormat,
    ) -> Result<ContextResult> {
        tracing::info!(date = ?date, %format, "daily_note started");
        let date = resolve_date(date, self.today())?;
        let candidates = daily_note_candidates(&self.daily_templates, date);

        for path in &candidates {
            match self.store.read(path).await {
                Ok(note) => {
                    let result = ContextResult::single(NoteContent::from_note(&note, format));
                    tracing::info!(path = %note.path, %date, "daily_note completed");
                    return Ok(result);
                }
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            }
        }

        Err(VaultError::DailyNoteNotFound {
            date,
            tried: candidates,
        })
    }

    /// The target plus every note linking to it.
    pub async fn note_with_backlinks(
        &self,
        target: &str,
        format: ResponseFormat,
    ) -> Result<ContextResult> {
        tracing::info!(note = target, %format, "note_with_backlinks started");
        let primary = self.store.read(target).await?;

        let backlinks = LinkIndexer::new(self.store)
            .find_backlinks(primary.stem())
            .await;

        let mut related = Vec::with_capacity(backlinks.len());
        for backlink in &backlinks {
            match self.store.read(&backlink.note_path).await {
                Ok(note) => related.push(NoteContent::from_note(&note, format)),
                Err(e) => {
                    tracing::warn!(
                        path = %backlink.note_path,
                        error = %e,
                        "note_with_backlinks: referring note vanished"
                    );
                }
            }
        }

        let result = ContextResult::assemble(
            NoteContent::from_note(&primary, format),
            related,
            backlinks,
        );
        tracing::info!(
            backlink_count = result.backlinks.as_ref().map_or(0, Vec::len),
            token_estimate = result.token_estimate,
            "note_with_backlinks completed"
        );
        Ok(result)
    }
}

/// Resolve a daily-note date argument.
///
/// Absent, empty or `"today"` (any case) resolve to `today`; otherwise an
/// ISO calendar date, or an ISO datetime whose date part is used.
pub fn resolve_date(date: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    let raw = match date.map(str::trim) {
        None | Some("") => return Ok(today),
        Some(s) if s.eq_ignore_ascii_case("today") => return Ok(today),
        Some(s) => s,
    };

    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.date());
    }
    Err(VaultError::InvalidDate(raw.to_string()))
}

/// Candidate paths for `date`, one per template, in order.
pub fn daily_note_candidates(templates: &[String], date: NaiveDate) -> Vec<String> {
    let date_str = date.format("%Y-%m-%d").to_string();
    templates
        .iter()
        .map(|t| t.replace(DATE_PLACEHOLDER, &date_str))
        .collect()
}
