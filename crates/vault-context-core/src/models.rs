//! Core data models for vault notes and context bundles.
//!
//! A [`Note`] is what the store reads from disk; [`NoteContent`],
//! [`BacklinkInfo`] and [`ContextResult`] are the outward-facing shapes
//! handed to a language model.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VaultError;
use crate::frontmatter::split_frontmatter;
use crate::tokens::{count_words, estimate_tokens};

/// File extension (without the dot) of vault documents.
pub const NOTE_EXTENSION: &str = "md";

/// A single frontmatter value: a scalar or a list of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl MetadataValue {
    /// Empty strings and empty lists carry no information and are filtered
    /// out of detailed projections.
    pub fn is_empty(&self) -> bool {
        match self {
            MetadataValue::Text(s) => s.trim().is_empty(),
            MetadataValue::List(items) => items.is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Parsed frontmatter block of a note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frontmatter {
    fields: BTreeMap<String, MetadataValue>,
}

impl Frontmatter {
    pub fn new(fields: BTreeMap<String, MetadataValue>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.fields.get(key)
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title")
            .and_then(MetadataValue::as_text)
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn tags(&self) -> &[String] {
        match self.get("tags") {
            Some(MetadataValue::List(tags)) => tags,
            _ => &[],
        }
    }

    pub fn created(&self) -> Option<&str> {
        self.get("created").and_then(MetadataValue::as_text)
    }

    pub fn modified(&self) -> Option<&str> {
        self.get("modified").and_then(MetadataValue::as_text)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy of the fields whose values are non-empty.
    pub fn non_empty_fields(&self) -> BTreeMap<String, MetadataValue> {
        self.fields
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// A vault document as read from the store.
///
/// Built fresh on every read and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Vault-relative, `/`-separated path.
    pub path: String,
    pub title: String,
    /// Body text with the frontmatter block removed.
    pub content: String,
    pub frontmatter: Option<Frontmatter>,
    pub word_count: usize,
}

impl Note {
    /// Parse a raw document: split off frontmatter, derive title and word count.
    pub fn parse(path: impl Into<String>, raw: &str) -> Self {
        let path = path.into();
        let (frontmatter, content) = split_frontmatter(raw);
        let title = frontmatter
            .as_ref()
            .and_then(|fm| fm.title())
            .map(str::to_string)
            .unwrap_or_else(|| file_stem(&path).to_string());
        let word_count = count_words(&content);
        Self {
            path,
            title,
            content,
            frontmatter,
            word_count,
        }
    }

    /// Filename without directory and extension, used as the wikilink name.
    pub fn stem(&self) -> &str {
        file_stem(&self.path)
    }
}

/// Filename of a vault path without its directory or final extension.
pub fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    }
}

/// Path descriptor produced by [`NoteStore::list`](crate::store::NoteStore::list).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotePath {
    pub path: String,
    pub modified: Option<DateTime<Utc>>,
}

/// Response projection: `concise` drops per-note metadata, `detailed` keeps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    Concise,
    #[default]
    Detailed,
}

impl FromStr for ResponseFormat {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "concise" => Ok(ResponseFormat::Concise),
            "detailed" => Ok(ResponseFormat::Detailed),
            other => Err(VaultError::InvalidArgument(format!(
                "unknown response format '{}': must be concise or detailed",
                other
            ))),
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseFormat::Concise => f.write_str("concise"),
            ResponseFormat::Detailed => f.write_str("detailed"),
        }
    }
}

/// Format-gated view of a [`Note`] included in a context bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteContent {
    pub path: String,
    pub title: String,
    pub content: String,
    /// Present exactly when the detailed format was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, MetadataValue>>,
    pub word_count: usize,
}

impl NoteContent {
    pub fn from_note(note: &Note, format: ResponseFormat) -> Self {
        let metadata = match format {
            ResponseFormat::Concise => None,
            ResponseFormat::Detailed => Some(
                note.frontmatter
                    .as_ref()
                    .map(Frontmatter::non_empty_fields)
                    .unwrap_or_default(),
            ),
        };
        Self {
            path: note.path.clone(),
            title: note.title.clone(),
            content: note.content.clone(),
            metadata,
            word_count: note.word_count,
        }
    }
}

/// One note that links to the target, with the text around the link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklinkInfo {
    pub note_path: String,
    pub note_title: String,
    pub context: String,
}

/// The context bundle returned by every assembly strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextResult {
    pub primary_note: NoteContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_notes: Option<Vec<NoteContent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backlinks: Option<Vec<BacklinkInfo>>,
    pub token_estimate: usize,
}

impl ContextResult {
    /// Build a bundle, omitting empty sequences and estimating tokens over
    /// exactly the text included.
    pub fn assemble(
        primary_note: NoteContent,
        related_notes: Vec<NoteContent>,
        backlinks: Vec<BacklinkInfo>,
    ) -> Self {
        let token_estimate = estimate_tokens(&primary_note.content)
            + related_notes
                .iter()
                .map(|n| estimate_tokens(&n.content))
                .sum::<usize>()
            + backlinks
                .iter()
                .map(|b| estimate_tokens(&b.context))
                .sum::<usize>();

        Self {
            primary_note,
            related_notes: (!related_notes.is_empty()).then_some(related_notes),
            backlinks: (!backlinks.is_empty()).then_some(backlinks),
            token_estimate,
        }
    }

    pub fn single(primary_note: NoteContent) -> Self {
        Self::assemble(primary_note, Vec::new(), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_falls_back_to_filename() {
        let note = Note::parse("Projects/ML Research.md", "Body text here.");
        assert_eq!(note.title, "ML Research");
        assert_eq!(note.word_count, 3);
        assert!(note.frontmatter.is_none());
    }

    #[test]
    fn test_title_from_frontmatter() {
        let note = Note::parse("a.md", "---\ntitle: Alpha\ntags: [x]\n---\nHello");
        assert_eq!(note.title, "Alpha");
        assert_eq!(note.content, "Hello");
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("Daily/2025-01-15.md"), "2025-01-15");
        assert_eq!(file_stem("Other Note.md"), "Other Note");
        assert_eq!(file_stem("v1.2 notes.md"), "v1.2 notes");
        assert_eq!(file_stem("README"), "README");
        assert_eq!(file_stem(".hidden"), ".hidden");
    }

    #[test]
    fn test_concise_has_no_metadata() {
        let note = Note::parse("a.md", "---\ntags: [x]\n---\nHello");
        let concise = NoteContent::from_note(&note, ResponseFormat::Concise);
        assert!(concise.metadata.is_none());
        let detailed = NoteContent::from_note(&note, ResponseFormat::Detailed);
        assert_eq!(
            detailed.metadata.unwrap().get("tags"),
            Some(&MetadataValue::List(vec!["x".into()]))
        );
    }

    #[test]
    fn test_detailed_metadata_present_without_frontmatter() {
        let note = Note::parse("a.md", "Hello");
        let detailed = NoteContent::from_note(&note, ResponseFormat::Detailed);
        assert_eq!(detailed.metadata, Some(BTreeMap::new()));
    }

    #[test]
    fn test_empty_values_filtered() {
        let note = Note::parse("a.md", "---\nstatus: \"\"\ntags: []\nrating: 3\n---\nHi");
        let meta = NoteContent::from_note(&note, ResponseFormat::Detailed)
            .metadata
            .unwrap();
        assert!(!meta.contains_key("status"));
        assert!(!meta.contains_key("tags"));
        assert_eq!(meta.get("rating"), Some(&MetadataValue::Integer(3)));
    }

    #[test]
    fn test_assemble_omits_empty_sequences() {
        let note = Note::parse("a.md", "abcdefgh");
        let result = ContextResult::single(NoteContent::from_note(
            &note,
            ResponseFormat::Concise,
        ));
        assert!(result.related_notes.is_none());
        assert!(result.backlinks.is_none());
        assert_eq!(result.token_estimate, 2);

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("related_notes").is_none());
        assert!(json.get("backlinks").is_none());
        assert!(json["primary_note"].get("metadata").is_none());
    }

    #[test]
    fn test_response_format_parse() {
        assert_eq!(
            "concise".parse::<ResponseFormat>().unwrap(),
            ResponseFormat::Concise
        );
        assert!("verbose".parse::<ResponseFormat>().is_err());
        assert_eq!(ResponseFormat::default(), ResponseFormat::Detailed);
    }
}
