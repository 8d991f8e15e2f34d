//! # Vault Context Core
//!
//! Read-only context retrieval over an Obsidian-style markdown vault:
//! note models and frontmatter parsing, `[[wikilink]]` extraction, the
//! [`NoteStore`](store::NoteStore) abstraction, backlink and related-note
//! discovery, context assembly and discovery queries.
//!
//! This crate performs no filesystem I/O of its own. The filesystem-backed
//! store lives in the `vault-context` application crate; this crate ships
//! [`InMemoryNoteStore`](store::memory::InMemoryNoteStore) for tests and
//! embedding.
//!
//! ```rust,ignore
//! use vault_context_core::context::ContextAssembler;
//! use vault_context_core::models::ResponseFormat;
//!
//! let result = ContextAssembler::new(&store)
//!     .note_with_backlinks("Projects/ML.md", ResponseFormat::Concise)
//!     .await?;
//! println!("~{} tokens", result.token_estimate);
//! ```

pub mod context;
pub mod error;
pub mod frontmatter;
pub mod links;
pub mod models;
pub mod query;
pub mod related;
pub mod search;
pub mod store;
pub mod tokens;
pub mod wikilink;

pub use error::{Result, VaultError};
