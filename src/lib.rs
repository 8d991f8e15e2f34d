//! # Vault Context
//!
//! Read-only context retrieval over an Obsidian-style markdown vault for
//! AI tools.
//!
//! Notes are read straight from disk on every call (nothing is indexed or
//! cached), parsed for YAML frontmatter and `[[wikilinks]]`, and assembled
//! into size-annotated context bundles: one note, a batch, a note with
//! similar notes, the daily note, or a note with its backlinks.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────────┐
//! │ FsNoteStore  │──▶│  vault-context-core   │
//! │ walkdir+glob │   │ assemble / query      │
//! └──────────────┘   └──────────┬───────────┘
//!                               │
//!                ┌──────────────┼──────────────┐
//!                ▼              ▼              ▼
//!           ┌────────┐    ┌──────────┐   ┌──────────┐
//!           │  CLI   │    │  Tools   │──▶│   HTTP   │
//!           │ (vctx) │    │ registry │   │ /tools/* │
//!           └────────┘    └──────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! vctx --vault ~/Notes context read "Projects/ML.md"
//! vctx --vault ~/Notes context backlinks "Projects/ML.md" --format concise
//! vctx --vault ~/Notes query search "neural networks"
//! vctx --vault ~/Notes serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`vault`] | Filesystem-backed note store |
//! | [`context`] | `vctx context` rendering |
//! | [`query`] | `vctx query` rendering |
//! | [`traits`] | Tool trait, built-in tools, registry |
//! | [`server`] | HTTP tool server |

pub mod config;
pub mod context;
pub mod query;
pub mod server;
pub mod traits;
pub mod vault;
