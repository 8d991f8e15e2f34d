//! # Vault Context CLI (`vctx`)
//!
//! Reads context out of an Obsidian-style markdown vault for AI tools:
//! single notes, batches, related notes, daily notes and backlinks, plus
//! discovery queries and an HTTP tool server.
//!
//! ## Usage
//!
//! ```bash
//! vctx --config ./config/vctx.toml <command>
//! vctx --vault ~/Notes <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `vctx context read <note>` | Read one note |
//! | `vctx context multiple <note>...` | Read several notes, first readable is primary |
//! | `vctx context related <note>` | A note plus lexically similar notes |
//! | `vctx context daily [--date]` | The daily note for a date (default today) |
//! | `vctx context backlinks <note>` | A note plus every note linking to it |
//! | `vctx query <kind>` | Search, list, related, metadata, recent |
//! | `vctx tools list` / `vctx tools call` | Inspect and invoke the agent tools |
//! | `vctx serve` | Start the HTTP tool server |
//!
//! ## Examples
//!
//! ```bash
//! vctx --vault ~/Notes context read "Projects/ML.md" --format concise
//! vctx --vault ~/Notes context backlinks "Projects/ML.md" --json
//! vctx --vault ~/Notes query search "gradient descent" --limit 5
//! vctx --vault ~/Notes tools call get_context --param context_type=daily_note
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vault_context::{config, context, query, server, traits, vault};
use vault_context_core::context::ContextRequest;
use vault_context_core::models::ResponseFormat;
use vault_context_core::query::{QueryRequest, SearchFilters};

/// Vault Context CLI: context retrieval over a markdown vault.
///
/// Settings come from a TOML file (`--config`); `--vault` points at a
/// vault directly and overrides `[vault].root`.
#[derive(Parser)]
#[command(
    name = "vctx",
    about = "Vault Context: read-only context retrieval over an Obsidian-style markdown vault",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/vctx.toml")]
    config: PathBuf,

    /// Vault root directory. Overrides `[vault].root`; when the config
    /// file does not exist, defaults are used for everything else.
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble context for an AI model.
    Context {
        #[command(subcommand)]
        action: ContextAction,

        /// `concise` (no metadata) or `detailed`. Defaults to
        /// `[context].default_format`.
        #[arg(long, global = true)]
        format: Option<ResponseFormat>,

        /// Print the result as JSON.
        #[arg(long, global = true)]
        json: bool,
    },

    /// Discover notes without reading them in full.
    Query {
        #[command(subcommand)]
        action: QueryAction,

        /// Maximum results. Defaults to `[query].default_limit`.
        #[arg(long, global = true)]
        limit: Option<usize>,

        /// `concise` (path, title, relevance) or `detailed`.
        #[arg(long, global = true, default_value = "concise")]
        format: ResponseFormat,

        /// Print the result as JSON.
        #[arg(long, global = true)]
        json: bool,
    },

    /// Inspect and invoke the agent tools.
    Tools {
        #[command(subcommand)]
        action: ToolsAction,
    },

    /// Start the HTTP tool server on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum ContextAction {
    /// Read a single note.
    Read {
        /// Vault-relative path, e.g. `Projects/ML.md`.
        target: String,
    },
    /// Read several notes; the first readable one is primary.
    Multiple {
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// A note plus lexically similar notes.
    Related {
        target: String,

        /// Defaults to `[context].default_max_related`.
        #[arg(long)]
        max_related: Option<usize>,
    },
    /// The daily note for a date.
    Daily {
        /// `YYYY-MM-DD` or `today`.
        #[arg(long)]
        date: Option<String>,
    },
    /// A note plus every note that links to it.
    Backlinks { target: String },
}

#[derive(Subcommand)]
enum QueryAction {
    /// Keyword search over note content.
    Search { query: String },
    /// List notes under a folder (recursive).
    List {
        #[arg(default_value = "")]
        path: String,
    },
    /// Notes similar to a reference note.
    Related { reference_note: String },
    /// Filter notes by tags, modification age and folder.
    Metadata {
        /// Match any of these tags (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Modified within the last N days.
        #[arg(long)]
        days: Option<u32>,

        #[arg(long)]
        folder: Option<String>,
    },
    /// Most recently modified notes.
    Recent,
}

#[derive(Subcommand)]
enum ToolsAction {
    /// List tools with their parameter schemas (JSON).
    List,
    /// Validate parameters and call a tool; prints the JSON result.
    Call {
        name: String,

        /// `key=value`; values that parse as JSON are passed as JSON,
        /// anything else as a string.
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
}

/// Parse a `key=value` pair for `--param` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn params_to_json(params: Vec<(String, String)>) -> serde_json::Value {
    let map = params
        .into_iter()
        .map(|(k, v)| {
            let value = serde_json::from_str(&v).unwrap_or(serde_json::Value::String(v));
            (k, value)
        })
        .collect();
    serde_json::Value::Object(map)
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn resolve_config(path: &Path, vault: Option<PathBuf>) -> anyhow::Result<config::Config> {
    match vault {
        Some(root) if !path.exists() => {
            let cfg = config::Config::for_vault(root);
            cfg.validate()?;
            Ok(cfg)
        }
        Some(root) => {
            let mut cfg = config::load_config(path)?;
            cfg.vault.root = root;
            Ok(cfg)
        }
        None => config::load_config(path),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(match cli.command {
        Commands::Serve => "info",
        _ => "warn",
    });

    // Commands that don't require config
    if let Commands::Tools {
        action: ToolsAction::List,
    } = &cli.command
    {
        let registry = traits::ToolRegistry::with_builtins();
        println!("{}", serde_json::to_string_pretty(&registry.infos())?);
        return Ok(());
    }

    let cfg = resolve_config(&cli.config, cli.vault)?;

    match cli.command {
        Commands::Context {
            action,
            format,
            json,
        } => {
            let request = match action {
                ContextAction::Read { target } => ContextRequest::ReadNote { target },
                ContextAction::Multiple { targets } => ContextRequest::ReadMultiple { targets },
                ContextAction::Related {
                    target,
                    max_related,
                } => {
                    let max_related = max_related.unwrap_or(cfg.context.default_max_related);
                    if max_related == 0 || max_related > cfg.context.max_related_limit {
                        anyhow::bail!(
                            "--max-related must be between 1 and {}",
                            cfg.context.max_related_limit
                        );
                    }
                    ContextRequest::GatherRelated {
                        target,
                        max_related,
                    }
                }
                ContextAction::Daily { date } => ContextRequest::DailyNote { date },
                ContextAction::Backlinks { target } => ContextRequest::NoteWithBacklinks { target },
            };
            context::run_context(&cfg, &request, format, json).await?;
        }
        Commands::Query {
            action,
            limit,
            format,
            json,
        } => {
            let request = match action {
                QueryAction::Search { query } => QueryRequest::SemanticSearch { query },
                QueryAction::List { path } => QueryRequest::ListStructure { path },
                QueryAction::Related { reference_note } => QueryRequest::FindRelated {
                    reference_note,
                    max_related: None,
                },
                QueryAction::Metadata { tags, days, folder } => QueryRequest::SearchByMetadata {
                    filters: SearchFilters { tags, days, folder },
                },
                QueryAction::Recent => QueryRequest::RecentChanges,
            };
            query::run_query(&cfg, &request, limit, format, json).await?;
        }
        Commands::Tools { action } => {
            let registry = traits::ToolRegistry::with_builtins();
            match action {
                ToolsAction::List => {
                    println!("{}", serde_json::to_string_pretty(&registry.infos())?);
                }
                ToolsAction::Call { name, params } => {
                    let store = vault::FsNoteStore::open(&cfg.vault)?;
                    let ctx = traits::ToolContext::new(Arc::new(cfg.clone()), Arc::new(store));
                    let result =
                        traits::call_tool(&registry, &name, params_to_json(params), &ctx).await?;
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
            }
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
