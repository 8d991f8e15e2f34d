//! Tool adapter: the vault context operations as callable tools.
//!
//! Tools are what an agent runtime (or any HTTP client) sees. Each tool
//! publishes a name, a natural-language description that doubles as usage
//! guidance, and a JSON Schema for its parameters. The server validates
//! parameters against that schema with [`validate_params`] before calling
//! [`Tool::execute`].
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │          ToolRegistry            │
//! │  ┌─────────────┐ ┌────────────┐  │
//! │  │ get_context │ │ query_vault│  │
//! │  └──────┬──────┘ └─────┬──────┘  │
//! └─────────┼──────────────┼─────────┘
//!           ▼              ▼
//!   ContextAssembler   VaultQuery
//!           └──────┬───────┘
//!                  ▼
//!           dyn NoteStore
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vault_context::config::Config;
//! use vault_context::traits::{ToolContext, ToolRegistry};
//! use vault_context::vault::FsNoteStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Arc::new(Config::for_vault("/path/to/vault"));
//! let store = Arc::new(FsNoteStore::open(&config.vault)?);
//! let ctx = ToolContext::new(config, store);
//!
//! let tools = ToolRegistry::with_builtins();
//! let tool = tools.find("get_context").unwrap();
//! let result = tool
//!     .execute(serde_json::json!({ "context_type": "read_note", "target": "Inbox.md" }), &ctx)
//!     .await?;
//! # Ok(())
//! # }
//! ```

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use vault_context_core::context::{ContextAssembler, ContextRequest};
use vault_context_core::models::ResponseFormat;
use vault_context_core::query::{QueryRequest, SearchFilters, VaultQuery};
use vault_context_core::store::NoteStore;
use vault_context_core::VaultError;

use crate::config::Config;

/// A tool that agents can discover and call.
///
/// Registered in a [`ToolRegistry`], listed by `GET /tools/list` and
/// invoked by `POST /tools/{name}`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Route name (`POST /tools/{name}`); lowercase with underscores.
    fn name(&self) -> &str;

    /// Description for agent discovery, including when (not) to use it.
    fn description(&self) -> &str;

    /// Whether this tool ships with the crate. Defaults to `false`.
    fn is_builtin(&self) -> bool {
        false
    }

    /// JSON Schema (`type: "object"`) for the parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute with parameters already checked by [`validate_params`].
    ///
    /// Vault failures are returned as [`VaultError`] inside the
    /// `anyhow::Error` so callers can classify them.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

/// Everything a tool needs: configuration and the shared note store.
pub struct ToolContext {
    config: Arc<Config>,
    store: Arc<dyn NoteStore>,
}

impl ToolContext {
    pub fn new(config: Arc<Config>, store: Arc<dyn NoteStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &dyn NoteStore {
        self.store.as_ref()
    }

    /// A context assembler using the configured daily-note templates.
    pub fn assembler(&self) -> ContextAssembler<'_, dyn NoteStore> {
        ContextAssembler::new(self.store.as_ref())
            .with_daily_templates(self.config.context.daily_note_templates.clone())
    }

    pub fn query(&self) -> VaultQuery<'_, dyn NoteStore> {
        VaultQuery::new(self.store.as_ref())
    }
}

/// Tool listing entry returned by `GET /tools/list` and `vctx tools list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub builtin: bool,
    pub parameters: Value,
}

impl ToolInfo {
    pub fn from_tool(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            builtin: tool.is_builtin(),
            parameters: tool.parameters_schema(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Parameter helpers
// ═══════════════════════════════════════════════════════════════════════

fn invalid(message: impl Into<String>) -> anyhow::Error {
    VaultError::InvalidArgument(message.into()).into()
}

fn opt_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

fn required_str<'a>(params: &'a Value, key: &str, context: &str) -> Result<&'a str> {
    match opt_str(params, key) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(invalid(format!("{} parameter required for {}", key, context))),
    }
}

fn response_format(params: &Value, default: ResponseFormat) -> Result<ResponseFormat> {
    match opt_str(params, "response_format") {
        Some(s) => Ok(s.parse()?),
        None => Ok(default),
    }
}

/// Read an optional integer parameter constrained to `1..=max`.
fn bounded(params: &Value, key: &str, default: usize, max: usize) -> Result<usize> {
    let Some(value) = params.get(key) else {
        return Ok(default);
    };
    match value.as_u64() {
        Some(n) if n >= 1 && n <= max as u64 => Ok(n as usize),
        _ => Err(invalid(format!(
            "{} must be between 1 and {}, got {}",
            key, max, value
        ))),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in tools
// ═══════════════════════════════════════════════════════════════════════

/// Reads note content with surrounding context.
pub struct GetContextTool;

#[async_trait]
impl Tool for GetContextTool {
    fn name(&self) -> &str {
        "get_context"
    }

    fn description(&self) -> &str {
        "Read full note content from the vault, optionally with related notes, backlinks or the \
         daily note. Use this after query_vault has found the notes you need; do not use it to \
         search or browse. context_type: read_note (one note), read_multiple (several notes, \
         first readable one is primary), gather_related (a note plus similar notes), daily_note \
         (today's or a given date's daily note) and note_with_backlinks (a note plus every note \
         linking to it). Prefer response_format=concise unless frontmatter is needed."
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "context_type": {
                    "type": "string",
                    "enum": ["read_note", "read_multiple", "gather_related", "daily_note", "note_with_backlinks"],
                    "description": "Retrieval strategy"
                },
                "target": {
                    "type": "string",
                    "description": "Vault-relative note path, e.g. \"Projects/ML.md\" (read_note, gather_related, note_with_backlinks)"
                },
                "targets": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Vault-relative note paths (read_multiple)"
                },
                "date": {
                    "type": "string",
                    "description": "YYYY-MM-DD or \"today\" (daily_note; defaults to today)"
                },
                "max_related": {
                    "type": "integer",
                    "description": "Maximum related notes (gather_related; default 3, max 10)"
                },
                "response_format": {
                    "type": "string",
                    "enum": ["concise", "detailed"],
                    "description": "detailed adds frontmatter metadata (default detailed)"
                }
            },
            "required": ["context_type"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let context_type = required_str(&params, "context_type", "get_context")?;
        let cfg = &ctx.config().context;
        let format = response_format(&params, cfg.default_format)?;

        let request = match context_type {
            "read_note" => ContextRequest::ReadNote {
                target: required_str(&params, "target", context_type)?.to_string(),
            },
            "read_multiple" => {
                let targets = params
                    .get("targets")
                    .and_then(Value::as_array)
                    .filter(|a| !a.is_empty())
                    .ok_or_else(|| invalid("targets parameter required for read_multiple"))?;
                let targets = targets
                    .iter()
                    .map(|t| {
                        t.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| invalid("targets must be an array of strings"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                ContextRequest::ReadMultiple { targets }
            }
            "gather_related" => ContextRequest::GatherRelated {
                target: required_str(&params, "target", context_type)?.to_string(),
                max_related: bounded(
                    &params,
                    "max_related",
                    cfg.default_max_related,
                    cfg.max_related_limit,
                )?,
            },
            "daily_note" => ContextRequest::DailyNote {
                date: opt_str(&params, "date").map(str::to_string),
            },
            "note_with_backlinks" => ContextRequest::NoteWithBacklinks {
                target: required_str(&params, "target", context_type)?.to_string(),
            },
            other => return Err(invalid(format!("unknown context_type: {}", other))),
        };

        let result = ctx.assembler().run(&request, format).await?;
        Ok(serde_json::to_value(&result)?)
    }
}

/// Discovers notes without reading their full content.
pub struct QueryVaultTool;

#[async_trait]
impl Tool for QueryVaultTool {
    fn name(&self) -> &str {
        "query_vault"
    }

    fn description(&self) -> &str {
        "Search and discover notes in the vault: keyword search, folder listing, related notes, \
         tag/date/folder filters and recent changes. Returns paths, titles and relevance, not \
         full content; use get_context to read the notes it finds. Use response_format=concise \
         and a small limit to check whether a note exists."
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query_type": {
                    "type": "string",
                    "enum": ["semantic_search", "list_structure", "find_related", "search_by_metadata", "recent_changes"],
                    "description": "Discovery operation"
                },
                "query": { "type": "string", "description": "Search terms (semantic_search)" },
                "path": { "type": "string", "description": "Folder to list, empty for the vault root (list_structure)" },
                "reference_note": { "type": "string", "description": "Note to find related notes for (find_related)" },
                "filters": {
                    "type": "object",
                    "properties": {
                        "tags": { "type": "array", "items": { "type": "string" } },
                        "days": { "type": "integer", "description": "Modified within the last N days" },
                        "folder": { "type": "string" }
                    },
                    "description": "Metadata filters (search_by_metadata)"
                },
                "limit": { "type": "integer", "description": "Maximum results (default 10, max 100)" },
                "response_format": {
                    "type": "string",
                    "enum": ["concise", "detailed"],
                    "description": "detailed adds excerpt, tags and dates (default concise)"
                }
            },
            "required": ["query_type"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let query_type = required_str(&params, "query_type", "query_vault")?;
        let cfg = &ctx.config().query;
        let limit = bounded(&params, "limit", cfg.default_limit, cfg.max_limit)?;
        let format = response_format(&params, ResponseFormat::Concise)?;

        let request = match query_type {
            "semantic_search" => QueryRequest::SemanticSearch {
                query: required_str(&params, "query", query_type)?.to_string(),
            },
            "list_structure" => QueryRequest::ListStructure {
                path: opt_str(&params, "path").unwrap_or("").to_string(),
            },
            "find_related" => QueryRequest::FindRelated {
                reference_note: required_str(&params, "reference_note", query_type)?.to_string(),
                max_related: None,
            },
            "search_by_metadata" => {
                let filters = params
                    .get("filters")
                    .ok_or_else(|| invalid("filters parameter required for search_by_metadata"))?;
                let filters: SearchFilters = serde_json::from_value(filters.clone())
                    .map_err(|e| invalid(format!("invalid filters: {}", e)))?;
                QueryRequest::SearchByMetadata { filters }
            }
            "recent_changes" => QueryRequest::RecentChanges,
            other => return Err(invalid(format!("unknown query_type: {}", other))),
        };

        let result = ctx.query().run(&request, limit, format).await?;
        Ok(serde_json::to_value(&result)?)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Validation
// ═══════════════════════════════════════════════════════════════════════

/// Check `params` against a tool's JSON Schema.
///
/// Verifies required fields, primitive types and enum membership, and
/// injects `default` values for absent properties. Returns the params
/// object to pass to [`Tool::execute`].
pub fn validate_params(schema: &Value, params: &Value) -> Result<Value> {
    let params_obj = match params {
        Value::Object(map) => map.clone(),
        Value::Null => serde_json::Map::new(),
        other => bail!("parameters must be a JSON object, got {}", json_type_name(other)),
    };

    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();

    let required: Vec<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    for req_field in &required {
        if !params_obj.contains_key(*req_field) {
            bail!("missing required parameter: {}", req_field);
        }
    }

    let mut result = params_obj.clone();
    for (prop_name, prop_schema) in &properties {
        if let Some(value) = params_obj.get(prop_name) {
            if let Some(expected_type) = prop_schema.get("type").and_then(|t| t.as_str()) {
                let type_ok = match expected_type {
                    "string" => value.is_string(),
                    "integer" => value.is_i64() || value.is_u64(),
                    "number" => value.is_number(),
                    "boolean" => value.is_boolean(),
                    "array" => value.is_array(),
                    "object" => value.is_object(),
                    _ => true,
                };
                if !type_ok {
                    bail!(
                        "parameter '{}' must be of type '{}', got {}",
                        prop_name,
                        expected_type,
                        json_type_name(value)
                    );
                }
            }

            if let Some(enum_values) = prop_schema.get("enum").and_then(|e| e.as_array()) {
                if !enum_values.contains(value) {
                    let allowed: Vec<String> = enum_values.iter().map(|v| v.to_string()).collect();
                    bail!(
                        "parameter '{}' must be one of [{}], got {}",
                        prop_name,
                        allowed.join(", "),
                        value
                    );
                }
            }
        } else if let Some(default) = prop_schema.get("default") {
            result.insert(prop_name.clone(), default.clone());
        }
    }

    Ok(Value::Object(result))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Registry of callable tools.
///
/// [`ToolRegistry::with_builtins`] gives `get_context` and `query_vault`;
/// [`register`](ToolRegistry::register) adds more.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(GetContextTool));
        registry.register(Box::new(QueryVaultTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Append every tool from `other`.
    pub fn extend(&mut self, other: ToolRegistry) {
        self.tools.extend(other.tools);
    }

    pub fn infos(&self) -> Vec<ToolInfo> {
        self.tools.iter().map(|t| ToolInfo::from_tool(t.as_ref())).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// No tool with the requested name is registered.
#[derive(Debug, thiserror::Error)]
#[error("no tool registered with name: {0}")]
pub struct UnknownTool(pub String);

/// Validate and execute `name` from `registry`.
///
/// Shared by the HTTP handler and `vctx tools call`. An unknown name fails
/// with [`UnknownTool`]; schema violations with
/// [`VaultError::InvalidArgument`].
pub async fn call_tool(
    registry: &ToolRegistry,
    name: &str,
    params: Value,
    ctx: &ToolContext,
) -> Result<Value> {
    let tool = registry
        .find(name)
        .ok_or_else(|| UnknownTool(name.to_string()))?;

    let params = validate_params(&tool.parameters_schema(), &params)
        .map_err(|e| invalid(e.to_string()))?;

    tracing::info!(tool = name, "tool execution started");
    match tool.execute(params, ctx).await {
        Ok(value) => {
            tracing::info!(tool = name, "tool execution completed");
            Ok(value)
        }
        Err(e) => {
            tracing::warn!(tool = name, error = %e, "tool execution failed");
            Err(e)
        }
    }
}
