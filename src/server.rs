//! HTTP tool server.
//!
//! Exposes the vault tools over a small JSON API so agent runtimes can
//! discover and call them. All tools, built-in and custom, live in one
//! [`ToolRegistry`] and are dispatched through `POST /tools/{name}`.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/tools/list` | List all registered tools with schemas |
//! | `POST` | `/tools/{name}` | Call a tool by name; body is the params object |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "get_context: note not found: Nope.md" } }
//! ```
//!
//! | Code | Status | Raised for |
//! |------|--------|------------|
//! | `not_found` | 404 | missing note, missing daily note, unreadable batch, unknown tool |
//! | `invalid_path` | 400 | paths escaping the vault root |
//! | `bad_request` | 400 | schema violations, bad dates, bad arguments |
//! | `tool_error` | 500 | anything else |

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use vault_context_core::VaultError;

use crate::config::Config;
use crate::traits::{call_tool, ToolContext, ToolInfo, ToolRegistry, UnknownTool};
use crate::vault::FsNoteStore;

#[derive(Clone)]
struct AppState {
    tools: Arc<ToolRegistry>,
    ctx: Arc<ToolContext>,
}

/// Serve the built-in tools for the configured vault on `[server].bind`.
///
/// Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    run_server_with_extensions(config, ToolRegistry::new()).await
}

/// Like [`run_server`], with additional tools registered after the
/// built-ins.
///
/// ```rust,no_run
/// use vault_context::server::run_server_with_extensions;
/// use vault_context::traits::ToolRegistry;
///
/// # async fn example(config: &vault_context::config::Config) -> anyhow::Result<()> {
/// let mut tools = ToolRegistry::new();
/// // tools.register(Box::new(MyTool));
/// run_server_with_extensions(config, tools).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_server_with_extensions(
    config: &Config,
    extra_tools: ToolRegistry,
) -> anyhow::Result<()> {
    let store = FsNoteStore::open(&config.vault)?;
    let ctx = ToolContext::new(Arc::new(config.clone()), Arc::new(store));

    let mut registry = ToolRegistry::with_builtins();
    registry.extend(extra_tools);
    for t in registry.tools() {
        tracing::info!(tool = t.name(), builtin = t.is_builtin(), "registered tool");
    }

    let app = build_router(Arc::new(registry), Arc::new(ctx));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        vault = %config.vault.root.display(),
        "vault context server listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}

/// The router on its own, for embedding or in-process serving.
pub fn build_router(tools: Arc<ToolRegistry>, ctx: Arc<ToolContext>) -> Router {
    Router::new()
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/health", get(handle_health))
        .with_state(AppState { tools, ctx })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Map a tool failure to a status and code.
///
/// Typed vault errors map through `VaultError::code`; anything else is a
/// `tool_error`.
fn classify_tool_error(tool_name: &str, err: anyhow::Error) -> AppError {
    let message = format!("{}: {}", tool_name, err);
    if err.downcast_ref::<UnknownTool>().is_some() {
        return AppError {
            status: StatusCode::NOT_FOUND,
            code: "not_found",
            message: err.to_string(),
        };
    }
    let Some(vault_err) = err.downcast_ref::<VaultError>() else {
        return AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "tool_error",
            message,
        };
    };
    let code = vault_err.code();
    let status = match code {
        "not_found" => StatusCode::NOT_FOUND,
        "invalid_path" | "bad_request" => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    AppError {
        status,
        code,
        message,
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /tools/list ============

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

async fn handle_list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    Json(ToolListResponse {
        tools: state.tools.infos(),
    })
}

// ============ POST /tools/{name} ============

/// Validate, execute and wrap the result as `{ "result": ... }`.
async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = call_tool(&state.tools, &name, params, &state.ctx)
        .await
        .map_err(|e| classify_tool_error(&name, e))?;

    Ok(Json(serde_json::json!({ "result": result })))
}
