//! Tool Façade's MCP binding (spec.md §6). Thin glue: turns `CallToolRequest`
//! arguments into `core::facade::ToolFacade` calls and back. All validation
//! and business logic lives in `core::facade`; this module only knows about
//! rmcp's request/response shapes and how to wire `{content, structuredContent,
//! isError}` (spec.md §6) from a `Result<T, CoreError>`.
//!
//! Grounded on the retrieval pack's MCP server (ConaryLabs-Mira,
//! `crates/mira-server/src/mcp/{router,resources}.rs`): `#[tool_router]`/
//! `#[tool_handler]` macros from `rmcp`'s `macros` feature, the
//! `content: [text summary], structured_content: Some(json), is_error, meta`
//! `CallToolResult` shape, and the `resources/list`+`resources/read` param
//! and `ResourceContents` shapes for `artifact://` URIs.

mod requests;

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use serde::Serialize;
use tracing::info;

use crate::core::{FetchHistoryParams, ToolFacade};
use crate::domain::CoreError;
use crate::resource::ResourceManager;
use requests::{FetchHistoryRequest, ResolveChatRequest};

const ARTIFACT_URI_SCHEME: &str = "artifact://";

/// Build a `CallToolResult` from a core operation's outcome: a short,
/// non-PII text summary in `content[0]`, the typed payload (or wire error)
/// in `structuredContent`, and `isError` set on failure — never a raw
/// Telegram string, never a stack trace (spec.md §6, §7).
fn respond<T: Serialize>(
    result: Result<T, CoreError>,
    summary: impl FnOnce(&T) -> String,
) -> Result<CallToolResult, McpError> {
    match result {
        Ok(value) => {
            let text = summary(&value);
            let structured = serde_json::to_value(&value).map_err(|e| {
                McpError::internal_error(format!("failed to serialize tool output: {e}"), None)
            })?;
            Ok(CallToolResult {
                content: vec![Content::text(text)],
                structured_content: Some(structured),
                is_error: Some(false),
                meta: None,
            })
        }
        Err(core_error) => {
            let wire = core_error.to_wire();
            let structured = serde_json::json!({ "error": wire });
            Ok(CallToolResult {
                content: vec![Content::text(format!("{}: {}", wire.title, wire.detail))],
                structured_content: Some(structured),
                is_error: Some(true),
                meta: None,
            })
        }
    }
}

/// Server state: the Façade (owns Resolver + Fetcher) plus direct access to
/// the Resource Manager for `resources/read` on `artifact://` URIs. Cheap to
/// clone — every field is an `Arc`.
#[derive(Clone)]
pub struct TgHistoryServer {
    facade: Arc<ToolFacade>,
    resource_manager: Arc<ResourceManager>,
    tool_router: rmcp::handler::server::router::tool::ToolRouter<Self>,
}

impl TgHistoryServer {
    pub fn new(facade: Arc<ToolFacade>, resource_manager: Arc<ResourceManager>) -> Self {
        Self {
            facade,
            resource_manager,
            tool_router: Self::tool_router(),
        }
    }

    /// Run the server over stdio until the client disconnects.
    pub async fn serve_stdio(self) -> anyhow::Result<()> {
        info!("tg-history-mcp listening on stdio");
        let service = self.serve(rmcp::transport::stdio()).await?;
        service.waiting().await?;
        Ok(())
    }
}

#[tool_router]
impl TgHistoryServer {
    #[tool(
        description = "Resolve a public Telegram chat/channel/user reference (@username, t.me URL, bare username, or numeric id) to its canonical identifier."
    )]
    async fn resolve_chat_tool(
        &self,
        Parameters(req): Parameters<ResolveChatRequest>,
    ) -> Result<CallToolResult, McpError> {
        let result = self.facade.resolve_chat(&req.input).await;
        respond(result, |chat| {
            format!(
                "Resolved {} ({:?}, id {}){}",
                chat.title,
                chat.kind,
                chat.canonical_id,
                chat.username
                    .as_deref()
                    .map(|u| format!(", @{u}"))
                    .unwrap_or_default()
            )
        })
    }

    #[tool(
        description = "Fetch a page of historical messages from a public Telegram chat over an optional UTC date window, with cursor-based pagination, filtering, and search. Large results are exported to an NDJSON resource."
    )]
    async fn fetch_history_tool(
        &self,
        Parameters(req): Parameters<FetchHistoryRequest>,
    ) -> Result<CallToolResult, McpError> {
        let params = FetchHistoryParams {
            chat: req.chat,
            from_date: req.from_date,
            to_date: req.to_date,
            page_size: req.page_size,
            cursor: req.cursor,
            direction: req.direction,
            search: req.search,
            filter: req.filter,
        };
        let result = self.facade.fetch_history(params).await;
        respond(result, |page| ToolFacade::summarize_page(page))
    }
}

#[tool_handler]
impl ServerHandler for TgHistoryServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Read-only export of historical messages from public Telegram chats/channels \
                 over bounded UTC windows. Call resolve_chat_tool first if you only have a \
                 human-readable chat reference; fetch_history_tool accepts either that reference \
                 or the canonical_id it returns."
                    .into(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        // Artifacts are created on demand by fetch_history_tool and handed
        // back as a URI in structuredContent; there is nothing to enumerate
        // up front (spec.md §4.F: Artifacts exist only once materialized).
        Ok(ListResourcesResult {
            resources: vec![],
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let uri = &request.uri;
        if !uri.starts_with(ARTIFACT_URI_SCHEME) {
            return Err(McpError::invalid_params(
                format!("unknown resource URI: {uri}"),
                None,
            ));
        }

        let bytes = self
            .resource_manager
            .read(uri)
            .await
            .map_err(|e| match e {
                CoreError::ResourceExpired => {
                    McpError::invalid_params(format!("artifact expired or unknown: {uri}"), None)
                }
                other => McpError::internal_error(other.to_string(), None),
            })?;
        let text = String::from_utf8(bytes)
            .map_err(|e| McpError::internal_error(format!("artifact is not valid UTF-8: {e}"), None))?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::TextResourceContents {
                uri: uri.clone(),
                mime_type: Some("application/x-ndjson".into()),
                text,
                meta: None,
            }],
        })
    }
}
