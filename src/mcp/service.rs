//! MCP service implementation using rmcp.
//!
//! The service implements `ServerHandler` directly rather than through the
//! tool-router macros: tool dispatch is the heart of this server, and routing
//! every call through [`crate::tools::handle_invocation`] keeps validation,
//! dispatch and error conversion on a single code path. `tools/list` publishes
//! the schemas the validator enforces, so the advertised contract and the
//! enforced contract cannot drift apart.

use crate::backend::BackendClient;
use crate::models::ResponseEnvelope;
use crate::tools::{self, TOOL_SPECS};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler};
use std::sync::Arc;
use tracing::info;

/// MCP service exposing database tools over an injected backend client.
#[derive(Clone)]
pub struct SupabaseService {
    /// Shared backend client for all database operations
    backend: Arc<dyn BackendClient>,
}

impl SupabaseService {
    /// Create a new service over the given backend client.
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }

    /// Run one tool invocation and return its envelope.
    pub async fn invoke(&self, tool_name: &str, args: &rmcp::model::JsonObject) -> ResponseEnvelope {
        tools::handle_invocation(tool_name, args, self.backend.as_ref()).await
    }
}

/// Render an envelope as a tool result.
///
/// Every invocation returns the envelope JSON as content; failures
/// additionally set the MCP error flag. Protocol-level errors are reserved
/// for transport problems and never produced here.
fn envelope_to_result(envelope: ResponseEnvelope) -> CallToolResult {
    let json = serde_json::to_string_pretty(&envelope)
        .unwrap_or_else(|e| format!("{{\"success\":false,\"error\":{{\"kind\":\"Unknown\",\"message\":\"serialization failed: {e}\"}}}}"));
    if envelope.is_success() {
        CallToolResult::success(vec![Content::text(json)])
    } else {
        CallToolResult::error(vec![Content::text(json)])
    }
}

impl ServerHandler for SupabaseService {
    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = TOOL_SPECS
            .iter()
            .map(|spec| Tool::new(spec.name, spec.description, spec.input_schema()))
            .collect();
        Ok(ListToolsResult {
            next_cursor: None,
            tools,
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        info!(tool = %request.name, "Tool call received");
        let args = request.arguments.unwrap_or_default();
        let envelope = self.invoke(&request.name, &args).await;
        Ok(envelope_to_result(envelope))
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "supabase-mcp-server".to_owned(),
                title: Some("Supabase MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Tools for working with a Supabase Postgres database.\n\
                \n\
                ## Workflow\n\
                1. Call list_tables / describe_table to explore the schema\n\
                2. Use read_table_rows, create_table_records, update_table_records,\n\
                   delete_table_records for row-level operations\n\
                3. Use execute_sql for anything else (raw SQL, passed through)\n\
                4. Use apply_migration for schema changes so they are recorded\n\
                   in the migration history\n\
                \n\
                Every tool returns a JSON envelope: {success, data?, error?}.\n\
                On failure, error.kind categorizes the problem and error.context\n\
                carries details."
                    .to_owned(),
            ),
        }
    }
}
