//! Command execution.
//!
//! [`execute`] dispatches a validated [`Command`] to exactly one backend
//! client call and converts the outcome into a [`ResponseEnvelope`]. The
//! dispatch match is exhaustive, so every command variant has exactly one
//! handler. Backend failures are converted at this boundary and never
//! propagate past it; no failure here is fatal to the process.

use crate::backend::BackendClient;
use crate::error::{BackendError, BackendResult};
use crate::models::{Command, ResponseEnvelope};
use serde_json::{Map, Value as JsonValue};
use tracing::{info, warn};

type JsonObject = Map<String, JsonValue>;

/// Execute a validated command against the backend.
///
/// Issues exactly one backend call and always returns an envelope; errors
/// are captured, never thrown.
pub async fn execute(cmd: Command, client: &dyn BackendClient) -> ResponseEnvelope {
    let tool = cmd.tool_name();
    match dispatch(cmd, client).await {
        Ok(data) => {
            info!(tool, "Tool invocation succeeded");
            ResponseEnvelope::ok(data)
        }
        Err(err) => {
            warn!(tool, kind = ?err.kind(), error = %err, "Tool invocation failed");
            ResponseEnvelope::fail(err)
        }
    }
}

/// Validate and execute one tool invocation end to end.
///
/// Validation failures produce an error envelope directly; the backend is
/// only reached for commands that validated.
pub async fn handle_invocation(
    tool_name: &str,
    args: &JsonObject,
    client: &dyn BackendClient,
) -> ResponseEnvelope {
    match super::validate(tool_name, args) {
        Ok(cmd) => execute(cmd, client).await,
        Err(err) => {
            warn!(tool = tool_name, error = %err, "Validation failed");
            ResponseEnvelope::fail(err)
        }
    }
}

/// Map each command variant to its backend operation and serialize the result.
async fn dispatch(cmd: Command, client: &dyn BackendClient) -> BackendResult<JsonValue> {
    match cmd {
        Command::ExecuteSql(params) => to_data(client.execute_sql(&params.sql).await?),
        Command::ListTables(params) => to_data(client.list_tables(&params).await?),
        Command::DescribeTable(params) => to_data(client.describe_table(&params).await?),
        Command::ListExtensions => to_data(client.list_extensions().await?),
        Command::ListMigrations => to_data(client.list_migrations().await?),
        Command::ApplyMigration(params) => {
            to_data(client.apply_migration(&params.name, &params.sql).await?)
        }
        Command::ReadRows(params) => to_data(client.read_rows(&params).await?),
        Command::InsertRows(params) => to_data(client.insert_rows(&params).await?),
        Command::UpdateRows(params) => to_data(client.update_rows(&params).await?),
        Command::DeleteRows(params) => to_data(client.delete_rows(&params).await?),
    }
}

fn to_data<T: serde::Serialize>(result: T) -> BackendResult<JsonValue> {
    serde_json::to_value(result)
        .map_err(|e| BackendError::unknown(format!("failed to serialize result: {e}")))
}
