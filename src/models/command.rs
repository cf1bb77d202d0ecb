//! Validated command representation.
//!
//! A [`Command`] is the typed, immutable form of one tool invocation. It is
//! only ever constructed by the request validator, and carries exactly the
//! fields that validation accepted - unvalidated extra keys never pass
//! through. The executor matches exhaustively over the variants, so adding a
//! tool without wiring its handler is a compile error.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

/// One validated tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ExecuteSql(ExecuteSqlParams),
    ListTables(ListTablesParams),
    DescribeTable(DescribeTableParams),
    ListExtensions,
    ListMigrations,
    ApplyMigration(ApplyMigrationParams),
    ReadRows(ReadRowsParams),
    InsertRows(InsertRowsParams),
    UpdateRows(UpdateRowsParams),
    DeleteRows(DeleteRowsParams),
}

impl Command {
    /// The tool name this command was validated from.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::ExecuteSql(_) => "execute_sql",
            Self::ListTables(_) => "list_tables",
            Self::DescribeTable(_) => "describe_table",
            Self::ListExtensions => "list_extensions",
            Self::ListMigrations => "list_migrations",
            Self::ApplyMigration(_) => "apply_migration",
            Self::ReadRows(_) => "read_table_rows",
            Self::InsertRows(_) => "create_table_records",
            Self::UpdateRows(_) => "update_table_records",
            Self::DeleteRows(_) => "delete_table_records",
        }
    }
}

/// Parameters for the `execute_sql` tool.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct ExecuteSqlParams {
    /// SQL text to execute. Passed through to the database unmodified.
    pub sql: String,
}

/// Parameters for the `list_tables` tool.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct ListTablesParams {
    /// Schema to list tables from. Default: "public"
    #[serde(default)]
    pub schema: Option<String>,
    /// Include views in the result. Default: true
    #[serde(default = "default_true")]
    pub include_views: bool,
}

/// Parameters for the `describe_table` tool.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct DescribeTableParams {
    /// Name of the table to describe
    pub table: String,
    /// Schema containing the table. Default: "public"
    #[serde(default)]
    pub schema: Option<String>,
}

/// Parameters for the `apply_migration` tool.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct ApplyMigrationParams {
    /// Migration name in snake_case, e.g. "create_users_table"
    pub name: String,
    /// Migration SQL to apply
    pub sql: String,
}

/// Parameters for the `read_table_rows` tool.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct ReadRowsParams {
    /// Name of the table to read from
    pub table: String,
    /// Columns to select. Empty selects all columns.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Column -> value equality filters. JSON null matches SQL NULL.
    #[serde(default)]
    pub filters: Map<String, JsonValue>,
    /// Maximum number of rows to return
    #[serde(default)]
    pub limit: Option<u32>,
    /// Column to order results by
    #[serde(default)]
    pub order_by: Option<String>,
    /// Sort ascending. Default: true
    #[serde(default = "default_true")]
    pub ascending: bool,
}

/// A single record, or a list of records, for insertion.
///
/// Accepting both shapes mirrors the tool's input contract; the validator
/// normalizes to the list form before building the command.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Records {
    One(Map<String, JsonValue>),
    Many(Vec<Map<String, JsonValue>>),
}

impl Records {
    pub fn into_vec(self) -> Vec<Map<String, JsonValue>> {
        match self {
            Self::One(record) => vec![record],
            Self::Many(records) => records,
        }
    }
}

/// Parameters for the `create_table_records` tool.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct InsertRowsParams {
    /// Name of the table to insert into
    pub table: String,
    /// Records to insert. A single object or a non-empty array of objects,
    /// all sharing the same columns.
    pub records: Records,
}

/// Parameters for the `update_table_records` tool.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct UpdateRowsParams {
    /// Name of the table to update
    pub table: String,
    /// Column -> new value assignments
    pub updates: Map<String, JsonValue>,
    /// Column -> value equality filters selecting the rows to update
    pub filters: Map<String, JsonValue>,
}

/// Parameters for the `delete_table_records` tool.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct DeleteRowsParams {
    /// Name of the table to delete from
    pub table: String,
    /// Column -> value equality filters selecting the rows to delete
    pub filters: Map<String, JsonValue>,
}

fn default_true() -> bool {
    true
}
