//! Result payloads returned by backend operations.
//!
//! These types serialize into the `data` field of the response envelope.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

/// Schema used when a tool invocation does not name one.
pub const DEFAULT_SCHEMA: &str = "public";

/// Hard cap on rows returned by a single query.
///
/// Results beyond the cap are dropped and the `truncated` flag is set;
/// there is no pagination at this layer.
pub const MAX_RESULT_ROWS: u32 = 1000;

/// Rows and metadata from a SQL execution.
#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct QueryResult {
    /// Column metadata in select order. Empty for statements without rows.
    pub columns: Vec<ColumnMetadata>,
    /// Result rows as column -> value maps
    pub rows: Vec<Map<String, JsonValue>>,
    /// Number of rows returned
    pub row_count: usize,
    /// Rows affected by INSERT/UPDATE/DELETE statements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,
    /// True if the result was cut off at the row cap
    pub truncated: bool,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ColumnMetadata {
    pub name: String,
    pub type_name: String,
}

/// One table or view from `list_tables`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TableInfo {
    pub name: String,
    /// "TABLE" or "VIEW"
    #[serde(rename = "type")]
    pub table_type: String,
    pub schema: String,
    /// Total size in bytes (data + indexes). None for views.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_size_formatted: Option<String>,
    /// Planner row estimate. None for views.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_estimate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Full schema description of one table.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TableSchema {
    pub table: String,
    pub schema: String,
    pub columns: Vec<ColumnDefinition>,
    /// Column names that form the primary key
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<IndexInfo>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ColumnDefinition {
    pub name: String,
    /// Formatted SQL type, e.g. "character varying(255)"
    pub data_type: String,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub is_primary_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ForeignKey {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
    pub on_delete: String,
    pub on_update: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub primary: bool,
    /// Access method, e.g. "btree"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

/// One installed extension from `list_extensions`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ExtensionInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// One applied migration from `list_migrations`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MigrationInfo {
    /// Timestamp version, e.g. "20260829120000"
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
}

/// Confirmation returned by `apply_migration`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AppliedMigration {
    pub version: String,
    pub name: String,
}
