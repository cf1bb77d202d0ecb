//! Backend client abstraction.
//!
//! [`BackendClient`] is the seam between the command executor and the hosted
//! database. It has exactly one method per supported operation; the executor
//! maps each command variant to exactly one of them. The production
//! implementation is [`PgBackend`], backed by a shared `sqlx` Postgres pool.
//! Tests substitute their own implementations.

pub mod postgres;
pub mod sql;

pub use postgres::PgBackend;

use crate::error::BackendResult;
use crate::models::{
    AppliedMigration, DeleteRowsParams, DescribeTableParams, ExtensionInfo, InsertRowsParams,
    ListTablesParams, MigrationInfo, QueryResult, ReadRowsParams, TableInfo, TableSchema,
    UpdateRowsParams,
};
use async_trait::async_trait;

/// One method per supported database operation.
///
/// Implementations are shared across concurrent invocations; connection and
/// thread safety are the implementation's concern. This layer takes no locks
/// and adds no retries or timeouts of its own.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Execute raw SQL, passed through unmodified.
    async fn execute_sql(&self, sql: &str) -> BackendResult<QueryResult>;

    /// List tables (and optionally views) in a schema.
    async fn list_tables(&self, params: &ListTablesParams) -> BackendResult<Vec<TableInfo>>;

    /// Describe one table: columns, primary key, foreign keys, indexes.
    async fn describe_table(&self, params: &DescribeTableParams) -> BackendResult<TableSchema>;

    /// List installed extensions.
    async fn list_extensions(&self) -> BackendResult<Vec<ExtensionInfo>>;

    /// List applied migrations, oldest first.
    async fn list_migrations(&self) -> BackendResult<Vec<MigrationInfo>>;

    /// Run migration SQL and record it in the migration history atomically.
    async fn apply_migration(&self, name: &str, sql: &str) -> BackendResult<AppliedMigration>;

    /// Read rows with equality filters, ordering and limit.
    async fn read_rows(&self, params: &ReadRowsParams) -> BackendResult<QueryResult>;

    /// Insert records and return the created rows.
    async fn insert_rows(&self, params: &InsertRowsParams) -> BackendResult<QueryResult>;

    /// Update rows matching filters and return the updated rows.
    async fn update_rows(&self, params: &UpdateRowsParams) -> BackendResult<QueryResult>;

    /// Delete rows matching filters and return the deleted rows.
    async fn delete_rows(&self, params: &DeleteRowsParams) -> BackendResult<QueryResult>;

    /// Release held resources on shutdown.
    async fn close(&self) {}
}
