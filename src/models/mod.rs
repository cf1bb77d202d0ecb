//! Data models shared across the validation, execution and backend layers.

pub mod command;
pub mod envelope;
pub mod results;

pub use command::{
    ApplyMigrationParams, Command, DeleteRowsParams, DescribeTableParams, ExecuteSqlParams,
    InsertRowsParams, ListTablesParams, ReadRowsParams, Records, UpdateRowsParams,
};
pub use envelope::ResponseEnvelope;
pub use results::{
    AppliedMigration, ColumnDefinition, ColumnMetadata, ExtensionInfo, ForeignKey, IndexInfo,
    MigrationInfo, QueryResult, TableInfo, TableSchema, DEFAULT_SCHEMA, MAX_RESULT_ROWS,
};
