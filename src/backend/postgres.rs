//! Postgres backend over a shared `sqlx` connection pool.
//!
//! All actual database work happens here. Every sqlx error leaves this module
//! through `From<sqlx::Error> for BackendError`, keeping the error conversion
//! in one place.

use crate::backend::sql::{self, BuiltQuery};
use crate::backend::BackendClient;
use crate::config::Config;
use crate::error::{BackendError, BackendResult};
use crate::models::{
    AppliedMigration, ColumnDefinition, ColumnMetadata, DeleteRowsParams, DescribeTableParams,
    ExtensionInfo, ForeignKey, IndexInfo, InsertRowsParams, ListTablesParams, MigrationInfo,
    QueryResult, ReadRowsParams, TableInfo, TableSchema, UpdateRowsParams, DEFAULT_SCHEMA,
    MAX_RESULT_ROWS,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::StreamExt;
use serde_json::{Map, Value as JsonValue};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Either, Executor, Postgres, Row, TypeInfo};
use std::time::{Duration, Instant};
use tracing::{debug, info};

// Schema introspection queries, adapted to the payloads this server returns.

const LIST_TABLES: &str = r#"
    SELECT
        t.table_name,
        t.table_type,
        CASE
            WHEN t.table_type = 'BASE TABLE' THEN pg_total_relation_size(quote_ident($1) || '.' || quote_ident(t.table_name))
            ELSE NULL
        END AS total_size,
        s.n_live_tup AS row_estimate,
        obj_description((quote_ident($1) || '.' || quote_ident(t.table_name))::regclass) AS comment
    FROM information_schema.tables t
    LEFT JOIN pg_stat_user_tables s
        ON s.schemaname = t.table_schema AND s.relname = t.table_name
    WHERE t.table_schema = $1
    AND t.table_type IN ('BASE TABLE', 'VIEW')
    ORDER BY t.table_name
    "#;

const DESCRIBE_COLUMNS: &str = r#"
    SELECT
        c.column_name,
        format_type(a.atttypid, a.atttypmod) AS column_type,
        c.is_nullable,
        c.column_default,
        CASE WHEN pk.column_name IS NOT NULL THEN true ELSE false END AS is_primary_key,
        col_description(t.oid, a.attnum) AS column_comment
    FROM information_schema.columns c
    JOIN pg_class t ON t.relname = c.table_name
    JOIN pg_namespace n ON n.oid = t.relnamespace AND n.nspname = c.table_schema
    JOIN pg_attribute a ON a.attrelid = t.oid AND a.attname = c.column_name
    LEFT JOIN (
        SELECT kcu.column_name
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage kcu
            ON tc.constraint_name = kcu.constraint_name
            AND tc.table_schema = kcu.table_schema
        WHERE tc.table_name = $1
        AND tc.table_schema = $2
        AND tc.constraint_type = 'PRIMARY KEY'
    ) pk ON c.column_name = pk.column_name
    WHERE c.table_name = $1 AND c.table_schema = $2
    ORDER BY c.ordinal_position
    "#;

const DESCRIBE_FOREIGN_KEYS: &str = r#"
    SELECT
        kcu.column_name,
        ccu.table_name AS foreign_table_name,
        ccu.column_name AS foreign_column_name,
        rc.delete_rule,
        rc.update_rule
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
        ON tc.constraint_name = kcu.constraint_name
        AND tc.table_schema = kcu.table_schema
    JOIN information_schema.constraint_column_usage ccu
        ON ccu.constraint_name = tc.constraint_name
        AND ccu.table_schema = tc.table_schema
    JOIN information_schema.referential_constraints rc
        ON rc.constraint_name = tc.constraint_name
        AND rc.constraint_schema = tc.table_schema
    WHERE tc.table_name = $1
    AND tc.table_schema = $2
    AND tc.constraint_type = 'FOREIGN KEY'
    "#;

const DESCRIBE_INDEXES: &str = r#"
    SELECT
        i.relname AS index_name,
        array_agg(a.attname ORDER BY array_position(ix.indkey, a.attnum)) AS column_names,
        ix.indisunique AS is_unique,
        ix.indisprimary AS is_primary,
        am.amname AS index_algorithm
    FROM pg_index ix
    JOIN pg_class i ON i.oid = ix.indexrelid
    JOIN pg_class t ON t.oid = ix.indrelid
    JOIN pg_namespace n ON n.oid = t.relnamespace
    LEFT JOIN pg_am am ON am.oid = i.relam
    JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
    WHERE t.relname = $1 AND n.nspname = $2
    GROUP BY i.relname, ix.indisunique, ix.indisprimary, am.amname
    ORDER BY i.relname
    "#;

const LIST_EXTENSIONS: &str = r#"
    SELECT name, default_version, installed_version, comment
    FROM pg_available_extensions
    WHERE installed_version IS NOT NULL
    ORDER BY name
    "#;

/// Migration history lives where the supabase CLI keeps it, so both tools
/// see the same history.
const MIGRATIONS_DDL: &str = r#"
    CREATE SCHEMA IF NOT EXISTS supabase_migrations;
    CREATE TABLE IF NOT EXISTS supabase_migrations.schema_migrations (
        version text PRIMARY KEY,
        name text,
        applied_at timestamptz NOT NULL DEFAULT now()
    );
    "#;

const LIST_MIGRATIONS: &str = r#"
    SELECT version, name, applied_at
    FROM supabase_migrations.schema_migrations
    ORDER BY version
    "#;

const RECORD_MIGRATION: &str = r#"
    INSERT INTO supabase_migrations.schema_migrations (version, name)
    VALUES ($1, $2)
    "#;

/// Production backend client over a Postgres connection pool.
///
/// Constructed once at startup and shared by reference across concurrent
/// invocations; the pool handles connection reuse and thread safety.
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    /// Connect to the database described by the configuration.
    pub async fn connect(config: &Config) -> BackendResult<Self> {
        info!(url = %config.redacted_url(), "Connecting to database");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout))
            .connect(&config.database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool, for callers that manage their own.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run a built CRUD statement and collect the returned rows.
    async fn run_built<'a>(
        &self,
        built: BuiltQuery<'a>,
        is_mutation: bool,
    ) -> BackendResult<QueryResult> {
        debug!(sql = %built.sql, binds = built.binds.len(), "Executing statement");
        let start = Instant::now();

        let mut query = sqlx::query(&built.sql);
        for value in &built.binds {
            query = bind_json(query, value);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut result = rows_to_result(&rows, start, MAX_RESULT_ROWS);
        if is_mutation {
            result.rows_affected = Some(result.row_count as u64);
        }
        Ok(result)
    }
}

#[async_trait]
impl BackendClient for PgBackend {
    async fn execute_sql(&self, sql: &str) -> BackendResult<QueryResult> {
        debug!(sql = %sql, "Executing raw SQL");
        let start = Instant::now();

        // Raw (unprepared) execution: uses the simple query protocol, so
        // multi-statement SQL works. Rows stream with a cap; dropping the
        // stream abandons the remainder.
        let mut stream = self.pool.fetch_many(sql);
        let mut rows: Vec<PgRow> = Vec::new();
        let mut rows_affected: u64 = 0;
        let mut truncated = false;

        while let Some(item) = stream.next().await {
            match item? {
                Either::Left(done) => rows_affected += done.rows_affected(),
                Either::Right(row) => {
                    if rows.len() >= MAX_RESULT_ROWS as usize {
                        truncated = true;
                        break;
                    }
                    rows.push(row);
                }
            }
        }
        drop(stream);

        let mut result = rows_to_result(&rows, start, MAX_RESULT_ROWS);
        result.truncated = truncated;
        if rows_affected > 0 {
            result.rows_affected = Some(rows_affected);
        }
        Ok(result)
    }

    async fn list_tables(&self, params: &ListTablesParams) -> BackendResult<Vec<TableInfo>> {
        let schema = params.schema.as_deref().unwrap_or(DEFAULT_SCHEMA);
        let rows = sqlx::query(LIST_TABLES)
            .bind(schema)
            .fetch_all(&self.pool)
            .await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            let table_type: String = row.try_get("table_type")?;
            let table_type = if table_type == "VIEW" { "VIEW" } else { "TABLE" };
            if !params.include_views && table_type == "VIEW" {
                continue;
            }
            let total_size: Option<i64> = row.try_get("total_size")?;
            let total_size = total_size.and_then(|s| u64::try_from(s).ok());
            let row_estimate: Option<i64> = row.try_get("row_estimate")?;
            tables.push(TableInfo {
                name: row.try_get("table_name")?,
                table_type: table_type.to_string(),
                schema: schema.to_string(),
                total_size,
                total_size_formatted: total_size.map(format_size),
                row_estimate: row_estimate.and_then(|n| u64::try_from(n).ok()),
                comment: row.try_get("comment")?,
            });
        }
        Ok(tables)
    }

    async fn describe_table(&self, params: &DescribeTableParams) -> BackendResult<TableSchema> {
        let schema = params.schema.as_deref().unwrap_or(DEFAULT_SCHEMA);
        let table = params.table.as_str();

        let column_rows = sqlx::query(DESCRIBE_COLUMNS)
            .bind(table)
            .bind(schema)
            .fetch_all(&self.pool)
            .await?;

        if column_rows.is_empty() {
            return Err(BackendError::not_found(format!("table {schema}.{table}")));
        }

        let mut columns = Vec::with_capacity(column_rows.len());
        let mut primary_key = Vec::new();
        for row in &column_rows {
            let name: String = row.try_get("column_name")?;
            let is_nullable: String = row.try_get("is_nullable")?;
            let is_primary_key: bool = row.try_get("is_primary_key")?;
            if is_primary_key {
                primary_key.push(name.clone());
            }
            columns.push(ColumnDefinition {
                name,
                data_type: row.try_get("column_type")?,
                nullable: is_nullable == "YES",
                default: row.try_get("column_default")?,
                is_primary_key,
                comment: row.try_get("column_comment")?,
            });
        }

        let fk_rows = sqlx::query(DESCRIBE_FOREIGN_KEYS)
            .bind(table)
            .bind(schema)
            .fetch_all(&self.pool)
            .await?;
        let mut foreign_keys = Vec::with_capacity(fk_rows.len());
        for row in &fk_rows {
            foreign_keys.push(ForeignKey {
                column: row.try_get("column_name")?,
                references_table: row.try_get("foreign_table_name")?,
                references_column: row.try_get("foreign_column_name")?,
                on_delete: row.try_get("delete_rule")?,
                on_update: row.try_get("update_rule")?,
            });
        }

        let index_rows = sqlx::query(DESCRIBE_INDEXES)
            .bind(table)
            .bind(schema)
            .fetch_all(&self.pool)
            .await?;
        let mut indexes = Vec::with_capacity(index_rows.len());
        for row in &index_rows {
            indexes.push(IndexInfo {
                name: row.try_get("index_name")?,
                columns: row.try_get("column_names")?,
                unique: row.try_get("is_unique")?,
                primary: row.try_get("is_primary")?,
                algorithm: row.try_get("index_algorithm")?,
            });
        }

        Ok(TableSchema {
            table: table.to_string(),
            schema: schema.to_string(),
            columns,
            primary_key,
            foreign_keys,
            indexes,
        })
    }

    async fn list_extensions(&self) -> BackendResult<Vec<ExtensionInfo>> {
        let rows = sqlx::query(LIST_EXTENSIONS).fetch_all(&self.pool).await?;
        let mut extensions = Vec::with_capacity(rows.len());
        for row in &rows {
            extensions.push(ExtensionInfo {
                name: row.try_get("name")?,
                default_version: row.try_get("default_version")?,
                installed_version: row.try_get("installed_version")?,
                comment: row.try_get("comment")?,
            });
        }
        Ok(extensions)
    }

    async fn list_migrations(&self) -> BackendResult<Vec<MigrationInfo>> {
        let mut conn = self.pool.acquire().await?;
        conn.execute(MIGRATIONS_DDL).await?;
        let rows = sqlx::query(LIST_MIGRATIONS).fetch_all(&mut *conn).await?;

        let mut migrations = Vec::with_capacity(rows.len());
        for row in &rows {
            let applied_at: Option<DateTime<Utc>> = row.try_get("applied_at")?;
            migrations.push(MigrationInfo {
                version: row.try_get("version")?,
                name: row.try_get("name")?,
                applied_at,
            });
        }
        Ok(migrations)
    }

    async fn apply_migration(&self, name: &str, sql: &str) -> BackendResult<AppliedMigration> {
        let version = Utc::now().format("%Y%m%d%H%M%S").to_string();
        info!(version = %version, name = %name, "Applying migration");

        // Migration SQL and its history record commit or roll back together.
        let mut tx = self.pool.begin().await?;
        (&mut *tx).execute(MIGRATIONS_DDL).await?;
        (&mut *tx).execute(sql).await?;
        sqlx::query(RECORD_MIGRATION)
            .bind(&version)
            .bind(name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(AppliedMigration {
            version,
            name: name.to_string(),
        })
    }

    async fn read_rows(&self, params: &ReadRowsParams) -> BackendResult<QueryResult> {
        let limit = params
            .limit
            .map(|l| l.clamp(1, MAX_RESULT_ROWS))
            .unwrap_or(MAX_RESULT_ROWS);
        self.run_built(sql::build_select(params, limit), false).await
    }

    async fn insert_rows(&self, params: &InsertRowsParams) -> BackendResult<QueryResult> {
        self.run_built(sql::build_insert(params), true).await
    }

    async fn update_rows(&self, params: &UpdateRowsParams) -> BackendResult<QueryResult> {
        self.run_built(sql::build_update(params), true).await
    }

    async fn delete_rows(&self, params: &DeleteRowsParams) -> BackendResult<QueryResult> {
        self.run_built(sql::build_delete(params), true).await
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Bind a JSON value to a Postgres query by its JSON type.
fn bind_json<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    value: &'q JsonValue,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match value {
        JsonValue::Null => query.bind(None::<String>),
        JsonValue::Bool(v) => query.bind(*v),
        JsonValue::Number(n) => {
            if let Some(v) = n.as_i64() {
                query.bind(v)
            } else {
                query.bind(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(v) => query.bind(v.as_str()),
        // Objects and arrays go in as jsonb
        other => query.bind(sqlx::types::Json(other)),
    }
}

/// Convert fetched rows into a [`QueryResult`].
fn rows_to_result(rows: &[PgRow], start: Instant, cap: u32) -> QueryResult {
    let execution_time_ms = start.elapsed().as_millis() as u64;
    if rows.is_empty() {
        return QueryResult {
            execution_time_ms,
            ..QueryResult::default()
        };
    }

    let columns: Vec<ColumnMetadata> = rows[0]
        .columns()
        .iter()
        .map(|col| ColumnMetadata {
            name: col.name().to_string(),
            type_name: col.type_info().name().to_lowercase(),
        })
        .collect();

    let truncated = rows.len() > cap as usize;
    let json_rows: Vec<Map<String, JsonValue>> = rows
        .iter()
        .take(cap as usize)
        .map(row_to_map)
        .collect();

    QueryResult {
        columns,
        row_count: json_rows.len(),
        rows: json_rows,
        rows_affected: None,
        truncated,
        execution_time_ms,
    }
}

/// Convert one row to a column -> JSON value map.
fn row_to_map(row: &PgRow) -> Map<String, JsonValue> {
    let mut map = Map::new();
    for (idx, col) in row.columns().iter().enumerate() {
        let type_name = col.type_info().name().to_lowercase();
        map.insert(col.name().to_string(), decode_column(row, idx, &type_name));
    }
    map
}

/// Decode one column by its Postgres type name.
///
/// Unknown or undecodable values degrade to a string representation, then
/// to null - a malformed column never fails the whole row.
fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> JsonValue {
    match type_name {
        "int2" => opt(row.try_get::<Option<i16>, _>(idx).map(|v| v.map(JsonValue::from))),
        "int4" => opt(row.try_get::<Option<i32>, _>(idx).map(|v| v.map(JsonValue::from))),
        "int8" => opt(row.try_get::<Option<i64>, _>(idx).map(|v| v.map(JsonValue::from))),
        "float4" => opt(row
            .try_get::<Option<f32>, _>(idx)
            .map(|v| v.map(|f| json_number(f as f64)))),
        "float8" => opt(row
            .try_get::<Option<f64>, _>(idx)
            .map(|v| v.map(json_number))),
        "bool" => opt(row.try_get::<Option<bool>, _>(idx).map(|v| v.map(JsonValue::from))),
        "json" | "jsonb" => opt(row.try_get::<Option<JsonValue>, _>(idx)),
        "uuid" => opt(row
            .try_get::<Option<uuid::Uuid>, _>(idx)
            .map(|v| v.map(|u| JsonValue::from(u.to_string())))),
        "timestamptz" => opt(row
            .try_get::<Option<DateTime<Utc>>, _>(idx)
            .map(|v| v.map(|dt| JsonValue::from(dt.to_rfc3339())))),
        "timestamp" => opt(row
            .try_get::<Option<NaiveDateTime>, _>(idx)
            .map(|v| v.map(|dt| JsonValue::from(dt.to_string())))),
        "date" => opt(row
            .try_get::<Option<NaiveDate>, _>(idx)
            .map(|v| v.map(|d| JsonValue::from(d.to_string())))),
        "time" => opt(row
            .try_get::<Option<NaiveTime>, _>(idx)
            .map(|v| v.map(|t| JsonValue::from(t.to_string())))),
        "bytea" => opt(row
            .try_get::<Option<Vec<u8>>, _>(idx)
            .map(|v| v.map(|bytes| decode_binary(&bytes)))),
        // numeric arrives in text form on the simple query protocol;
        // everything else gets the string fallback too
        _ => match row.try_get::<Option<String>, _>(idx) {
            Ok(v) => v.map(JsonValue::from).unwrap_or(JsonValue::Null),
            Err(_) => JsonValue::Null,
        },
    }
}

fn opt(result: Result<Option<JsonValue>, sqlx::Error>) -> JsonValue {
    match result {
        Ok(Some(value)) => value,
        _ => JsonValue::Null,
    }
}

fn json_number(f: f64) -> JsonValue {
    serde_json::Number::from_f64(f)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

/// Binary columns decode as UTF-8 text when valid, base64 otherwise.
fn decode_binary(bytes: &[u8]) -> JsonValue {
    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::from(s.to_string()),
        Err(_) => JsonValue::from(BASE64.encode(bytes)),
    }
}

/// Human-readable size with binary units, e.g. "1 MB".
pub fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::WINDOWS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1 kB");
        assert_eq!(format_size(1048576), "1 MB");
    }

    #[test]
    fn test_json_number_rejects_nan() {
        assert_eq!(json_number(f64::NAN), JsonValue::Null);
        assert_eq!(json_number(1.5), JsonValue::from(1.5));
    }

    #[test]
    fn test_decode_binary_prefers_utf8() {
        assert_eq!(decode_binary(b"hello"), JsonValue::from("hello"));
        assert_eq!(
            decode_binary(&[0xff, 0xfe]),
            JsonValue::from(BASE64.encode([0xff, 0xfe]))
        );
    }
}
