//! SQL construction for the row-level CRUD operations.
//!
//! Statements are assembled from quoted identifiers and numbered positional
//! placeholders; values are always bound, never interpolated. The validator
//! has already restricted identifiers to the SQL identifier pattern, and
//! quoting here is the second layer.

use crate::models::{DeleteRowsParams, InsertRowsParams, ReadRowsParams, UpdateRowsParams};
use serde_json::{Map, Value as JsonValue};

/// A built statement plus its bind values in placeholder order.
#[derive(Debug)]
pub struct BuiltQuery<'a> {
    pub sql: String,
    pub binds: Vec<&'a JsonValue>,
}

/// Quote a SQL identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Render `WHERE` clauses for equality filters.
///
/// JSON null matches SQL NULL via `IS NULL`; other values become numbered
/// placeholders appended to `binds`.
fn push_filters<'a>(
    sql: &mut String,
    binds: &mut Vec<&'a JsonValue>,
    filters: &'a Map<String, JsonValue>,
) {
    if filters.is_empty() {
        return;
    }
    sql.push_str(" WHERE ");
    let mut first = true;
    for (column, value) in filters {
        if !first {
            sql.push_str(" AND ");
        }
        first = false;
        sql.push_str(&quote_ident(column));
        if value.is_null() {
            sql.push_str(" IS NULL");
        } else {
            binds.push(value);
            sql.push_str(&format!(" = ${}", binds.len()));
        }
    }
}

/// Build `SELECT ... FROM table [WHERE ...] [ORDER BY ...] [LIMIT n]`.
///
/// `limit` is the effective row limit, already clamped by the caller; it is
/// rendered inline since it is a validated integer.
pub fn build_select(params: &ReadRowsParams, limit: u32) -> BuiltQuery<'_> {
    let columns = if params.columns.is_empty() {
        "*".to_string()
    } else {
        params
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut sql = format!("SELECT {} FROM {}", columns, quote_ident(&params.table));
    let mut binds = Vec::new();
    push_filters(&mut sql, &mut binds, &params.filters);

    if let Some(order_by) = &params.order_by {
        sql.push_str(&format!(
            " ORDER BY {} {}",
            quote_ident(order_by),
            if params.ascending { "ASC" } else { "DESC" }
        ));
    }
    sql.push_str(&format!(" LIMIT {limit}"));

    BuiltQuery { sql, binds }
}

/// Build `INSERT INTO table (cols) VALUES (...), (...) RETURNING *`.
///
/// Column order comes from the first record; the validator guarantees all
/// records share the same key set.
pub fn build_insert(params: &InsertRowsParams) -> BuiltQuery<'_> {
    let records = match &params.records {
        crate::models::Records::Many(records) => records.as_slice(),
        crate::models::Records::One(record) => std::slice::from_ref(record),
    };
    let columns: Vec<&String> = records[0].keys().collect();

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ",
        quote_ident(&params.table),
        columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    );

    static NULL: JsonValue = JsonValue::Null;
    let mut binds = Vec::new();
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for (j, column) in columns.iter().enumerate() {
            if j > 0 {
                sql.push_str(", ");
            }
            binds.push(record.get(column.as_str()).unwrap_or(&NULL));
            sql.push_str(&format!("${}", binds.len()));
        }
        sql.push(')');
    }
    sql.push_str(" RETURNING *");

    BuiltQuery { sql, binds }
}

/// Build `UPDATE table SET ... WHERE ... RETURNING *`.
pub fn build_update(params: &UpdateRowsParams) -> BuiltQuery<'_> {
    let mut sql = format!("UPDATE {} SET ", quote_ident(&params.table));
    let mut binds = Vec::new();

    let mut first = true;
    for (column, value) in &params.updates {
        if !first {
            sql.push_str(", ");
        }
        first = false;
        binds.push(value);
        sql.push_str(&format!("{} = ${}", quote_ident(column), binds.len()));
    }

    push_filters(&mut sql, &mut binds, &params.filters);
    sql.push_str(" RETURNING *");

    BuiltQuery { sql, binds }
}

/// Build `DELETE FROM table WHERE ... RETURNING *`.
pub fn build_delete(params: &DeleteRowsParams) -> BuiltQuery<'_> {
    let mut sql = format!("DELETE FROM {}", quote_ident(&params.table));
    let mut binds = Vec::new();
    push_filters(&mut sql, &mut binds, &params.filters);
    sql.push_str(" RETURNING *");

    BuiltQuery { sql, binds }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Records;
    use serde_json::json;

    fn as_map(value: JsonValue) -> Map<String, JsonValue> {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_build_select_all_columns() {
        let params = ReadRowsParams {
            table: "users".into(),
            columns: vec![],
            filters: Map::new(),
            limit: None,
            order_by: None,
            ascending: true,
        };
        let built = build_select(&params, 100);
        assert_eq!(built.sql, "SELECT * FROM \"users\" LIMIT 100");
        assert!(built.binds.is_empty());
    }

    #[test]
    fn test_build_select_with_filters_and_order() {
        let params = ReadRowsParams {
            table: "users".into(),
            columns: vec!["id".into(), "name".into()],
            filters: as_map(json!({"active": true, "deleted_at": null})),
            limit: Some(10),
            order_by: Some("created_at".into()),
            ascending: false,
        };
        let built = build_select(&params, 10);
        assert_eq!(
            built.sql,
            "SELECT \"id\", \"name\" FROM \"users\" WHERE \"active\" = $1 \
             AND \"deleted_at\" IS NULL ORDER BY \"created_at\" DESC LIMIT 10"
        );
        assert_eq!(built.binds.len(), 1);
        assert_eq!(built.binds[0], &json!(true));
    }

    #[test]
    fn test_build_insert_multiple_records() {
        let params = InsertRowsParams {
            table: "users".into(),
            records: Records::Many(vec![
                as_map(json!({"email": "a@example.com", "name": "A"})),
                as_map(json!({"email": "b@example.com", "name": "B"})),
            ]),
        };
        let built = build_insert(&params);
        assert_eq!(
            built.sql,
            "INSERT INTO \"users\" (\"email\", \"name\") VALUES ($1, $2), ($3, $4) RETURNING *"
        );
        assert_eq!(built.binds.len(), 4);
    }

    #[test]
    fn test_build_update() {
        let params = UpdateRowsParams {
            table: "users".into(),
            updates: as_map(json!({"status": "premium"})),
            filters: as_map(json!({"active": true})),
        };
        let built = build_update(&params);
        assert_eq!(
            built.sql,
            "UPDATE \"users\" SET \"status\" = $1 WHERE \"active\" = $2 RETURNING *"
        );
        assert_eq!(built.binds.len(), 2);
    }

    #[test]
    fn test_build_delete() {
        let params = DeleteRowsParams {
            table: "users".into(),
            filters: as_map(json!({"active": false})),
        };
        let built = build_delete(&params);
        assert_eq!(
            built.sql,
            "DELETE FROM \"users\" WHERE \"active\" = $1 RETURNING *"
        );
        assert_eq!(built.binds.len(), 1);
    }
}
