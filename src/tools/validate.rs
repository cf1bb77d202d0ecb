//! Request validation.
//!
//! [`validate`] turns an untrusted tool name plus argument map into a typed
//! [`Command`], or a [`ValidationError`] describing exactly what was wrong.
//! It is a pure function: no side effects, and identical inputs always
//! produce structurally equal results. Validation failures are returned
//! before any backend interaction takes place.

use crate::error::ValidationError;
use crate::models::{
    ApplyMigrationParams, Command, DeleteRowsParams, DescribeTableParams, ExecuteSqlParams,
    InsertRowsParams, ListTablesParams, ReadRowsParams, Records, UpdateRowsParams,
    MAX_RESULT_ROWS,
};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

type JsonObject = Map<String, JsonValue>;

/// Expected JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Bool,
    Object,
    /// Array of strings
    StringArray,
    /// Object or array of objects (record input)
    Record,
}

impl ParamKind {
    fn expected_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Bool => "boolean",
            Self::Object => "object",
            Self::StringArray => "array of strings",
            Self::Record => "object or array of objects",
        }
    }

    fn accepts(&self, value: &JsonValue) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Bool => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::StringArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(JsonValue::is_string)),
            Self::Record => {
                value.is_object()
                    || value
                        .as_array()
                        .is_some_and(|items| items.iter().all(JsonValue::is_object))
            }
        }
    }
}

/// Declared parameter of a tool.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

const fn required(name: &'static str, kind: ParamKind) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: true,
    }
}

const fn optional(name: &'static str, kind: ParamKind) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: false,
    }
}

/// Declared contract of one tool: name, docs, and parameter schema.
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
    /// JSON Schema for the tool's input, derived from the command's
    /// parameter struct via schemars.
    schema: fn() -> schemars::Schema,
}

impl ToolSpec {
    /// The tool's input schema as a JSON object, for `tools/list`.
    pub fn input_schema(&self) -> Arc<JsonObject> {
        let value = serde_json::to_value((self.schema)()).unwrap_or_default();
        match value {
            JsonValue::Object(map) => Arc::new(map),
            _ => Arc::new(JsonObject::new()),
        }
    }
}

fn empty_schema() -> schemars::Schema {
    schemars::json_schema!({ "type": "object", "properties": {} })
}

/// The fixed set of tools this server exposes.
pub static TOOL_SPECS: &[ToolSpec] = &[
    ToolSpec {
        name: "execute_sql",
        description: "Execute raw SQL against the database.\nThe SQL text is passed through unmodified; multiple statements are allowed.\nResults are capped at 1000 rows (the `truncated` flag is set when the cap is hit).",
        params: &[required("sql", ParamKind::String)],
        schema: || schemars::schema_for!(ExecuteSqlParams),
    },
    ToolSpec {
        name: "list_tables",
        description: "List tables and views in a schema.\nDefaults to the `public` schema. Returns sizes and row estimates for tables.",
        params: &[
            optional("schema", ParamKind::String),
            optional("include_views", ParamKind::Bool),
        ],
        schema: || schemars::schema_for!(ListTablesParams),
    },
    ToolSpec {
        name: "describe_table",
        description: "Get detailed schema information for a table.\nReturns columns, primary key, foreign keys, and indexes.",
        params: &[
            required("table", ParamKind::String),
            optional("schema", ParamKind::String),
        ],
        schema: || schemars::schema_for!(DescribeTableParams),
    },
    ToolSpec {
        name: "list_extensions",
        description: "List installed Postgres extensions with their versions.",
        params: &[],
        schema: empty_schema,
    },
    ToolSpec {
        name: "list_migrations",
        description: "List applied migrations, oldest first.",
        params: &[],
        schema: empty_schema,
    },
    ToolSpec {
        name: "apply_migration",
        description: "Apply a SQL migration and record it in the migration history.\nThe migration runs atomically: either the SQL and the history record both apply, or neither does.\nName must be snake_case, e.g. \"create_users_table\".",
        params: &[
            required("name", ParamKind::String),
            required("sql", ParamKind::String),
        ],
        schema: || schemars::schema_for!(ApplyMigrationParams),
    },
    ToolSpec {
        name: "read_table_rows",
        description: "Read rows from a table with optional column selection, equality filters, ordering, and limit.",
        params: &[
            required("table", ParamKind::String),
            optional("columns", ParamKind::StringArray),
            optional("filters", ParamKind::Object),
            optional("limit", ParamKind::Integer),
            optional("order_by", ParamKind::String),
            optional("ascending", ParamKind::Bool),
        ],
        schema: || schemars::schema_for!(ReadRowsParams),
    },
    ToolSpec {
        name: "create_table_records",
        description: "Insert one or more records into a table.\nAccepts a single object or an array of objects sharing the same columns.\nReturns the created rows.",
        params: &[
            required("table", ParamKind::String),
            required("records", ParamKind::Record),
        ],
        schema: || schemars::schema_for!(InsertRowsParams),
    },
    ToolSpec {
        name: "update_table_records",
        description: "Update records matching equality filters.\nReturns the updated rows.",
        params: &[
            required("table", ParamKind::String),
            required("updates", ParamKind::Object),
            required("filters", ParamKind::Object),
        ],
        schema: || schemars::schema_for!(UpdateRowsParams),
    },
    ToolSpec {
        name: "delete_table_records",
        description: "Delete records matching equality filters.\nReturns the deleted rows.",
        params: &[
            required("table", ParamKind::String),
            required("filters", ParamKind::Object),
        ],
        schema: || schemars::schema_for!(DeleteRowsParams),
    },
];

/// Look up a tool spec by name.
pub fn tool_spec(name: &str) -> Option<&'static ToolSpec> {
    TOOL_SPECS.iter().find(|spec| spec.name == name)
}

/// Validate a tool invocation into a [`Command`].
///
/// Checks run in order: tool lookup, required/typed parameters, then
/// operation-specific semantic checks. The returned command carries only
/// validated fields.
pub fn validate(tool_name: &str, args: &JsonObject) -> Result<Command, ValidationError> {
    let spec =
        tool_spec(tool_name).ok_or_else(|| ValidationError::unknown_tool(tool_name))?;

    for param in spec.params {
        match args.get(param.name) {
            None | Some(JsonValue::Null) if param.required => {
                return Err(ValidationError::missing(param.name));
            }
            None | Some(JsonValue::Null) => {}
            Some(value) if !param.kind.accepts(value) => {
                return Err(ValidationError::type_mismatch(
                    param.name,
                    param.kind.expected_name(),
                    json_type_name(value),
                ));
            }
            Some(_) => {}
        }
    }

    match spec.name {
        "execute_sql" => {
            let sql = str_param(args, "sql");
            check_sql_not_empty("sql", sql)?;
            Ok(Command::ExecuteSql(ExecuteSqlParams {
                sql: sql.to_string(),
            }))
        }
        "list_tables" => {
            let schema = opt_str_param(args, "schema");
            if let Some(schema) = &schema {
                check_identifier("schema", schema)?;
            }
            Ok(Command::ListTables(ListTablesParams {
                schema,
                include_views: bool_param(args, "include_views", true),
            }))
        }
        "describe_table" => {
            let table = str_param(args, "table");
            check_identifier("table", table)?;
            let schema = opt_str_param(args, "schema");
            if let Some(schema) = &schema {
                check_identifier("schema", schema)?;
            }
            Ok(Command::DescribeTable(DescribeTableParams {
                table: table.to_string(),
                schema,
            }))
        }
        "list_extensions" => Ok(Command::ListExtensions),
        "list_migrations" => Ok(Command::ListMigrations),
        "apply_migration" => {
            let name = str_param(args, "name");
            if !is_migration_name(name) {
                return Err(ValidationError::invalid_value(
                    "name",
                    "must be snake_case: lowercase letters, digits and underscores",
                ));
            }
            let sql = str_param(args, "sql");
            check_sql_not_empty("sql", sql)?;
            Ok(Command::ApplyMigration(ApplyMigrationParams {
                name: name.to_string(),
                sql: sql.to_string(),
            }))
        }
        "read_table_rows" => {
            let table = str_param(args, "table");
            check_identifier("table", table)?;

            let columns: Vec<String> = args
                .get("columns")
                .and_then(JsonValue::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(JsonValue::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            for column in &columns {
                check_identifier("columns", column)?;
            }

            let filters = obj_param(args, "filters");
            check_filter_keys("filters", &filters)?;

            let limit = match args.get("limit").filter(|v| !v.is_null()) {
                // Type check above guarantees an integer; as_u64 fails only
                // for negatives. Values past u32 saturate to the row cap.
                Some(value) => match value.as_u64() {
                    None | Some(0) => {
                        return Err(ValidationError::invalid_value(
                            "limit",
                            "must be a positive integer",
                        ));
                    }
                    Some(limit) => Some(u32::try_from(limit).unwrap_or(MAX_RESULT_ROWS)),
                },
                None => None,
            };

            let order_by = opt_str_param(args, "order_by");
            if let Some(order_by) = &order_by {
                check_identifier("order_by", order_by)?;
            }

            Ok(Command::ReadRows(ReadRowsParams {
                table: table.to_string(),
                columns,
                filters,
                limit,
                order_by,
                ascending: bool_param(args, "ascending", true),
            }))
        }
        "create_table_records" => {
            let table = str_param(args, "table");
            check_identifier("table", table)?;
            let records = validate_records(args.get("records"))?;
            Ok(Command::InsertRows(InsertRowsParams {
                table: table.to_string(),
                records,
            }))
        }
        "update_table_records" => {
            let table = str_param(args, "table");
            check_identifier("table", table)?;

            let updates = obj_param(args, "updates");
            if updates.is_empty() {
                return Err(ValidationError::invalid_value("updates", "must not be empty"));
            }
            check_filter_keys("updates", &updates)?;

            let filters = obj_param(args, "filters");
            if filters.is_empty() {
                return Err(ValidationError::invalid_value("filters", "must not be empty"));
            }
            check_filter_keys("filters", &filters)?;

            Ok(Command::UpdateRows(UpdateRowsParams {
                table: table.to_string(),
                updates,
                filters,
            }))
        }
        "delete_table_records" => {
            let table = str_param(args, "table");
            check_identifier("table", table)?;

            let filters = obj_param(args, "filters");
            if filters.is_empty() {
                return Err(ValidationError::invalid_value("filters", "must not be empty"));
            }
            check_filter_keys("filters", &filters)?;

            Ok(Command::DeleteRows(DeleteRowsParams {
                table: table.to_string(),
                filters,
            }))
        }
        // TOOL_SPECS and this match are maintained together
        _ => Err(ValidationError::unknown_tool(spec.name)),
    }
}

/// JSON type name for error messages.
fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(n) if n.is_f64() => "number",
        JsonValue::Number(_) => "integer",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

// Typed accessors. Presence and type are already checked against the spec
// table above, so absence here means the parameter was optional.

fn str_param<'a>(args: &'a JsonObject, name: &str) -> &'a str {
    args.get(name).and_then(JsonValue::as_str).unwrap_or("")
}

fn opt_str_param(args: &JsonObject, name: &str) -> Option<String> {
    args.get(name)
        .and_then(JsonValue::as_str)
        .map(str::to_string)
}

fn bool_param(args: &JsonObject, name: &str, default: bool) -> bool {
    args.get(name).and_then(JsonValue::as_bool).unwrap_or(default)
}

fn obj_param(args: &JsonObject, name: &str) -> JsonObject {
    args.get(name)
        .and_then(JsonValue::as_object)
        .cloned()
        .unwrap_or_default()
}

fn check_sql_not_empty(name: &str, sql: &str) -> Result<(), ValidationError> {
    if sql.trim().is_empty() {
        Err(ValidationError::invalid_value(name, "empty"))
    } else {
        Ok(())
    }
}

/// SQL identifier check: leading letter or underscore, then letters, digits,
/// underscores or `$`, at most 63 bytes (the Postgres NAMEDATALEN limit).
/// Identifiers are additionally quoted when interpolated into SQL.
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    s.len() <= 63
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn check_identifier(param: &str, value: &str) -> Result<(), ValidationError> {
    if is_identifier(value) {
        Ok(())
    } else if value.trim().is_empty() {
        Err(ValidationError::invalid_value(param, "empty"))
    } else {
        Err(ValidationError::invalid_value(
            param,
            format!("'{value}' is not a valid identifier"),
        ))
    }
}

/// Migration names follow the supabase convention: snake_case starting with
/// a letter or underscore.
fn is_migration_name(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 255
        && s.starts_with(|c: char| c.is_ascii_lowercase() || c == '_')
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Filter and update keys are column names, interpolated (quoted) into SQL.
fn check_filter_keys(param: &str, map: &JsonObject) -> Result<(), ValidationError> {
    for key in map.keys() {
        if !is_identifier(key) {
            return Err(ValidationError::invalid_value(
                param,
                format!("'{key}' is not a valid column name"),
            ));
        }
    }
    Ok(())
}

fn validate_records(value: Option<&JsonValue>) -> Result<Records, ValidationError> {
    let records = match value {
        Some(JsonValue::Object(record)) => vec![record.clone()],
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(JsonValue::as_object)
            .cloned()
            .collect(),
        // Presence/type already checked against the spec table
        _ => Vec::new(),
    };

    if records.is_empty() || records.iter().any(Map::is_empty) {
        return Err(ValidationError::invalid_value(
            "records",
            "must contain at least one non-empty record",
        ));
    }

    let first_keys: Vec<&String> = records[0].keys().collect();
    for record in &records[1..] {
        let keys: Vec<&String> = record.keys().collect();
        if keys != first_keys {
            return Err(ValidationError::invalid_value(
                "records",
                "all records must share the same columns",
            ));
        }
    }

    for record in &records {
        check_filter_keys("records", record)?;
    }

    Ok(Records::Many(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("users"));
        assert!(is_identifier("_internal"));
        assert!(is_identifier("col$1"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("1col"));
        assert!(!is_identifier("users; DROP TABLE x"));
        assert!(!is_identifier("a\"b"));
        assert!(!is_identifier(&"a".repeat(64)));
    }

    #[test]
    fn test_is_migration_name() {
        assert!(is_migration_name("create_users_table"));
        assert!(is_migration_name("v2_add_index"));
        assert!(!is_migration_name("Create Users"));
        assert!(!is_migration_name(""));
        assert!(!is_migration_name("drop;--"));
    }

    #[test]
    fn test_every_spec_has_a_handler() {
        // A spec entry whose name is not handled in validate() would fall
        // through to UnknownTool; catch that here.
        for spec in TOOL_SPECS {
            let mut args = Map::new();
            for param in spec.params {
                let value = match param.kind {
                    ParamKind::String => JsonValue::from("placeholder"),
                    ParamKind::Integer => JsonValue::from(1),
                    ParamKind::Bool => JsonValue::from(true),
                    ParamKind::Object | ParamKind::Record => {
                        serde_json::json!({ "id": 1 })
                    }
                    ParamKind::StringArray => serde_json::json!(["id"]),
                };
                args.insert(param.name.to_string(), value);
            }
            let result = validate(spec.name, &args);
            assert!(
                !matches!(result, Err(ValidationError::UnknownTool { .. })),
                "spec '{}' has no validator arm",
                spec.name
            );
        }
    }

    #[test]
    fn test_input_schema_is_object() {
        for spec in TOOL_SPECS {
            let schema = spec.input_schema();
            assert_eq!(
                schema.get("type").and_then(JsonValue::as_str),
                Some("object"),
                "schema for '{}' should be an object schema",
                spec.name
            );
        }
    }
}
