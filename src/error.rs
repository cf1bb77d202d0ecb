//! Error types for the Supabase MCP Server.
//!
//! This module defines the full error taxonomy using `thiserror`. Errors split
//! into two phases: validation errors, produced before any backend interaction,
//! and backend errors, produced by the single conversion boundary around the
//! database client. Both render into an [`ErrorInfo`] that is embedded in the
//! response envelope; neither is ever fatal to the process.

use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

/// Machine-readable error categories exposed to MCP clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub enum ErrorKind {
    // Validation phase - the backend is never reached.
    UnknownTool,
    MissingParameter,
    TypeMismatch,
    InvalidValue,
    // Execution phase - backend-originated.
    ConnectionError,
    PermissionDenied,
    QueryError,
    NotFound,
    Unknown,
}

impl ErrorKind {
    /// True for errors raised before any backend call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownTool | Self::MissingParameter | Self::TypeMismatch | Self::InvalidValue
        )
    }
}

/// Structured error details carried in the response envelope.
///
/// Carries enough context to debug a failed invocation without leaking
/// secrets: connection strings and credentials are never included.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, JsonValue>,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Map::new(),
        }
    }

    /// Attach a context entry for debugging.
    pub fn with_context(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }
}

/// Errors produced by the request validator.
///
/// These are returned to the caller immediately; no backend call is made.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Unknown tool: '{tool}'")]
    UnknownTool { tool: String },

    #[error("Missing required parameter: '{name}'")]
    MissingParameter { name: String },

    #[error("Parameter '{name}' has wrong type: expected {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidValue { name: String, reason: String },
}

impl ValidationError {
    pub fn unknown_tool(tool: impl Into<String>) -> Self {
        Self::UnknownTool { tool: tool.into() }
    }

    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    pub fn type_mismatch(
        name: impl Into<String>,
        expected: &'static str,
        actual: &'static str,
    ) -> Self {
        Self::TypeMismatch {
            name: name.into(),
            expected,
            actual,
        }
    }

    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTool { .. } => ErrorKind::UnknownTool,
            Self::MissingParameter { .. } => ErrorKind::MissingParameter,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::InvalidValue { .. } => ErrorKind::InvalidValue,
        }
    }
}

impl From<ValidationError> for ErrorInfo {
    fn from(err: ValidationError) -> Self {
        let info = ErrorInfo::new(err.kind(), err.to_string());
        match err {
            ValidationError::UnknownTool { tool } => info.with_context("tool", tool),
            ValidationError::MissingParameter { name } => info.with_context("parameter", name),
            ValidationError::TypeMismatch {
                name,
                expected,
                actual,
            } => info
                .with_context("parameter", name)
                .with_context("expected", expected)
                .with_context("actual", actual),
            ValidationError::InvalidValue { name, reason } => info
                .with_context("parameter", name)
                .with_context("reason", reason),
        }
    }
}

/// Errors produced by backend operations.
///
/// Every error crossing the executor boundary is converted into one of these
/// variants at a single point (`From<sqlx::Error>` below); no other layer
/// performs its own conversion.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Query failed: {message}")]
    Query {
        message: String,
        /// SQLSTATE code reported by the server, e.g. "42601"
        code: Option<String>,
    },

    #[error("Not found: {object}")]
    NotFound { object: String },

    #[error("Unknown backend error: {message}")]
    Unknown { message: String },
}

impl BackendError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>, code: Option<String>) -> Self {
        Self::Query {
            message: message.into(),
            code,
        }
    }

    pub fn not_found(object: impl Into<String>) -> Self {
        Self::NotFound {
            object: object.into(),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. } => ErrorKind::ConnectionError,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::Query { .. } => ErrorKind::QueryError,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }
}

impl From<BackendError> for ErrorInfo {
    fn from(err: BackendError) -> Self {
        let info = ErrorInfo::new(err.kind(), err.to_string());
        match err {
            BackendError::Query {
                code: Some(code), ..
            } => info.with_context("sqlstate", code),
            BackendError::NotFound { object } => info.with_context("object", object),
            BackendError::Unknown { message } => info.with_context("original_message", message),
            _ => info,
        }
    }
}

/// Classify a SQLSTATE code into an error kind.
///
/// Class prefixes follow the PostgreSQL error code appendix. Codes outside
/// the recognized classes fall through to `Unknown` so the original message
/// is preserved verbatim.
fn classify_sqlstate(code: &str, message: &str) -> BackendError {
    // Exact codes first
    match code {
        // insufficient_privilege
        "42501" => return BackendError::permission_denied(message),
        // undefined_table, undefined_object, undefined_column, undefined_function
        "42P01" | "42704" | "42703" | "42883" => {
            return BackendError::NotFound {
                object: message.to_string(),
            };
        }
        _ => {}
    }

    let class = &code[..code.len().min(2)];
    match class {
        // invalid_authorization_specification, invalid_grantor, invalid_role_specification
        "28" | "0L" | "0P" => BackendError::permission_denied(message),
        // connection_exception, insufficient_resources, operator_intervention, system_error
        "08" | "53" | "57" | "58" => BackendError::connection(message),
        // syntax/access rule, data exception, integrity constraint, invalid transaction
        // state, cardinality, transaction rollback, with check option, program limit
        "42" | "22" | "23" | "25" | "21" | "40" | "44" | "54" | "0A" | "2B" => {
            BackendError::query(message, Some(code.to_string()))
        }
        // invalid_catalog_name, invalid_schema_name, invalid_sql_statement_name
        "3D" | "3F" | "26" => BackendError::NotFound {
            object: message.to_string(),
        },
        _ => BackendError::unknown(format!("{message} (SQLSTATE: {code})")),
    }
}

/// Convert sqlx errors to BackendError.
///
/// This is the single exception-to-result conversion point for the whole
/// crate. Database-reported errors are classified by SQLSTATE; driver-level
/// failures map to connection errors; anything unrecognized becomes `Unknown`
/// with the original message intact.
impl From<sqlx::Error> for BackendError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => match db_err.code() {
                Some(code) => classify_sqlstate(&code, db_err.message()),
                None => BackendError::unknown(db_err.message().to_string()),
            },
            sqlx::Error::Configuration(msg) => BackendError::connection(msg.to_string()),
            sqlx::Error::RowNotFound => BackendError::not_found("no rows returned"),
            sqlx::Error::PoolTimedOut => {
                BackendError::connection("timed out acquiring a connection from the pool")
            }
            sqlx::Error::PoolClosed => BackendError::connection("connection pool is closed"),
            sqlx::Error::Io(io_err) => BackendError::connection(format!("I/O error: {io_err}")),
            sqlx::Error::Tls(tls_err) => BackendError::connection(format!("TLS error: {tls_err}")),
            sqlx::Error::Protocol(msg) => {
                BackendError::connection(format!("protocol error: {msg}"))
            }
            sqlx::Error::ColumnNotFound(col) => {
                BackendError::not_found(format!("column '{col}'"))
            }
            other => BackendError::unknown(other.to_string()),
        }
    }
}

/// Result type alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::missing("sql");
        assert!(err.to_string().contains("sql"));
        assert_eq!(err.kind(), ErrorKind::MissingParameter);
    }

    #[test]
    fn test_type_mismatch_context() {
        let err = ValidationError::type_mismatch("limit", "integer", "string");
        let info: ErrorInfo = err.into();
        assert_eq!(info.kind, ErrorKind::TypeMismatch);
        assert_eq!(info.context["expected"], "integer");
        assert_eq!(info.context["actual"], "string");
    }

    #[test]
    fn test_permission_sqlstate() {
        let err = classify_sqlstate("42501", "permission denied for table users");
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_undefined_table_sqlstate() {
        let err = classify_sqlstate("42P01", "relation \"missing\" does not exist");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_syntax_error_sqlstate_keeps_code() {
        let err = classify_sqlstate("42601", "syntax error at or near \"SELEC\"");
        assert_eq!(err.kind(), ErrorKind::QueryError);
        let info: ErrorInfo = err.into();
        assert_eq!(info.context["sqlstate"], "42601");
    }

    #[test]
    fn test_connection_class_sqlstate() {
        let err = classify_sqlstate("08006", "connection failure");
        assert_eq!(err.kind(), ErrorKind::ConnectionError);
    }

    #[test]
    fn test_unrecognized_sqlstate_is_unknown() {
        let err = classify_sqlstate("XX000", "internal error");
        assert_eq!(err.kind(), ErrorKind::Unknown);
        let info: ErrorInfo = err.into();
        assert!(
            info.context["original_message"]
                .as_str()
                .unwrap()
                .contains("internal error")
        );
    }

    #[test]
    fn test_sqlx_pool_errors_are_connection() {
        let err: BackendError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err.kind(), ErrorKind::ConnectionError);
        let err: BackendError = sqlx::Error::PoolClosed.into();
        assert_eq!(err.kind(), ErrorKind::ConnectionError);
    }

    #[test]
    fn test_sqlx_row_not_found_maps_to_not_found() {
        let err: BackendError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_error_kind_phase() {
        assert!(ErrorKind::InvalidValue.is_validation());
        assert!(!ErrorKind::QueryError.is_validation());
    }

    #[test]
    fn test_error_info_serializes_kind_name() {
        let info = ErrorInfo::new(ErrorKind::PermissionDenied, "nope");
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["kind"], "PermissionDenied");
        assert_eq!(json["message"], "nope");
    }
}
