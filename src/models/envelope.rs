//! The uniform success/error response shape returned for every invocation.

use crate::error::ErrorInfo;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Result envelope for a single tool invocation.
///
/// Exactly one of `data`/`error` is present, matching `success`. The fields
/// are private and the only constructors are [`ResponseEnvelope::ok`] and
/// [`ResponseEnvelope::fail`], so the invariant holds by construction.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseEnvelope {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorInfo>,
}

impl ResponseEnvelope {
    /// Build a success envelope carrying the serialized backend result.
    pub fn ok(data: JsonValue) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Build a failure envelope from any error convertible to [`ErrorInfo`].
    pub fn fail(error: impl Into<ErrorInfo>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&JsonValue> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ValidationError};
    use serde_json::json;

    #[test]
    fn test_ok_envelope_has_data_only() {
        let envelope = ResponseEnvelope::ok(json!({"rows": []}));
        assert!(envelope.is_success());
        assert!(envelope.data().is_some());
        assert!(envelope.error().is_none());
    }

    #[test]
    fn test_fail_envelope_has_error_only() {
        let envelope = ResponseEnvelope::fail(ValidationError::missing("sql"));
        assert!(!envelope.is_success());
        assert!(envelope.data().is_none());
        assert_eq!(envelope.error().unwrap().kind, ErrorKind::MissingParameter);
    }

    #[test]
    fn test_serialization_omits_absent_side() {
        let ok = serde_json::to_value(ResponseEnvelope::ok(json!(1))).unwrap();
        assert_eq!(ok["success"], true);
        assert!(ok.get("error").is_none());

        let fail =
            serde_json::to_value(ResponseEnvelope::fail(ValidationError::unknown_tool("x")))
                .unwrap();
        assert_eq!(fail["success"], false);
        assert!(fail.get("data").is_none());
        assert_eq!(fail["error"]["kind"], "UnknownTool");
    }
}
