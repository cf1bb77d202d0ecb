//! Black-box fuzzing tests for the request validator.
//!
//! Random, malicious, and edge-case inputs are fed through validation to
//! discover panics and inputs that should be rejected but are not.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Map, Value};
use supabase_mcp_server::error::ValidationError;
use supabase_mcp_server::tools::{validate, TOOL_SPECS};

/// Generate random string of given length
fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate various edge-case strings
fn edge_case_strings() -> Vec<String> {
    vec![
        String::new(),                           // Empty
        " ".to_string(),                         // Single space
        "   ".to_string(),                       // Multiple spaces
        "\n\r\t".to_string(),                    // Whitespace chars
        "\0".to_string(),                        // Null byte
        "日本語".repeat(100),                    // Unicode
        "'OR 1=1--".to_string(),                 // SQL injection
        "'; DROP TABLE users--".to_string(),     // SQL injection
        "<script>alert(1)</script>".to_string(), // XSS
        "../../etc/passwd".to_string(),          // Path traversal
        "a".repeat(10000),                       // Very long string
        "a".repeat(1_000_000),                   // Extremely long
        random_string(100),
        random_string(1000),
        "\u{0000}\u{FFFF}".to_string(), // Special unicode
        "';SELECT * FROM information_schema.tables--".to_string(),
        "1' UNION SELECT NULL, NULL--".to_string(),
        "users\"; DROP TABLE users; --".to_string(),
        "{{7*7}}".to_string(), // Template injection
        "\x00\x01\x02".to_string(),
    ]
}

/// JSON values of every type, for parameter type confusion
fn edge_case_values() -> Vec<Value> {
    vec![
        Value::Null,
        json!(true),
        json!(false),
        json!(0),
        json!(-1),
        json!(i64::MAX),
        json!(i64::MIN),
        json!(f64::MAX),
        json!(0.5),
        json!(""),
        json!("text"),
        json!([]),
        json!([1, 2, 3]),
        json!([["nested"]]),
        json!({}),
        json!({"k": {"nested": [null]}}),
    ]
}

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

#[test]
fn fuzz_tool_names_never_panic() {
    for name in edge_case_strings() {
        let result = validate(&name, &args(json!({})));
        // Unrecognized names must map to UnknownTool, nothing else
        assert!(matches!(
            result,
            Err(ValidationError::UnknownTool { .. })
        ));
    }
}

#[test]
fn fuzz_table_names_are_rejected_or_safe() {
    for table in edge_case_strings() {
        for tool in [
            "describe_table",
            "read_table_rows",
            "delete_table_records",
        ] {
            let result = validate(
                tool,
                &args(json!({"table": table, "filters": {"id": 1}})),
            );
            // Anything that validates must be a plain identifier; none of
            // the edge cases are, so all of them must be rejected.
            assert!(
                result.is_err(),
                "tool '{tool}' accepted table name {table:?}"
            );
        }
    }
}

#[test]
fn fuzz_sql_text_is_passed_or_rejected_without_panic() {
    // SQL is opaque: any non-blank text is accepted, blank is rejected
    for sql in edge_case_strings() {
        let result = validate("execute_sql", &args(json!({"sql": sql.clone()})));
        if sql.trim().is_empty() {
            assert!(matches!(
                result,
                Err(ValidationError::InvalidValue { .. })
            ));
        } else {
            assert!(result.is_ok(), "non-blank SQL {sql:?} was rejected");
        }
    }
}

#[test]
fn fuzz_migration_names() {
    for name in edge_case_strings() {
        let result = validate(
            "apply_migration",
            &args(json!({"name": name, "sql": "SELECT 1"})),
        );
        // None of the edge cases are valid snake_case names
        assert!(result.is_err(), "accepted migration name {name:?}");
    }
}

#[test]
fn fuzz_every_parameter_with_every_json_type() {
    // Every tool parameter gets every JSON type; validation must either
    // produce a command or a structured error, never panic.
    for spec in TOOL_SPECS {
        for param in spec.params {
            for value in edge_case_values() {
                let mut arguments = Map::new();
                arguments.insert(param.name.to_string(), value);
                let _ = validate(spec.name, &arguments);
            }
        }
    }
}

#[test]
fn fuzz_filter_keys() {
    for key in edge_case_strings() {
        let mut filters = Map::new();
        filters.insert(key.clone(), json!(1));
        let result = validate(
            "read_table_rows",
            &args(json!({"table": "users", "filters": filters})),
        );
        assert!(result.is_err(), "accepted filter column {key:?}");
    }
}

#[test]
fn fuzz_record_shapes() {
    let shapes = vec![
        json!(null),
        json!([]),
        json!({}),
        json!([{}]),
        json!([{"a": 1}, {"b": 2}]),
        json!([{"a": 1}, "not an object"]),
        json!("just a string"),
        json!(42),
        json!([[{"a": 1}]]),
        json!({"valid_col": null}),
        json!([{"a": 1}, {"a": 2}, {"a": 3}]),
    ];

    for records in shapes {
        let result = validate(
            "create_table_records",
            &args(json!({"table": "users", "records": records})),
        );
        // Must never panic; acceptance implies well-formed uniform records
        if let Ok(cmd) = result {
            match cmd {
                supabase_mcp_server::models::Command::InsertRows(params) => {
                    let records = params.records.into_vec();
                    assert!(!records.is_empty());
                    assert!(records.iter().all(|r| !r.is_empty()));
                }
                other => panic!("wrong command: {other:?}"),
            }
        }
    }
}

#[test]
fn fuzz_limit_values() {
    for limit in [
        json!(0),
        json!(-1),
        json!(i64::MIN),
        json!(i64::MAX),
        json!(u64::MAX),
        json!(1.5),
        json!("10"),
    ] {
        let result = validate(
            "read_table_rows",
            &args(json!({"table": "users", "limit": limit})),
        );
        // Only positive integers pass; fractional, string, and non-positive
        // values are errors
        match result {
            Ok(_) => {}
            Err(
                ValidationError::InvalidValue { .. } | ValidationError::TypeMismatch { .. },
            ) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
}

#[test]
fn fuzz_random_argument_maps() {
    let mut rng = rand::thread_rng();

    for _ in 0..500 {
        let tool = TOOL_SPECS[rng.gen_range(0..TOOL_SPECS.len())].name;
        let mut arguments = Map::new();
        for _ in 0..rng.gen_range(0..6) {
            let key = random_string(rng.gen_range(1..12));
            let value = match rng.gen_range(0..5) {
                0 => Value::Null,
                1 => json!(rng.r#gen::<i64>()),
                2 => json!(random_string(rng.gen_range(0..30))),
                3 => json!(rng.r#gen::<bool>()),
                _ => json!({ "nested": random_string(5) }),
            };
            arguments.insert(key, value);
        }
        // Must not panic regardless of outcome
        let _ = validate(tool, &arguments);
    }
}
