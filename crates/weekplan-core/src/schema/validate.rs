//! Structural validation of a JSON value against the response schema.

use std::fmt;

use serde_json::Value;

/// A single place where a value does not match the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON path of the offending value, e.g. `$.dailyPlans[2].areaPlay`.
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validate `value` against `schema`, collecting every violation.
///
/// Supports the subset of the dialect the response schema uses: `type`,
/// `properties`, `required`, `items`, `minItems` and `maxItems`. Properties
/// not declared in the schema are ignored.
pub fn validate(schema: &Value, value: &Value) -> Result<(), Vec<SchemaViolation>> {
    let mut violations = Vec::new();
    check(schema, value, "$", &mut violations);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn check(schema: &Value, value: &Value, path: &str, out: &mut Vec<SchemaViolation>) {
    let expected = schema.get("type").and_then(Value::as_str).unwrap_or("");
    match expected {
        "OBJECT" => {
            let Some(obj) = value.as_object() else {
                out.push(mismatch(path, "object", value));
                return;
            };
            if let Some(required) = schema.get("required").and_then(Value::as_array) {
                for name in required.iter().filter_map(Value::as_str) {
                    match obj.get(name) {
                        None | Some(Value::Null) => out.push(SchemaViolation {
                            path: path.to_string(),
                            message: format!("missing required field {name:?}"),
                        }),
                        Some(_) => {}
                    }
                }
            }
            if let Some(props) = schema.get("properties").and_then(Value::as_object) {
                for (name, sub_schema) in props {
                    if let Some(sub_value) = obj.get(name).filter(|v| !v.is_null()) {
                        check(sub_schema, sub_value, &format!("{path}.{name}"), out);
                    }
                }
            }
        }
        "ARRAY" => {
            let Some(items) = value.as_array() else {
                out.push(mismatch(path, "array", value));
                return;
            };
            let len = items.len() as u64;
            if let Some(min) = schema.get("minItems").and_then(as_count) {
                if len < min {
                    out.push(SchemaViolation {
                        path: path.to_string(),
                        message: format!("expected at least {min} items, got {len}"),
                    });
                }
            }
            if let Some(max) = schema.get("maxItems").and_then(as_count) {
                if len > max {
                    out.push(SchemaViolation {
                        path: path.to_string(),
                        message: format!("expected at most {max} items, got {len}"),
                    });
                }
            }
            if let Some(item_schema) = schema.get("items") {
                for (i, item) in items.iter().enumerate() {
                    check(item_schema, item, &format!("{path}[{i}]"), out);
                }
            }
        }
        "STRING" => {
            if !value.is_string() {
                out.push(mismatch(path, "string", value));
            }
        }
        _ => {}
    }
}

/// Counts may be encoded as JSON numbers or as decimal strings.
fn as_count(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

fn mismatch(path: &str, expected: &str, value: &Value) -> SchemaViolation {
    let actual = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    SchemaViolation {
        path: path.to_string(),
        message: format!("expected {expected}, got {actual}"),
    }
}
