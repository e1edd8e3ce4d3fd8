use regex::Regex;
use serde_json::{Map, Value};

use super::describe::fmt_number;
use super::{ErrorCode, ParsedOutcome, SchemaType, ValidationError, MAX_SCHEMA_DEPTH};

/// Check a candidate against a schema tree, collecting every violation.
///
/// On success the returned value is canonical: object fields appear in schema order, keys the
/// schema does not declare are dropped, and absent or `null` optional fields are omitted.
pub fn validate(schema: &SchemaType, candidate: &Value) -> ParsedOutcome {
    let mut errors = Vec::new();
    let canonical = check(schema, candidate, "", 1, &mut errors);
    match canonical {
        Some(value) if errors.is_empty() => ParsedOutcome::Success(value),
        _ => ParsedOutcome::Failure(errors),
    }
}

fn check(
    schema: &SchemaType,
    value: &Value,
    path: &str,
    depth: usize,
    errors: &mut Vec<ValidationError>,
) -> Option<Value> {
    if depth > MAX_SCHEMA_DEPTH {
        errors.push(ValidationError::new(
            path,
            format!("nesting exceeds the maximum depth of {MAX_SCHEMA_DEPTH}"),
            ErrorCode::DepthExceeded,
        ));
        return None;
    }

    match schema {
        SchemaType::Object { fields } => {
            let Some(map) = value.as_object() else {
                errors.push(mismatch(path, "an object", value));
                return None;
            };
            let mut out = Map::new();
            for field in fields {
                let field_path = child(path, &field.name);
                match (map.get(&field.name), &field.schema) {
                    (None | Some(Value::Null), SchemaType::Optional { .. }) => {}
                    (None, _) => errors.push(ValidationError::new(
                        field_path,
                        "required field is missing",
                        ErrorCode::MissingRequired,
                    )),
                    (Some(v), field_schema) => {
                        if let Some(checked) = check(field_schema, v, &field_path, depth + 1, errors) {
                            out.insert(field.name.clone(), checked);
                        }
                    }
                }
            }
            Some(Value::Object(out))
        }
        SchemaType::Array {
            items,
            min_items,
            max_items,
        } => {
            let Some(elements) = value.as_array() else {
                errors.push(mismatch(path, "an array", value));
                return None;
            };
            if let Some(min) = min_items {
                if elements.len() < *min {
                    errors.push(ValidationError::new(
                        path,
                        format!("must contain at least {min} items, got {}", elements.len()),
                        ErrorCode::MinItems,
                    ));
                }
            }
            if let Some(max) = max_items {
                if elements.len() > *max {
                    errors.push(ValidationError::new(
                        path,
                        format!("must contain at most {max} items, got {}", elements.len()),
                        ErrorCode::MaxItems,
                    ));
                }
            }
            let checked: Vec<Value> = elements
                .iter()
                .enumerate()
                .filter_map(|(i, element)| {
                    check(items, element, &format!("{path}[{i}]"), depth + 1, errors)
                })
                .collect();
            Some(Value::Array(checked))
        }
        SchemaType::Enum { values } => {
            let Some(text) = value.as_str() else {
                errors.push(mismatch(path, "a string", value));
                return None;
            };
            if values.iter().any(|v| v == text) {
                Some(value.clone())
            } else {
                let allowed: Vec<String> = values.iter().map(|v| format!("\"{v}\"")).collect();
                errors.push(ValidationError::new(
                    path,
                    format!("must be one of {}, got \"{text}\"", allowed.join(", ")),
                    ErrorCode::EnumMismatch,
                ));
                None
            }
        }
        SchemaType::Optional { inner } => {
            if value.is_null() {
                Some(Value::Null)
            } else {
                check(inner, value, path, depth + 1, errors)
            }
        }
        SchemaType::String {
            min_length,
            max_length,
            pattern,
        } => {
            let Some(text) = value.as_str() else {
                errors.push(mismatch(path, "a string", value));
                return None;
            };
            let before = errors.len();
            let length = text.chars().count();
            if let Some(min) = min_length {
                if length < *min {
                    errors.push(ValidationError::new(
                        path,
                        format!("must be at least {min} characters long, got {length}"),
                        ErrorCode::TooShort,
                    ));
                }
            }
            if let Some(max) = max_length {
                if length > *max {
                    errors.push(ValidationError::new(
                        path,
                        format!("must be at most {max} characters long, got {length}"),
                        ErrorCode::TooLong,
                    ));
                }
            }
            // Patterns are checked when the schema is built; an uncompilable one is skipped here.
            if let Some(re) = pattern.as_deref().and_then(|p| Regex::new(p).ok()) {
                if !re.is_match(text) {
                    errors.push(ValidationError::new(
                        path,
                        format!("must match the pattern /{}/", re.as_str()),
                        ErrorCode::PatternMismatch,
                    ));
                }
            }
            (errors.len() == before).then(|| value.clone())
        }
        SchemaType::Number {
            minimum,
            maximum,
            integer,
        } => {
            let Some(n) = value.as_f64() else {
                errors.push(mismatch(path, "a number", value));
                return None;
            };
            let before = errors.len();
            if *integer && n.fract() != 0.0 {
                errors.push(ValidationError::new(
                    path,
                    format!("must be an integer, got {}", fmt_number(n)),
                    ErrorCode::NotInteger,
                ));
            }
            if let Some(min) = minimum {
                if n < *min {
                    errors.push(ValidationError::new(
                        path,
                        format!("must be at least {}, got {}", fmt_number(*min), fmt_number(n)),
                        ErrorCode::OutOfRange,
                    ));
                }
            }
            if let Some(max) = maximum {
                if n > *max {
                    errors.push(ValidationError::new(
                        path,
                        format!("must be at most {}, got {}", fmt_number(*max), fmt_number(n)),
                        ErrorCode::OutOfRange,
                    ));
                }
            }
            (errors.len() == before).then(|| value.clone())
        }
        SchemaType::Boolean => {
            if value.is_boolean() {
                Some(value.clone())
            } else {
                errors.push(mismatch(path, "a boolean", value));
                None
            }
        }
    }
}

fn child(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn mismatch(path: &str, expected: &str, value: &Value) -> ValidationError {
    ValidationError::new(
        path,
        format!("expected {expected}, got {}", json_type(value)),
        ErrorCode::TypeMismatch,
    )
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
