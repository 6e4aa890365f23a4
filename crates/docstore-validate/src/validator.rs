use docstore_flatten::{flatten, DataType, TypedValue};
use regex::Regex;
use serde_json::Value as Json;

use crate::constraint::{EnforcementMode, FieldConstraint};

/// One failed check against a field, reported by path (§4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    fn new(field_path: &str, message: impl Into<String>) -> Self {
        ValidationError { field_path: field_path.to_string(), message: message.into() }
    }
}

/// Result of validating one document against a collection's constraints.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub accepted: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationError>,
}

impl ValidationOutcome {
    fn accept() -> Self {
        ValidationOutcome { accepted: true, errors: Vec::new(), warnings: Vec::new() }
    }
}

fn data_type_matches(declared: DataType, actual: DataType) -> bool {
    declared == actual
}

/// Runs every check in a field's value(s) against its constraint, in the
/// fixed order §4.6 specifies, appending every failure rather than
/// short-circuiting on the first one.
fn check_field(
    constraint: &FieldConstraint,
    values: &[TypedValue],
    errors: &mut Vec<ValidationError>,
) {
    let path = &constraint.field_path;

    if values.is_empty() {
        if constraint.required {
            errors.push(ValidationError::new(path, "required field is missing"));
        }
        return;
    }

    let is_array = constraint.data_type == DataType::Array;

    if is_array {
        if let Some(min) = constraint.min_length {
            if values.len() < min {
                errors.push(ValidationError::new(
                    path,
                    format!("array has {} elements, fewer than minimum {min}", values.len()),
                ));
            }
        }
        if let Some(max) = constraint.max_length {
            if values.len() > max {
                errors.push(ValidationError::new(
                    path,
                    format!("array has {} elements, more than maximum {max}", values.len()),
                ));
            }
        }
        for value in values {
            check_scalar(constraint, path, value, constraint.array_element_type, errors);
        }
        return;
    }

    if values.len() > 1 {
        errors.push(ValidationError::new(
            path,
            "multiple values found for a field declared as a scalar",
        ));
        return;
    }

    check_scalar(constraint, path, &values[0], Some(constraint.data_type), errors);
}

fn check_scalar(
    constraint: &FieldConstraint,
    path: &str,
    value: &TypedValue,
    expected_type: Option<DataType>,
    errors: &mut Vec<ValidationError>,
) {
    if matches!(value, TypedValue::Null) {
        if !constraint.nullable {
            errors.push(ValidationError::new(path, "null value not allowed"));
        }
        return;
    }

    if let Some(expected) = expected_type {
        if !data_type_matches(expected, value.data_type()) {
            errors.push(ValidationError::new(
                path,
                format!(
                    "expected type {}, found {}",
                    expected.as_str(),
                    value.data_type().as_str()
                ),
            ));
            return;
        }
    }

    if let TypedValue::Integer(i) = value {
        let n = *i as f64;
        check_numeric_range(constraint, path, n, errors);
    }
    if let TypedValue::Number(n) = value {
        check_numeric_range(constraint, path, *n, errors);
    }

    if let TypedValue::String(s) = value {
        if let Some(min) = constraint.min_length {
            if s.chars().count() < min {
                errors.push(ValidationError::new(
                    path,
                    format!("string is shorter than minimum length {min}"),
                ));
            }
        }
        if let Some(max) = constraint.max_length {
            if s.chars().count() > max {
                errors.push(ValidationError::new(
                    path,
                    format!("string is longer than maximum length {max}"),
                ));
            }
        }
        if let Some(pattern) = &constraint.regex_pattern {
            match Regex::new(&anchored(pattern)) {
                Ok(re) => {
                    if !re.is_match(s) {
                        errors.push(ValidationError::new(
                            path,
                            format!("value does not match pattern '{pattern}'"),
                        ));
                    }
                }
                Err(e) => {
                    errors.push(ValidationError::new(path, format!("invalid regex pattern: {e}")));
                }
            }
        }
    }

    if let Some(allowed) = &constraint.allowed_values {
        let text = value.canonical_text();
        if !allowed.iter().any(|a| a == &text) {
            errors.push(ValidationError::new(
                path,
                format!("value '{text}' is not among the allowed values"),
            ));
        }
    }
}

fn check_numeric_range(constraint: &FieldConstraint, path: &str, n: f64, errors: &mut Vec<ValidationError>) {
    if let Some(min) = constraint.min_value {
        if n < min {
            errors.push(ValidationError::new(path, format!("value {n} is below minimum {min}")));
        }
    }
    if let Some(max) = constraint.max_value {
        if n > max {
            errors.push(ValidationError::new(path, format!("value {n} is above maximum {max}")));
        }
    }
}

/// Anchors a regex pattern to the full string, per §4.6's "anchored match
/// on the full string".
fn anchored(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 2);
    if !pattern.starts_with('^') {
        out.push('^');
    }
    out.push_str(pattern);
    if !pattern.ends_with('$') {
        out.push('$');
    }
    out
}

/// Validates `document` against `constraints` under `mode` (§4.6).
pub fn validate(document: &Json, constraints: &[FieldConstraint], mode: EnforcementMode) -> ValidationOutcome {
    if mode == EnforcementMode::None {
        return ValidationOutcome::accept();
    }

    let entries = flatten(document);

    let mut errors = Vec::new();
    for constraint in constraints {
        let values: Vec<TypedValue> = entries
            .iter()
            .filter(|e| e.path == constraint.field_path)
            .map(|e| e.value.clone())
            .collect();

        if mode == EnforcementMode::Partial && values.is_empty() {
            continue;
        }

        check_field(constraint, &values, &mut errors);
    }

    match mode {
        EnforcementMode::Strict | EnforcementMode::Partial => ValidationOutcome {
            accepted: errors.is_empty(),
            errors,
            warnings: Vec::new(),
        },
        EnforcementMode::Flexible => ValidationOutcome { accepted: true, errors: Vec::new(), warnings: errors },
        EnforcementMode::None => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn email_constraint() -> FieldConstraint {
        let mut c = FieldConstraint::new("email", DataType::String);
        c.required = true;
        c.nullable = false;
        c.regex_pattern = Some("^[^@]+@[^@]+$".to_string());
        c
    }

    #[test]
    fn none_mode_never_rejects() {
        let outcome = validate(&json!({}), &[email_constraint()], EnforcementMode::None);
        assert!(outcome.accepted);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn strict_mode_rejects_missing_required_field() {
        let outcome = validate(&json!({}), &[email_constraint()], EnforcementMode::Strict);
        assert!(!outcome.accepted);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].field_path, "email");
    }

    #[test]
    fn strict_mode_rejects_pattern_mismatch() {
        let outcome = validate(
            &json!({ "email": "nope" }),
            &[email_constraint()],
            EnforcementMode::Strict,
        );
        assert!(!outcome.accepted);
        assert_eq!(outcome.errors.len(), 1);
    }

    #[test]
    fn strict_mode_allows_unknown_fields() {
        let outcome = validate(
            &json!({ "email": "a@b.com", "extra": 1 }),
            &[email_constraint()],
            EnforcementMode::Strict,
        );
        assert!(outcome.accepted);
    }

    #[test]
    fn flexible_mode_accepts_but_warns() {
        let outcome = validate(&json!({}), &[email_constraint()], EnforcementMode::Flexible);
        assert!(outcome.accepted);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn partial_mode_skips_missing_fields() {
        let outcome = validate(&json!({}), &[email_constraint()], EnforcementMode::Partial);
        assert!(outcome.accepted);
    }

    #[test]
    fn type_coercion_is_never_performed() {
        let mut c = FieldConstraint::new("age", DataType::String);
        c.required = true;
        let outcome = validate(&json!({ "age": 42 }), &[c], EnforcementMode::Strict);
        assert!(!outcome.accepted);
        assert!(outcome.errors[0].message.contains("expected type"));
    }

    #[test]
    fn numeric_range_is_checked() {
        let mut c = FieldConstraint::new("age", DataType::Integer);
        c.min_value = Some(0.0);
        c.max_value = Some(120.0);
        let outcome = validate(&json!({ "age": 999 }), &[c], EnforcementMode::Strict);
        assert!(!outcome.accepted);
    }

    #[test]
    fn array_element_type_checked_for_every_element() {
        let mut c = FieldConstraint::new("tags", DataType::Array);
        c.array_element_type = Some(DataType::String);
        let outcome = validate(&json!({ "tags": ["a", 1, "c"] }), &[c], EnforcementMode::Strict);
        assert!(!outcome.accepted);
        assert_eq!(outcome.errors.len(), 1);
    }

    #[test]
    fn allowed_values_membership() {
        let mut c = FieldConstraint::new("status", DataType::String);
        c.allowed_values = Some(vec!["active".into(), "inactive".into()]);
        let outcome = validate(&json!({ "status": "deleted" }), &[c], EnforcementMode::Strict);
        assert!(!outcome.accepted);
    }
}
