//! Request body validation shared by the item and registration endpoints.
//!
//! Bodies are accepted as raw JSON and checked field by field so that every
//! problem is reported at once, keyed by field name.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::shared::AppError;

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const NOT_AN_INTEGER: &str = "A valid integer is required.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";

/// Field-keyed validation messages, serialized as `{"field": ["msg", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Turns accumulated messages into an error, or `Ok` when there are none.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// Constraints applied to a text field.
#[derive(Debug, Clone, Copy)]
pub struct StringRules {
    pub required: bool,
    pub allow_blank: bool,
    pub max_length: Option<usize>,
    /// Strip surrounding whitespace before checking (off for passwords)
    pub trim: bool,
}

impl StringRules {
    pub const fn required(max_length: Option<usize>) -> Self {
        Self {
            required: true,
            allow_blank: false,
            max_length,
            trim: true,
        }
    }

    pub const fn optional(max_length: Option<usize>) -> Self {
        Self {
            required: false,
            allow_blank: true,
            max_length,
            trim: true,
        }
    }

    pub const fn allow_blank(mut self) -> Self {
        self.allow_blank = true;
        self
    }

    pub const fn untrimmed(mut self) -> Self {
        self.trim = false;
        self
    }
}

/// Unwraps a JSON body into an object, mapping malformed or non-object
/// payloads to a `non_field_errors` validation error.
pub fn json_object(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Map<String, Value>, AppError> {
    let mut errors = FieldErrors::new();

    match payload {
        Ok(Json(Value::Object(map))) => return Ok(map),
        Ok(Json(other)) => errors.add(
            "non_field_errors",
            format!(
                "Invalid data. Expected a dictionary, but got {}.",
                json_type_name(&other)
            ),
        ),
        Err(rejection) => errors.add("non_field_errors", rejection.body_text()),
    }

    Err(AppError::Validation(errors))
}

/// Reads a text field. Numbers are coerced to their string form; other
/// non-string values are rejected. Returns `None` when the field is absent
/// or invalid, with the reason recorded in `errors`.
pub fn string_field(
    body: &Map<String, Value>,
    field: &str,
    rules: StringRules,
    errors: &mut FieldErrors,
) -> Option<String> {
    let value = match body.get(field) {
        None => {
            if rules.required {
                errors.add(field, REQUIRED);
            }
            return None;
        }
        Some(Value::Null) => {
            errors.add(field, NOT_NULL);
            return None;
        }
        Some(Value::String(s)) if rules.trim => s.trim().to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => {
            errors.add(field, NOT_A_STRING);
            return None;
        }
    };

    if value.is_empty() && !rules.allow_blank {
        errors.add(field, NOT_BLANK);
        return None;
    }

    if let Some(max) = rules.max_length {
        if value.chars().count() > max {
            errors.add(
                field,
                format!("Ensure this field has no more than {} characters.", max),
            );
            return None;
        }
    }

    Some(value)
}

/// Reads a required 32-bit integer field. Integral floats and numeric
/// strings are accepted.
pub fn integer_field(
    body: &Map<String, Value>,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<i32> {
    let parsed: Option<i64> = match body.get(field) {
        None => {
            errors.add(field, REQUIRED);
            return None;
        }
        Some(Value::Null) => {
            errors.add(field, NOT_NULL);
            return None;
        }
        Some(Value::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(_) => None,
    };

    let Some(value) = parsed else {
        errors.add(field, NOT_AN_INTEGER);
        return None;
    };

    if value > i64::from(i32::MAX) {
        errors.add(
            field,
            format!("Ensure this value is less than or equal to {}.", i32::MAX),
        );
        return None;
    }
    if value < i64::from(i32::MIN) {
        errors.add(
            field,
            format!("Ensure this value is greater than or equal to {}.", i32::MIN),
        );
        return None;
    }

    Some(value as i32)
}

/// Loose structural email check: one `@`, non-empty local part, dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
