//! Value encoder: JSON values to Postgres literal text
//!
//! Strings are single-quoted with `'` doubled. With standard conforming
//! strings that is the only metacharacter, so backslashes and any Unicode
//! are written as-is.

use crate::error::{EncodeError, EncodeFailure};
use crate::schema::ColumnKind;
use serde_json::Value;

pub const NULL: &str = "NULL";
pub const EMPTY_ARRAY: &str = "'{}'";
pub const EMPTY_JSONB_ARRAY: &str = "'[]'::jsonb";

/// Encode a value by its runtime shape
pub fn encode(value: &Value) -> Result<String, EncodeError> {
    match value {
        Value::Array(arr) => encode_array(arr),
        Value::Object(_) => encode_jsonb(value),
        scalar => encode_scalar(scalar),
    }
}

/// Encode a value for a column of a declared kind.
///
/// `NULL` is accepted for every kind; defaults are the transformer's job.
pub fn encode_as(value: &Value, kind: ColumnKind) -> Result<String, EncodeError> {
    if value.is_null() {
        return Ok(NULL.to_string());
    }

    match kind {
        ColumnKind::Scalar | ColumnKind::MultilingualText => encode_scalar(value),
        ColumnKind::MultilingualJsonb | ColumnKind::NestedJsonb => encode_jsonb(value),
        ColumnKind::ScalarArray => match value {
            Value::Array(arr) => encode_scalar_array(arr),
            other => Err(EncodeError::new(EncodeFailure::NotArray(describe(other)))),
        },
        ColumnKind::ObjectArray => match value {
            Value::Array(arr) if arr.is_empty() => Ok(EMPTY_JSONB_ARRAY.to_string()),
            Value::Array(arr) => {
                if let Some(idx) = arr.iter().position(|v| !v.is_object()) {
                    return Err(EncodeError::new(EncodeFailure::NotObject(describe(&arr[idx])))
                        .within(&format!("[{}]", idx)));
                }
                encode_jsonb(value)
            }
            other => Err(EncodeError::new(EncodeFailure::NotArray(describe(other)))),
        },
    }
}

/// Single-quote a string, doubling embedded quotes
pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn encode_scalar(value: &Value) -> Result<String, EncodeError> {
    match value {
        Value::Null => Ok(NULL.to_string()),
        Value::Bool(b) => Ok(if *b { "true" } else { "false" }.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(quote(s)),
        other => Err(EncodeError::new(EncodeFailure::NotScalar(describe(other)))),
    }
}

fn encode_array(arr: &[Value]) -> Result<String, EncodeError> {
    if arr.is_empty() {
        return Ok(EMPTY_ARRAY.to_string());
    }

    let objects = arr.iter().filter(|v| v.is_object()).count();
    if objects == arr.len() {
        encode_jsonb(&Value::Array(arr.to_vec()))
    } else if objects > 0 {
        Err(EncodeError::new(EncodeFailure::MixedArray))
    } else {
        encode_scalar_array(arr)
    }
}

/// Postgres array literal: `'{"a","b"}'`
fn encode_scalar_array(arr: &[Value]) -> Result<String, EncodeError> {
    if arr.is_empty() {
        return Ok(EMPTY_ARRAY.to_string());
    }

    let mut items = Vec::with_capacity(arr.len());
    for (idx, item) in arr.iter().enumerate() {
        let element = match item {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => array_element(s),
            other => {
                return Err(EncodeError::new(EncodeFailure::BadArrayElement(describe(other)))
                    .within(&format!("[{}]", idx)))
            }
        };
        items.push(element);
    }

    Ok(quote(&format!("{{{}}}", items.join(","))))
}

/// Double-quoted array element with `\` and `"` backslash-escaped
fn array_element(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

fn encode_jsonb(value: &Value) -> Result<String, EncodeError> {
    let json = serde_json::to_string(value)
        .map_err(|e| EncodeError::new(EncodeFailure::Json(e.to_string())))?;
    Ok(format!("{}::jsonb", quote(&json)))
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
