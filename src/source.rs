//! Reading catalog records from JSON, a JSON array, or NDJSON

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Read a whole source (a file, or stdin when `path` is `None`) into records
pub fn read_source(path: Option<&Path>) -> Result<Vec<Value>> {
    let mut content = Vec::new();
    match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            BufReader::new(file)
                .read_to_end(&mut content)
                .with_context(|| format!("Failed to read {}", path.display()))?;
        }
        None => {
            std::io::stdin()
                .lock()
                .read_to_end(&mut content)
                .context("Failed to read stdin")?;
        }
    }
    read_records(&content)
}

/// Parse records from raw bytes.
///
/// A top-level array yields its elements, a single object yields itself,
/// and anything simd-json rejects is retried as newline-delimited JSON.
pub fn read_records(bytes: &[u8]) -> Result<Vec<Value>> {
    // simd-json parses in place
    let mut scratch = bytes.to_vec();
    let records = match simd_json::serde::from_slice::<Value>(&mut scratch) {
        Ok(Value::Array(items)) => items,
        Ok(value) => vec![value],
        Err(e) => {
            debug!(error = %e, "not a single JSON document, reading as NDJSON");
            read_ndjson(bytes)?
        }
    };

    for (idx, record) in records.iter().enumerate() {
        if !record.is_object() {
            bail!(
                "record {} is not a JSON object (found {})",
                idx + 1,
                kind_of(record)
            );
        }
    }

    Ok(records)
}

fn read_ndjson(bytes: &[u8]) -> Result<Vec<Value>> {
    let text = std::str::from_utf8(bytes).context("Input is not valid UTF-8")?;
    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse JSON on line {}", idx + 1))?;
        records.push(value);
    }
    Ok(records)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_array_source() {
        let records = read_records(br#"[{"slug": "a"}, {"slug": "b"}]"#).unwrap();
        assert_eq!(records, vec![json!({"slug": "a"}), json!({"slug": "b"})]);
    }

    #[test]
    fn test_single_object_source() {
        let records = read_records(br#"{"slug": "a", "name": {"en": "A"}}"#).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"]["en"], "A");
    }

    #[test]
    fn test_ndjson_source() {
        let input = b"{\"slug\": \"a\"}\n\n{\"slug\": \"b\", \"n\": 2}\n";
        let records = read_records(input).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["n"], 2);
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let input = b"{\"slug\": \"a\"}\n{oops\n";
        let err = read_records(input).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_non_object_record_is_fatal() {
        let err = read_records(br#"[{"slug": "a"}, 42]"#).unwrap_err();
        assert!(err.to_string().contains("record 2"));
    }

    #[test]
    fn test_read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"[{{"slug": "negroni"}}]"#).unwrap();

        let records = read_source(Some(file.path())).unwrap();
        assert_eq!(records, vec![json!({"slug": "negroni"})]);
    }

    #[test]
    fn test_missing_file() {
        assert!(read_source(Some(Path::new("/nonexistent/records.json"))).is_err());
    }
}
