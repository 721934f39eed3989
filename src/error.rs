//! Error types for the seeding pipeline
//!
//! Record-level errors (`EncodeError`, `ExtractError`, `RecordError`) make the
//! pipeline skip one record. Everything else is fatal for the run.

use thiserror::Error;

use crate::types::Locale;

/// Why a value could not be turned into a SQL literal
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeFailure {
    #[error("expected a scalar, found {0}")]
    NotScalar(&'static str),

    #[error("scalar array element is {0}")]
    BadArrayElement(&'static str),

    #[error("array mixes objects and scalars")]
    MixedArray,

    #[error("expected an array, found {0}")]
    NotArray(&'static str),

    #[error("expected an object, found {0}")]
    NotObject(&'static str),

    #[error("JSON serialization failed: {0}")]
    Json(String),
}

/// A value of an unencodable shape, with the field path it was found at
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot encode `{path}`: {reason}")]
pub struct EncodeError {
    pub path: String,
    pub reason: EncodeFailure,
}

impl EncodeError {
    pub fn new(reason: EncodeFailure) -> Self {
        EncodeError {
            path: String::new(),
            reason,
        }
    }

    /// Prefix the path with an enclosing field or index segment
    pub fn within(mut self, segment: &str) -> Self {
        self.path = join_path(segment, &self.path);
        self
    }
}

/// Failures of the multilingual extractor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("`{path}` has no `{locale}` text (available: {available})")]
    MissingLocale {
        path: String,
        locale: Locale,
        available: String,
    },

    #[error("`{path}` is not multilingual text")]
    NotMultilingual { path: String },
}

impl ExtractError {
    pub fn path(&self) -> &str {
        match self {
            ExtractError::MissingLocale { path, .. } => path,
            ExtractError::NotMultilingual { path } => path,
        }
    }

    pub fn within(self, segment: &str) -> Self {
        match self {
            ExtractError::MissingLocale {
                path,
                locale,
                available,
            } => ExtractError::MissingLocale {
                path: join_path(segment, &path),
                locale,
                available,
            },
            ExtractError::NotMultilingual { path } => ExtractError::NotMultilingual {
                path: join_path(segment, &path),
            },
        }
    }
}

/// Why a single record was skipped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("conflict key `{0}` is missing or not a string")]
    MissingKey(String),

    #[error("conflict key value `{0}` already appeared earlier in the run")]
    DuplicateKey(String),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl RecordError {
    /// Field path the error points at, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            RecordError::Encode(e) => Some(&e.path),
            RecordError::Extract(e) => Some(e.path()),
            RecordError::MissingKey(k) => Some(k),
            RecordError::NotAnObject | RecordError::DuplicateKey(_) => None,
        }
    }
}

/// An invalid table schema
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid SQL identifier `{0}`")]
    InvalidIdentifier(String),

    #[error("duplicate column `{0}`")]
    DuplicateColumn(String),

    #[error("conflict key `{key}` is not a column of `{table}`")]
    UnknownConflictKey { table: String, key: String },

    #[error("group-by column `{0}` is not a column of the table")]
    UnknownGroupColumn(String),

    #[error("column `{0}` is also set by touch_updated_at")]
    TouchedColumnDeclared(String),

    #[error("unknown schema preset `{0}`")]
    UnknownPreset(String),

    #[error("failed to parse schema: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Startup configuration problems
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable `{0}` is not set")]
    Missing(&'static str),

    #[error("unknown locale `{0}`")]
    UnknownLocale(String),

    #[error("batch size must be at least 1")]
    ZeroBatchSize,
}

/// A failed network upsert of one batch
#[derive(Debug, Error)]
pub enum UpsertError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Other(String),
}

/// Fatal sink errors (I/O on the output artifact)
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("row for `{key}` has no `{column}` column")]
    MissingConflictColumn { key: String, column: String },

    #[error(transparent)]
    Write(#[from] std::io::Error),
}

pub(crate) fn join_path(prefix: &str, rest: &str) -> String {
    if rest.is_empty() {
        prefix.to_string()
    } else if prefix.is_empty() || rest.starts_with('[') {
        format!("{}{}", prefix, rest)
    } else {
        format!("{}.{}", prefix, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_joining() {
        assert_eq!(join_path("history", "story"), "history.story");
        assert_eq!(join_path("ingredients", "[2].name"), "ingredients[2].name");
        assert_eq!(join_path("name", ""), "name");
        assert_eq!(join_path("[0]", "en"), "[0].en");
    }

    #[test]
    fn test_error_within() {
        let err = EncodeError::new(EncodeFailure::MixedArray)
            .within("[1]")
            .within("variants");
        assert_eq!(err.path, "variants[1]");

        let err = ExtractError::NotMultilingual {
            path: "story".to_string(),
        }
        .within("history");
        assert_eq!(err.path(), "history.story");
    }
}
