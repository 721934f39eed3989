use crate::error::SchemaError;
use crate::schema::column::ColumnSpec;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Column stamped on every upsert when `touch_updated_at` is set
pub const UPDATED_AT: &str = "updated_at";

static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_]*$").unwrap()
});

/// Column table for one target table: the single source of truth for both
/// the INSERT column list and the UPDATE SET list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table: String,

    /// Column matched on upsert
    pub conflict_key: String,

    pub columns: Vec<ColumnSpec>,

    /// Append `updated_at = NOW()` to the update clause
    #[serde(default)]
    pub touch_updated_at: bool,

    /// Columns the verification query groups counts by
    #[serde(default)]
    pub verify_group_by: Vec<String>,
}

impl TableSchema {
    pub fn new(table: impl Into<String>, conflict_key: impl Into<String>) -> Self {
        TableSchema {
            table: table.into(),
            conflict_key: conflict_key.into(),
            columns: Vec::new(),
            touch_updated_at: false,
            verify_group_by: Vec::new(),
        }
    }

    pub fn column(mut self, spec: ColumnSpec) -> Self {
        self.columns.push(spec);
        self
    }

    pub fn touch_updated_at(mut self) -> Self {
        self.touch_updated_at = true;
        self
    }

    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.verify_group_by = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Check identifiers and column references; returns the schema unchanged
    pub fn validate(self) -> Result<Self, SchemaError> {
        check_identifier(&self.table)?;

        let mut seen = HashSet::new();
        for col in &self.columns {
            check_identifier(&col.name)?;
            if !seen.insert(col.name.as_str()) {
                return Err(SchemaError::DuplicateColumn(col.name.clone()));
            }
        }

        if !seen.contains(self.conflict_key.as_str()) {
            return Err(SchemaError::UnknownConflictKey {
                table: self.table.clone(),
                key: self.conflict_key.clone(),
            });
        }

        if self.touch_updated_at && seen.contains(UPDATED_AT) {
            return Err(SchemaError::TouchedColumnDeclared(UPDATED_AT.to_string()));
        }

        if let Some(missing) = self
            .verify_group_by
            .iter()
            .find(|c| !seen.contains(c.as_str()))
        {
            return Err(SchemaError::UnknownGroupColumn(missing.clone()));
        }

        Ok(self)
    }

    /// Parse and validate a schema from JSON text
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let schema: TableSchema = serde_json::from_str(text)?;
        schema.validate()
    }

    /// Load a schema file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        use anyhow::Context;

        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file: {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("Invalid schema file: {}", path.display()))
    }

    /// The conflict key's column spec
    pub fn key_column(&self) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == self.conflict_key)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER_REGEX.is_match(name)
}

fn check_identifier(name: &str) -> Result<(), SchemaError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}
