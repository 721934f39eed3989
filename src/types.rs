use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// A supported content locale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    It,
    Vi,
    Ko,
    Ja,
    Es,
    Fr,
    De,
    Pt,
    Zh,
}

impl Locale {
    /// The closed locale set, in catalog order
    pub const ALL: [Locale; 10] = [
        Locale::En,
        Locale::It,
        Locale::Vi,
        Locale::Ko,
        Locale::Ja,
        Locale::Es,
        Locale::Fr,
        Locale::De,
        Locale::Pt,
        Locale::Zh,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::It => "it",
            Locale::Vi => "vi",
            Locale::Ko => "ko",
            Locale::Ja => "ja",
            Locale::Es => "es",
            Locale::Fr => "fr",
            Locale::De => "de",
            Locale::Pt => "pt",
            Locale::Zh => "zh",
        }
    }

    /// Whether an object key names a locale
    pub fn is_locale_key(key: &str) -> bool {
        Locale::ALL.iter().any(|l| l.code() == key)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Locale::ALL
            .into_iter()
            .find(|l| l.code() == code)
            .ok_or_else(|| ConfigError::UnknownLocale(s.to_string()))
    }
}

/// Which locale the generated content is collapsed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetLocale {
    Single(Locale),
    /// Keep every locale (extraction is the identity)
    All,
}

impl TargetLocale {
    pub fn locale(self) -> Option<Locale> {
        match self {
            TargetLocale::Single(l) => Some(l),
            TargetLocale::All => None,
        }
    }
}

impl Default for TargetLocale {
    fn default() -> Self {
        TargetLocale::Single(Locale::En)
    }
}

impl fmt::Display for TargetLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetLocale::Single(l) => write!(f, "{}", l),
            TargetLocale::All => f.write_str("all"),
        }
    }
}

impl FromStr for TargetLocale {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(TargetLocale::All)
        } else {
            s.parse().map(TargetLocale::Single)
        }
    }
}

/// Everything a generation run needs besides the schema and the records
#[derive(Debug, Clone)]
pub struct GenerationContext {
    /// Locale the multilingual content is collapsed to
    pub target: TargetLocale,

    /// Timestamp written into file headers. Passed in, never read from the
    /// clock inside the pipeline, so output is reproducible.
    pub generated_at: DateTime<Utc>,
}

impl GenerationContext {
    pub fn new(target: TargetLocale, generated_at: DateTime<Utc>) -> Self {
        GenerationContext { target, generated_at }
    }

    pub fn generated_at_rfc3339(&self) -> String {
        self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// One column of a transformed row
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub column: String,

    /// Extracted value, as sent to the direct sink
    pub value: Value,

    /// SQL literal text, as written by the file sink
    pub literal: String,
}

/// A transformed record - one row of the target table.
///
/// Cells follow the schema's column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub table: String,
    pub key: String,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(table: impl Into<String>, key: impl Into<String>) -> Self {
        Row {
            table: table.into(),
            key: key.into(),
            cells: Vec::new(),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: Value, literal: String) {
        self.cells.push(Cell {
            column: column.into(),
            value,
            literal,
        });
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|c| c.column.as_str())
    }

    pub fn value(&self, column: &str) -> Option<&Value> {
        self.cells.iter().find(|c| c.column == column).map(|c| &c.value)
    }

    pub fn literal(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.literal.as_str())
    }

    /// Human label for comments and logs: the `name` column when it is
    /// text, otherwise the conflict key value.
    pub fn label(&self) -> &str {
        match self.value("name") {
            Some(Value::String(s)) if !s.is_empty() => s,
            _ => &self.key,
        }
    }

    /// The row as a JSON object, for the direct upsert path
    pub fn to_json(&self) -> Map<String, Value> {
        self.cells
            .iter()
            .map(|c| (c.column.clone(), c.value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_locale_parsing() {
        assert_eq!("en".parse::<Locale>().unwrap(), Locale::En);
        assert_eq!(" JA ".parse::<Locale>().unwrap(), Locale::Ja);
        assert!("xx".parse::<Locale>().is_err());

        assert_eq!("all".parse::<TargetLocale>().unwrap(), TargetLocale::All);
        assert_eq!(
            "vi".parse::<TargetLocale>().unwrap(),
            TargetLocale::Single(Locale::Vi)
        );
    }

    #[test]
    fn test_row_label_and_json() {
        let mut row = Row::new("cocktails", "negroni");
        row.push("slug", json!("negroni"), "'negroni'".to_string());
        assert_eq!(row.label(), "negroni");

        row.push("name", json!("Negroni"), "'Negroni'".to_string());
        assert_eq!(row.label(), "Negroni");

        let obj = row.to_json();
        assert_eq!(obj.get("name").unwrap(), "Negroni");
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["slug", "name"]);
    }
}
