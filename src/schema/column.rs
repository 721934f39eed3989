use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// How a column's value is shaped and encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnKind {
    /// String, number or boolean
    Scalar,
    /// `{locale: text}` collapsed to bare text
    MultilingualText,
    /// `{locale: text}` kept as a single-locale JSONB object
    MultilingualJsonb,
    /// Nested object stored as JSONB, multilingual leaves collapsed inside
    NestedJsonb,
    /// Postgres text/number array
    ScalarArray,
    /// Array of objects stored as JSONB
    ObjectArray,
}

impl ColumnKind {
    pub fn is_array(self) -> bool {
        matches!(self, ColumnKind::ScalarArray | ColumnKind::ObjectArray)
    }
}

/// Value used when every source path is absent or null
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnDefault {
    Null,
    EmptyArray,
    EmptyObject,
    Value(Value),
}

impl ColumnDefault {
    pub fn to_value(&self) -> Value {
        match self {
            ColumnDefault::Null => Value::Null,
            ColumnDefault::EmptyArray => json!([]),
            ColumnDefault::EmptyObject => json!({}),
            ColumnDefault::Value(v) => v.clone(),
        }
    }
}

/// Rule applied to a present source value before extraction
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Derive {
    #[default]
    None,

    /// Map `(string | {key: ...})[]` to the `key` of each object element
    Pluck(String),

    /// Map a string through a fixed table; keys and values are compared
    /// case-insensitively.
    /// Unmatched values become `fallback`, or pass through without one.
    Lookup {
        table: BTreeMap<String, String>,
        #[serde(default)]
        fallback: Option<String>,
    },
}

impl Derive {
    pub fn apply(&self, value: &Value) -> Value {
        match (self, value) {
            (Derive::Pluck(key), Value::Array(items)) => Value::Array(
                items
                    .iter()
                    .map(|item| match item {
                        Value::Object(obj) => obj.get(key).cloned().unwrap_or_else(|| item.clone()),
                        other => other.clone(),
                    })
                    .collect(),
            ),
            (Derive::Lookup { table, fallback }, Value::String(s)) => {
                let needle = s.to_lowercase();
                let found = table
                    .iter()
                    .find(|(key, _)| key.to_lowercase() == needle)
                    .map(|(_, mapped)| mapped);
                match found {
                    Some(mapped) => Value::String(mapped.clone()),
                    None => match fallback {
                        Some(f) => Value::String(f.clone()),
                        None => value.clone(),
                    },
                }
            }
            _ => value.clone(),
        }
    }
}

/// One output column: where its value comes from and how it is shaped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,

    pub kind: ColumnKind,

    /// Dotted source paths, tried in order. Empty means the column name.
    #[serde(default)]
    pub source: Vec<String>,

    #[serde(default)]
    pub default: Option<ColumnDefault>,

    #[serde(default)]
    pub derive: Derive,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        ColumnSpec {
            name: name.into(),
            kind,
            source: Vec::new(),
            default: None,
            derive: Derive::None,
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Scalar)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::MultilingualText)
    }

    pub fn jsonb(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::NestedJsonb)
    }

    pub fn array(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::ScalarArray)
    }

    /// Add a source path (the first one replaces the implicit column name)
    pub fn source(mut self, path: impl Into<String>) -> Self {
        self.source.push(path.into());
        self
    }

    pub fn default_to(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }

    pub fn default_value(self, value: Value) -> Self {
        self.default_to(ColumnDefault::Value(value))
    }

    pub fn derive(mut self, derive: Derive) -> Self {
        self.derive = derive;
        self
    }

    /// The default when none is declared: empty array for array kinds
    pub fn effective_default(&self) -> Value {
        match &self.default {
            Some(d) => d.to_value(),
            None if self.kind.is_array() => json!([]),
            None => Value::Null,
        }
    }

    /// Source paths in lookup order
    pub fn source_paths(&self) -> Vec<&str> {
        if self.source.is_empty() {
            vec![self.name.as_str()]
        } else {
            self.source.iter().map(String::as_str).collect()
        }
    }

    /// First present, non-null source value and the path it came from
    pub fn resolve<'v>(&self, record: &'v Value) -> Option<(String, &'v Value)> {
        self.source_paths().into_iter().find_map(|path| {
            lookup_path(record, path)
                .filter(|v| !v.is_null())
                .map(|v| (path.to_string(), v))
        })
    }
}

/// Follow a dotted path through nested objects
pub fn lookup_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}
