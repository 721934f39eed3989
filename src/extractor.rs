use crate::error::ExtractError;
use crate::types::{Locale, TargetLocale};
use serde_json::{Map, Value};

/// How a collapsed multilingual leaf is returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafShape {
    /// The bare text, for plain text columns
    Bare,
    /// A single-key `{locale: text}` object, for JSONB columns
    Wrapped,
}

/// Collapses `{locale: text}` leaves of a record to one target locale
#[derive(Debug, Clone, Copy)]
pub struct LocaleExtractor {
    target: TargetLocale,
}

impl LocaleExtractor {
    pub fn new(target: TargetLocale) -> Self {
        LocaleExtractor { target }
    }

    pub fn target(&self) -> TargetLocale {
        self.target
    }

    /// Recursively walk a value, collapsing every multilingual leaf found.
    ///
    /// Structural objects keep their key structure, arrays are mapped
    /// element-wise and scalars pass through unchanged.
    pub fn extract(&self, value: &Value, shape: LeafShape) -> Result<Value, ExtractError> {
        let Some(locale) = self.target.locale() else {
            return Ok(value.clone());
        };
        Self::walk(value, locale, shape)
    }

    /// Collapse a value that must be multilingual text.
    ///
    /// Bare strings are accepted as single-language content; anything that
    /// is neither a string nor a multilingual leaf is rejected rather than
    /// guessed at.
    pub fn extract_leaf(&self, value: &Value, shape: LeafShape) -> Result<Value, ExtractError> {
        let Some(locale) = self.target.locale() else {
            return Ok(value.clone());
        };

        match value {
            Value::Null => Ok(Value::Null),
            Value::String(s) => Ok(Self::shape_text(Value::String(s.clone()), locale, shape)),
            Value::Object(obj) if is_multilingual_leaf(obj) => Self::pick(obj, locale, shape),
            _ => Err(ExtractError::NotMultilingual {
                path: String::new(),
            }),
        }
    }

    fn walk(value: &Value, locale: Locale, shape: LeafShape) -> Result<Value, ExtractError> {
        match value {
            Value::Object(obj) if is_multilingual_leaf(obj) => Self::pick(obj, locale, shape),
            Value::Object(obj) => {
                let mut out = Map::with_capacity(obj.len());
                for (key, child) in obj {
                    let extracted =
                        Self::walk(child, locale, shape).map_err(|e| e.within(key))?;
                    out.insert(key.clone(), extracted);
                }
                Ok(Value::Object(out))
            }
            Value::Array(arr) => arr
                .iter()
                .enumerate()
                .map(|(idx, item)| {
                    Self::walk(item, locale, shape).map_err(|e| e.within(&format!("[{}]", idx)))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => Ok(value.clone()),
        }
    }

    fn pick(obj: &Map<String, Value>, locale: Locale, shape: LeafShape) -> Result<Value, ExtractError> {
        match obj.get(locale.code()) {
            Some(text) => Ok(Self::shape_text(text.clone(), locale, shape)),
            None => {
                let mut available: Vec<&str> = obj.keys().map(String::as_str).collect();
                available.sort_unstable();
                Err(ExtractError::MissingLocale {
                    path: String::new(),
                    locale,
                    available: available.join(", "),
                })
            }
        }
    }

    fn shape_text(text: Value, locale: Locale, shape: LeafShape) -> Value {
        match shape {
            LeafShape::Bare => text,
            LeafShape::Wrapped => {
                let mut wrapper = Map::new();
                wrapper.insert(locale.code().to_string(), text);
                Value::Object(wrapper)
            }
        }
    }
}

/// A non-empty object whose keys all name locales
pub fn is_multilingual_leaf(obj: &Map<String, Value>) -> bool {
    !obj.is_empty() && obj.keys().all(|k| Locale::is_locale_key(k))
}
