//! Record transformer: domain record to table row
//!
//! Every schema column ends up in the row, defaulted when its source is
//! absent. Extraction and encoding both happen here so that a record that
//! cannot be encoded is rejected before it reaches any sink.

use crate::error::RecordError;
use crate::extractor::{LeafShape, LocaleExtractor};
use crate::schema::{ColumnKind, ColumnSpec, TableSchema};
use crate::sql::encode::encode_as;
use crate::types::{GenerationContext, Row, TargetLocale};
use serde_json::Value;

/// Maps records onto the columns of one table schema
pub struct RecordTransformer<'a> {
    schema: &'a TableSchema,
    extractor: LocaleExtractor,
}

impl<'a> RecordTransformer<'a> {
    pub fn new(schema: &'a TableSchema, context: &GenerationContext) -> Self {
        RecordTransformer {
            schema,
            extractor: LocaleExtractor::new(context.target),
        }
    }

    /// Conflict key value of a record, if it has a usable one
    pub fn key_of(&self, record: &Value) -> Option<String> {
        let spec = self.schema.key_column()?;
        match spec.resolve(record) {
            Some((_, Value::String(s))) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    /// Transform one record into a row with every schema column present
    pub fn to_row(&self, record: &Value) -> Result<Row, RecordError> {
        if !record.is_object() {
            return Err(RecordError::NotAnObject);
        }

        let key = self
            .key_of(record)
            .ok_or_else(|| RecordError::MissingKey(self.schema.conflict_key.clone()))?;

        let mut row = Row::new(self.schema.table.clone(), key);
        for spec in &self.schema.columns {
            let (value, literal) = self.cell(spec, record)?;
            row.push(spec.name.clone(), value, literal);
        }

        Ok(row)
    }

    fn cell(&self, spec: &ColumnSpec, record: &Value) -> Result<(Value, String), RecordError> {
        let (path, raw) = match spec.resolve(record) {
            Some((path, value)) => (path, spec.derive.apply(value)),
            None => (spec.name.clone(), spec.effective_default()),
        };

        let value = self.extract(spec.kind, &raw).map_err(|e| e.within(&path))?;
        let kind = self.storage_kind(spec.kind, &value);
        let literal = encode_as(&value, kind).map_err(|e| e.within(&path))?;

        Ok((value, literal))
    }

    fn extract(&self, kind: ColumnKind, raw: &Value) -> Result<Value, crate::error::ExtractError> {
        match kind {
            ColumnKind::MultilingualText => self.extractor.extract_leaf(raw, LeafShape::Bare),
            ColumnKind::MultilingualJsonb => self.extractor.extract_leaf(raw, LeafShape::Wrapped),
            ColumnKind::NestedJsonb | ColumnKind::ObjectArray => {
                self.extractor.extract(raw, LeafShape::Wrapped)
            }
            ColumnKind::Scalar | ColumnKind::ScalarArray => Ok(raw.clone()),
        }
    }

    /// Text columns keep the whole locale map when every locale is kept
    fn storage_kind(&self, kind: ColumnKind, value: &Value) -> ColumnKind {
        match (kind, self.extractor.target()) {
            (ColumnKind::MultilingualText, TargetLocale::All) if value.is_object() => {
                ColumnKind::MultilingualJsonb
            }
            _ => kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EncodeFailure, ExtractError};
    use crate::schema::{ColumnDefault, Derive};
    use crate::types::Locale;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn context(target: TargetLocale) -> GenerationContext {
        GenerationContext::new(target, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    }

    fn english() -> GenerationContext {
        context(TargetLocale::Single(Locale::En))
    }

    fn schema() -> TableSchema {
        TableSchema::new("things", "slug")
            .column(ColumnSpec::scalar("slug"))
            .column(ColumnSpec::text("name"))
            .column(ColumnSpec::array("tags"))
            .validate()
            .unwrap()
    }

    #[test]
    fn test_example_record() {
        let record = json!({"slug": "foo", "name": {"en": "Foo", "it": "Fu"}, "tags": ["a", "b"]});
        let schema = schema();
        let ctx = english();
        let row = RecordTransformer::new(&schema, &ctx).to_row(&record).unwrap();

        assert_eq!(row.key, "foo");
        assert_eq!(
            Value::Object(row.to_json()),
            json!({"slug": "foo", "name": "Foo", "tags": ["a", "b"]})
        );
        assert_eq!(row.literal("name"), Some("'Foo'"));
        assert_eq!(row.literal("tags"), Some(r#"'{"a","b"}'"#));
    }

    #[test]
    fn test_every_column_is_present() {
        let schema = schema();
        let ctx = english();
        let row = RecordTransformer::new(&schema, &ctx)
            .to_row(&json!({"slug": "bare"}))
            .unwrap();

        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["slug", "name", "tags"]);
        assert_eq!(row.literal("name"), Some("NULL"));
        assert_eq!(row.literal("tags"), Some("'{}'"));
    }

    #[test]
    fn test_derived_and_flattened_columns() {
        let schema = TableSchema::new("cocktails", "slug")
            .column(ColumnSpec::scalar("slug"))
            .column(ColumnSpec::array("allergens").source("computed.allergens"))
            .column(ColumnSpec::array("variants").derive(Derive::Pluck("name".to_string())))
            .column(ColumnSpec::scalar("is_mocktail").default_value(json!(false)))
            .column(ColumnSpec::jsonb("serving").default_to(ColumnDefault::EmptyObject))
            .validate()
            .unwrap();
        let ctx = english();
        let transformer = RecordTransformer::new(&schema, &ctx);

        let row = transformer
            .to_row(&json!({
                "slug": "hanky-panky",
                "computed": {"allergens": ["sulphites"]},
                "variants": ["modern", {"name": "Royale", "description": "Top with champagne"}]
            }))
            .unwrap();

        assert_eq!(row.literal("allergens"), Some(r#"'{"sulphites"}'"#));
        assert_eq!(row.literal("variants"), Some(r#"'{"modern","Royale"}'"#));
        assert_eq!(row.literal("is_mocktail"), Some("false"));
        assert_eq!(row.literal("serving"), Some("'{}'::jsonb"));

        let row = transformer.to_row(&json!({"slug": "plain"})).unwrap();
        assert_eq!(row.literal("allergens"), Some("'{}'"));
    }

    #[test]
    fn test_nested_jsonb_keeps_locale_wrapper() {
        let schema = TableSchema::new("desserts", "slug")
            .column(ColumnSpec::scalar("slug"))
            .column(ColumnSpec::jsonb("history"))
            .column(ColumnSpec::new("garnish", ColumnKind::MultilingualJsonb))
            .validate()
            .unwrap();
        let ctx = english();

        let row = RecordTransformer::new(&schema, &ctx)
            .to_row(&json!({
                "slug": "tiramisu",
                "history": {"story": {"en": "Treviso", "it": "Treviso"}, "year_created": 1969},
                "garnish": {"en": "Cocoa", "vi": "Cacao"}
            }))
            .unwrap();

        assert_eq!(
            row.value("history").unwrap(),
            &json!({"story": {"en": "Treviso"}, "year_created": 1969})
        );
        assert_eq!(row.literal("garnish"), Some(r#"'{"en":"Cocoa"}'::jsonb"#));
    }

    #[test]
    fn test_all_locales_keeps_text_maps_as_jsonb() {
        let schema = schema();
        let ctx = context(TargetLocale::All);
        let row = RecordTransformer::new(&schema, &ctx)
            .to_row(&json!({"slug": "foo", "name": {"en": "Foo", "it": "Fu"}}))
            .unwrap();

        assert_eq!(row.literal("name"), Some(r#"'{"en":"Foo","it":"Fu"}'::jsonb"#));
    }

    #[test]
    fn test_missing_locale_rejects_record() {
        let schema = TableSchema::new("desserts", "slug")
            .column(ColumnSpec::scalar("slug"))
            .column(ColumnSpec::jsonb("history"))
            .validate()
            .unwrap();
        let ctx = context(TargetLocale::Single(Locale::Ko));

        let err = RecordTransformer::new(&schema, &ctx)
            .to_row(&json!({"slug": "x", "history": {"story": {"en": "Story"}}}))
            .unwrap_err();

        match err {
            RecordError::Extract(ExtractError::MissingLocale { path, .. }) => {
                assert_eq!(path, "history.story")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unencodable_value_reports_source_path() {
        let schema = TableSchema::new("cocktails", "slug")
            .column(ColumnSpec::scalar("slug"))
            .column(ColumnSpec::scalar("glass").source("serving.glass"))
            .validate()
            .unwrap();
        let ctx = english();

        let err = RecordTransformer::new(&schema, &ctx)
            .to_row(&json!({"slug": "x", "serving": {"glass": ["coupe", "nick and nora"]}}))
            .unwrap_err();

        match err {
            RecordError::Encode(e) => {
                assert_eq!(e.path, "serving.glass");
                assert_eq!(e.reason, EncodeFailure::NotScalar("an array"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_conflict_key() {
        let schema = schema();
        let ctx = english();
        let transformer = RecordTransformer::new(&schema, &ctx);

        assert_eq!(
            transformer.to_row(&json!({"name": {"en": "Foo"}})).unwrap_err(),
            RecordError::MissingKey("slug".to_string())
        );
        assert_eq!(
            transformer.to_row(&json!({"slug": 7})).unwrap_err(),
            RecordError::MissingKey("slug".to_string())
        );
        assert_eq!(
            transformer.to_row(&json!("not a record")).unwrap_err(),
            RecordError::NotAnObject
        );
    }
}
