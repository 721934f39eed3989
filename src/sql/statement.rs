//! Upsert statements and script framing
//!
//! The UPDATE SET list is always derived from the row's own columns, so
//! it cannot drift from the INSERT column list.

use crate::error::SinkError;
use crate::schema::{TableSchema, UPDATED_AT};
use crate::types::{GenerationContext, Row};

const RULE: &str =
    "-- ============================================================================";

/// Renders upsert statements for the rows of one table
pub struct StatementGenerator<'a> {
    schema: &'a TableSchema,
}

impl<'a> StatementGenerator<'a> {
    pub fn new(schema: &'a TableSchema) -> Self {
        StatementGenerator { schema }
    }

    pub fn upsert(&self, row: &Row) -> Result<String, SinkError> {
        upsert_statement(row, &self.schema.conflict_key, self.schema.touch_updated_at)
    }
}

/// `INSERT ... ON CONFLICT (key) DO UPDATE SET ...` for one row
pub fn upsert_statement(
    row: &Row,
    conflict_key: &str,
    touch_updated_at: bool,
) -> Result<String, SinkError> {
    if !row.columns().any(|c| c == conflict_key) {
        return Err(SinkError::MissingConflictColumn {
            key: row.key.clone(),
            column: conflict_key.to_string(),
        });
    }

    let columns: Vec<&str> = row.columns().collect();
    let values: Vec<&str> = row.cells.iter().map(|c| c.literal.as_str()).collect();

    let mut assignments: Vec<String> = columns
        .iter()
        .filter(|c| **c != conflict_key && !(touch_updated_at && **c == UPDATED_AT))
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();
    if touch_updated_at {
        assignments.push(format!("{UPDATED_AT} = NOW()"));
    }

    let action = if assignments.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", assignments.join(", "))
    };

    Ok(format!(
        "INSERT INTO {} ({})\nVALUES ({})\nON CONFLICT ({}) {};\n",
        row.table,
        columns.join(", "),
        values.join(", "),
        conflict_key,
        action
    ))
}

/// Comment block opening a full seed script
pub fn script_header(
    schema: &TableSchema,
    context: &GenerationContext,
    records: usize,
    skipped: usize,
) -> String {
    let mut out = String::new();
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("-- {} SEED\n", schema.table.to_uppercase()));
    out.push_str(RULE);
    out.push('\n');
    out.push_str("--\n");
    out.push_str(&format!("-- Table:   {}\n", schema.table));
    out.push_str(&format!("-- Locale:  {}\n", context.target));
    out.push_str(&format!("-- Records: {}\n", records));
    out.push_str(&format!("-- Skipped: {}\n", skipped));
    out.push_str("--\n");
    out.push_str(&format!(
        "-- Upserts with ON CONFLICT ({}) DO UPDATE; safe to re-run.\n",
        schema.conflict_key
    ));
    out.push_str("--\n");
    out.push_str(&format!("-- Generated: {}\n", context.generated_at_rfc3339()));
    out.push_str(RULE);
    out.push('\n');
    out
}

/// Comment block opening one chunk of a batched script
pub fn batch_header(
    schema: &TableSchema,
    context: &GenerationContext,
    batch: usize,
    first: usize,
    last: usize,
    total: usize,
) -> String {
    format!(
        "-- {} Batch {}\n-- Items: {} to {} of {}\n-- Locale: {}\n-- Generated: {}\n",
        schema.table.to_uppercase(),
        batch,
        first,
        last,
        total,
        context.target,
        context.generated_at_rfc3339()
    )
}

/// Verification queries closing a seed script
pub fn verification_footer(schema: &TableSchema) -> String {
    let mut out = String::new();
    out.push_str(RULE);
    out.push('\n');
    out.push_str("-- Verify insertion\n");
    out.push_str(RULE);
    out.push('\n');

    if !schema.verify_group_by.is_empty() {
        let groups = schema.verify_group_by.join(", ");
        out.push_str(&format!(
            "SELECT {groups}, COUNT(*) AS count\nFROM {table}\nGROUP BY {groups}\nORDER BY {groups};\n\n",
            groups = groups,
            table = schema.table
        ));
    }

    out.push_str(&format!(
        "SELECT COUNT(*) AS total_{table} FROM {table};\n",
        table = schema.table
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnSpec;
    use crate::transform::RecordTransformer;
    use crate::types::{Locale, TargetLocale};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::collections::BTreeSet;

    fn context() -> GenerationContext {
        GenerationContext::new(
            TargetLocale::Single(Locale::En),
            Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap(),
        )
    }

    fn schema() -> TableSchema {
        TableSchema::new("things", "slug")
            .column(ColumnSpec::scalar("slug"))
            .column(ColumnSpec::text("name"))
            .column(ColumnSpec::array("tags"))
            .validate()
            .unwrap()
    }

    /// Column sets of the INSERT list and of the UPDATE SET list
    fn column_sets(statement: &str) -> (BTreeSet<String>, BTreeSet<String>) {
        let insert = statement
            .split_once('(')
            .and_then(|(_, rest)| rest.split_once(')'))
            .map(|(cols, _)| cols.split(", ").map(str::to_string).collect())
            .unwrap_or_default();
        let update = statement
            .split_once("DO UPDATE SET ")
            .map(|(_, rest)| {
                rest.trim_end_matches(";\n")
                    .split(", ")
                    .filter_map(|a| a.split_once(" = EXCLUDED.").map(|(c, _)| c.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        (insert, update)
    }

    #[test]
    fn test_example_statement() {
        let schema = schema();
        let ctx = context();
        let record = json!({"slug": "foo", "name": {"en": "Foo", "it": "Fu"}, "tags": ["a", "b"]});
        let row = RecordTransformer::new(&schema, &ctx).to_row(&record).unwrap();

        let sql = StatementGenerator::new(&schema).upsert(&row).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO things (slug, name, tags)\n\
             VALUES ('foo', 'Foo', '{\"a\",\"b\"}')\n\
             ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name, tags = EXCLUDED.tags;\n"
        );
    }

    #[test]
    fn test_statement_is_idempotent() {
        let schema = schema();
        let ctx = context();
        let record = json!({"slug": "o'brien", "name": {"en": "O'Brien's"}, "tags": ["x"]});
        let transformer = RecordTransformer::new(&schema, &ctx);
        let generator = StatementGenerator::new(&schema);

        let first = generator.upsert(&transformer.to_row(&record).unwrap()).unwrap();
        let second = generator.upsert(&transformer.to_row(&record).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_column_parity() {
        let schema = crate::schema::catalog::cocktails().unwrap();
        let ctx = context();
        let row = RecordTransformer::new(&schema, &ctx)
            .to_row(&json!({"slug": "negroni", "name": {"en": "Negroni"}}))
            .unwrap();

        let sql = StatementGenerator::new(&schema).upsert(&row).unwrap();
        let (mut insert, update) = column_sets(&sql);
        insert.remove("slug");
        assert_eq!(insert, update);
        assert!(sql.ends_with(", updated_at = NOW();\n"));
    }

    #[test]
    fn test_key_only_row_does_nothing() {
        let mut row = Row::new("things", "foo");
        row.push("slug", json!("foo"), "'foo'".to_string());

        let sql = upsert_statement(&row, "slug", false).unwrap();
        assert!(sql.ends_with("ON CONFLICT (slug) DO NOTHING;\n"));

        let sql = upsert_statement(&row, "slug", true).unwrap();
        assert!(sql.ends_with("ON CONFLICT (slug) DO UPDATE SET updated_at = NOW();\n"));
    }

    #[test]
    fn test_touched_timestamp_is_assigned_once() {
        let mut row = Row::new("things", "foo");
        row.push("slug", json!("foo"), "'foo'".to_string());
        row.push("updated_at", json!("2024-01-01"), "'2024-01-01'".to_string());

        let sql = upsert_statement(&row, "slug", true).unwrap();
        assert_eq!(sql.matches("updated_at =").count(), 1);
        assert!(sql.ends_with("DO UPDATE SET updated_at = NOW();\n"));

        let sql = upsert_statement(&row, "slug", false).unwrap();
        assert!(sql.ends_with("DO UPDATE SET updated_at = EXCLUDED.updated_at;\n"));
    }

    #[test]
    fn test_missing_conflict_column() {
        let mut row = Row::new("things", "foo");
        row.push("name", json!("Foo"), "'Foo'".to_string());
        assert!(matches!(
            upsert_statement(&row, "slug", false),
            Err(SinkError::MissingConflictColumn { .. })
        ));
    }

    #[test]
    fn test_header_and_footer() {
        let schema = schema().group_by(&["tags"]);
        let header = script_header(&schema, &context(), 3, 1);
        assert!(header.contains("-- THINGS SEED"));
        assert!(header.contains("-- Records: 3"));
        assert!(header.contains("-- Skipped: 1"));
        assert!(header.contains("-- Generated: 2025-03-14T09:26:53Z"));

        let footer = verification_footer(&schema);
        assert!(footer.contains("GROUP BY tags"));
        assert!(footer.contains("SELECT COUNT(*) AS total_things FROM things;"));

        let batch = batch_header(&schema, &context(), 2, 11, 20, 25);
        assert!(batch.starts_with("-- THINGS Batch 2\n-- Items: 11 to 20 of 25\n"));
    }
}
