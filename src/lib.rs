//! # Larder - Multilingual Catalog Seeding
//!
//! Turns multilingual catalog records (cocktails, desserts, ...) into
//! idempotent Postgres upserts, either as SQL scripts or as direct batched
//! upserts against a PostgREST endpoint.
//!
//! ## Modules
//!
//! - **extractor**: reduce `{locale: text}` maps to one target locale
//! - **schema**: table schemas, column kinds, built-in presets
//! - **transform**: records to rows, every schema column present
//! - **sql**: literal encoding and `INSERT ... ON CONFLICT` statements
//! - **sink**: script files or direct network upserts
//! - **pipeline**: one run, with per-record skips
//!
//! ## Quick Start
//!
//! ```rust
//! use larder::schema::{ColumnSpec, TableSchema};
//! use larder::types::{GenerationContext, Locale, TargetLocale};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let schema = TableSchema::new("things", "slug")
//!     .column(ColumnSpec::scalar("slug"))
//!     .column(ColumnSpec::text("name"))
//!     .column(ColumnSpec::array("tags"))
//!     .validate()?;
//!
//! let records = vec![json!({
//!     "slug": "foo",
//!     "name": {"en": "Foo", "it": "Fu"},
//!     "tags": ["a", "b"]
//! })];
//!
//! let ctx = GenerationContext::new(TargetLocale::Single(Locale::En), chrono::Utc::now());
//! let sql = larder::generate_sql(&records, &schema, &ctx)?;
//! assert!(sql.contains("VALUES ('foo', 'Foo', '{\"a\",\"b\"}')"));
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde_json::Value;

pub mod config;
pub mod error;
pub mod extractor;
pub mod pipeline;
pub mod schema;
pub mod sink;
pub mod source;
pub mod sql;
pub mod transform;
pub mod types;

// Re-export commonly used types for convenience
pub use config::ConnectionConfig;
pub use error::{EncodeError, ExtractError, RecordError, SchemaError, SinkError};
pub use extractor::LocaleExtractor;
pub use pipeline::{Pipeline, RunSummary};
pub use schema::{ColumnKind, ColumnSpec, TableSchema};
pub use sink::{DirectSink, FileSink, RestClient, RowSink, SqlWriter};
pub use transform::RecordTransformer;
pub use types::{GenerationContext, Locale, Row, TargetLocale};

/// Render a complete seed script for `records` in memory.
///
/// Records that cannot be transformed are left out and counted in the
/// script header.
pub fn generate_sql(
    records: &[Value],
    schema: &TableSchema,
    context: &GenerationContext,
) -> Result<String> {
    let (rows, skipped) = Pipeline::new(schema, context).transform_all(records);

    let mut writer = SqlWriter::new(Vec::new());
    writer
        .write_script(&sink::SinkInput {
            schema,
            context,
            rows: &rows,
            skipped: skipped.len(),
        })
        .context("Failed to render seed script")?;

    String::from_utf8(writer.into_inner()).context("Seed script is not valid UTF-8")
}
