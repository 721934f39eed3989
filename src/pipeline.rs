//! One seeding run: records in, rows out to a sink

use crate::error::{RecordError, SinkError};
use crate::schema::TableSchema;
use crate::sink::{RowSink, SinkInput, SinkReport};
use crate::transform::RecordTransformer;
use crate::types::{GenerationContext, Row};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};

/// A record that never reached the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    /// Position in the source, 0-based
    pub index: usize,
    pub key: Option<String>,
    pub error: RecordError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub transformed: usize,
    pub skipped: Vec<Skipped>,
    pub report: SinkReport,
}

impl RunSummary {
    /// True when every record was transformed and delivered
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.report.is_clean()
    }
}

/// Transforms records for one table and hands the rows to a sink
pub struct Pipeline<'a> {
    schema: &'a TableSchema,
    context: &'a GenerationContext,
}

impl<'a> Pipeline<'a> {
    pub fn new(schema: &'a TableSchema, context: &'a GenerationContext) -> Self {
        Pipeline { schema, context }
    }

    /// Transform every record, keeping source order.
    ///
    /// A record that fails is skipped and logged; later records with an
    /// already-seen conflict key are skipped too.
    pub fn transform_all(&self, records: &[Value]) -> (Vec<Row>, Vec<Skipped>) {
        let transformer = RecordTransformer::new(self.schema, self.context);
        let mut rows = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();
        let mut seen = HashSet::new();

        for (index, record) in records.iter().enumerate() {
            let result = transformer.to_row(record).and_then(|row| {
                if seen.insert(row.key.clone()) {
                    Ok(row)
                } else {
                    Err(RecordError::DuplicateKey(row.key))
                }
            });

            match result {
                Ok(row) => rows.push(row),
                Err(error) => {
                    let key = transformer.key_of(record);
                    warn!(
                        index,
                        key = key.as_deref().unwrap_or("<none>"),
                        path = error.path().unwrap_or(""),
                        error = %error,
                        "skipping record"
                    );
                    skipped.push(Skipped { index, key, error });
                }
            }
        }

        (rows, skipped)
    }

    pub fn run(&self, records: &[Value], sink: &mut dyn RowSink) -> Result<RunSummary, SinkError> {
        info!(
            table = %self.schema.table,
            locale = %self.context.target,
            records = records.len(),
            sink = sink.name(),
            "starting run"
        );

        let (rows, skipped) = self.transform_all(records);
        let report = sink.consume(&SinkInput {
            schema: self.schema,
            context: self.context,
            rows: &rows,
            skipped: skipped.len(),
        })?;

        info!(
            written = report.written,
            failed = report.failures.len(),
            skipped = skipped.len(),
            "run finished"
        );

        Ok(RunSummary {
            total: records.len(),
            transformed: rows.len(),
            skipped,
            report,
        })
    }
}
