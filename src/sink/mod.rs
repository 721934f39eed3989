//! Row sinks
//!
//! Both sinks consume the same transformed rows, so a file script and a
//! direct seed of the same records carry identical values.

pub mod direct;
pub mod writer;

pub use direct::{DirectSink, RestClient, UpsertClient};
pub use writer::{FileSink, FileTarget, SqlWriter};

use crate::error::SinkError;
use crate::schema::TableSchema;
use crate::types::{GenerationContext, Row};

/// Failures listed in a summary before the rest are counted
pub const FAILURE_DISPLAY_LIMIT: usize = 10;

/// Everything a sink needs for one run
pub struct SinkInput<'a> {
    pub schema: &'a TableSchema,
    pub context: &'a GenerationContext,
    pub rows: &'a [Row],
    /// Records dropped before reaching the sink
    pub skipped: usize,
}

/// A row that a sink could not deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub key: String,
    pub message: String,
}

/// Outcome of one sink run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkReport {
    pub written: usize,
    pub failures: Vec<Failure>,
}

impl SinkReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failure lines for a summary, truncated after `limit` entries
    pub fn failure_lines(&self, limit: usize) -> Vec<String> {
        let mut lines: Vec<String> = self
            .failures
            .iter()
            .take(limit)
            .map(|f| format!("{}: {}", f.key, f.message))
            .collect();
        if self.failures.len() > limit {
            lines.push(format!("... and {} more", self.failures.len() - limit));
        }
        lines
    }
}

/// A consumer of transformed rows.
///
/// `Err` is reserved for fatal problems with the output itself; rows that
/// fail individually are reported in `SinkReport::failures`.
pub trait RowSink {
    fn name(&self) -> &'static str;

    fn consume(&mut self, input: &SinkInput<'_>) -> Result<SinkReport, SinkError>;
}
