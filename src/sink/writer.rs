use crate::error::SinkError;
use crate::sink::{RowSink, SinkInput, SinkReport};
use crate::sql::statement::{batch_header, script_header, verification_footer, StatementGenerator};
use crate::types::Row;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes seed scripts to any writer
pub struct SqlWriter<W: Write> {
    writer: W,
    transaction: bool,
}

impl<W: Write> SqlWriter<W> {
    pub fn new(writer: W) -> Self {
        SqlWriter {
            writer,
            transaction: true,
        }
    }

    /// Wrap statements in `BEGIN;` / `COMMIT;` (on by default)
    pub fn with_transaction(mut self, transaction: bool) -> Self {
        self.transaction = transaction;
        self
    }

    /// Write a complete script: header, statements, verification footer
    pub fn write_script(&mut self, input: &SinkInput<'_>) -> Result<usize, SinkError> {
        let header = script_header(input.schema, input.context, input.rows.len(), input.skipped);
        writeln!(self.writer, "{}", header)?;

        let written = self.write_statements(input, input.rows, 0)?;

        write!(self.writer, "\n{}", verification_footer(input.schema))?;
        Ok(written)
    }

    /// Write one chunk of a batched script; `offset` is the index of the
    /// chunk's first row within the whole run
    pub fn write_batch(
        &mut self,
        input: &SinkInput<'_>,
        batch: usize,
        offset: usize,
        rows: &[Row],
    ) -> Result<usize, SinkError> {
        let header = batch_header(
            input.schema,
            input.context,
            batch,
            offset + 1,
            offset + rows.len(),
            input.rows.len(),
        );
        writeln!(self.writer, "{}", header)?;
        self.write_statements(input, rows, offset)
    }

    fn write_statements(
        &mut self,
        input: &SinkInput<'_>,
        rows: &[Row],
        offset: usize,
    ) -> Result<usize, SinkError> {
        let generator = StatementGenerator::new(input.schema);

        if self.transaction {
            writeln!(self.writer, "BEGIN;")?;
        }

        for (idx, row) in rows.iter().enumerate() {
            let statement = generator.upsert(row)?;
            debug!(key = %row.key, "rendered upsert");
            write!(
                self.writer,
                "\n-- {}. {}\n{}",
                offset + idx + 1,
                comment_safe(row.label()),
                statement
            )?;
        }

        if self.transaction {
            writeln!(self.writer, "\nCOMMIT;")?;
        }

        Ok(rows.len())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Where a file sink puts its output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileTarget {
    Stdout,
    File(PathBuf),
    /// `<dir>/<table>/batch-NN.sql`, `chunk_size` statements each
    Chunked { dir: PathBuf, chunk_size: usize },
}

/// Writes seed scripts to stdout, one file, or a directory of batch files.
///
/// Scripts are rendered in memory first, so a failed render leaves no
/// partial file behind.
pub struct FileSink {
    target: FileTarget,
    transaction: bool,
}

impl FileSink {
    pub fn new(target: FileTarget) -> Self {
        FileSink {
            target,
            transaction: true,
        }
    }

    pub fn with_transaction(mut self, transaction: bool) -> Self {
        self.transaction = transaction;
        self
    }

    fn render_script(&self, input: &SinkInput<'_>) -> Result<Vec<u8>, SinkError> {
        let mut writer = SqlWriter::new(Vec::new()).with_transaction(self.transaction);
        writer.write_script(input)?;
        Ok(writer.into_inner())
    }

    fn write_chunks(
        &self,
        input: &SinkInput<'_>,
        dir: &Path,
        chunk_size: usize,
    ) -> Result<Vec<PathBuf>, SinkError> {
        let table_dir = dir.join(&input.schema.table);

        let mut rendered = Vec::new();
        for (idx, chunk) in input.rows.chunks(chunk_size.max(1)).enumerate() {
            let mut writer = SqlWriter::new(Vec::new()).with_transaction(self.transaction);
            writer.write_batch(input, idx + 1, idx * chunk_size.max(1), chunk)?;
            let path = table_dir.join(format!("batch-{:02}.sql", idx + 1));
            rendered.push((path, writer.into_inner()));
        }

        std::fs::create_dir_all(&table_dir).map_err(|e| io_error(&table_dir, e))?;

        let mut paths = Vec::with_capacity(rendered.len());
        for (path, bytes) in rendered {
            std::fs::write(&path, bytes).map_err(|e| io_error(&path, e))?;
            info!(path = %path.display(), "wrote batch file");
            paths.push(path);
        }
        Ok(paths)
    }
}

impl RowSink for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    fn consume(&mut self, input: &SinkInput<'_>) -> Result<SinkReport, SinkError> {
        match &self.target {
            FileTarget::Stdout => {
                let bytes = self.render_script(input)?;
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&bytes)?;
                stdout.flush()?;
            }
            FileTarget::File(path) => {
                let bytes = self.render_script(input)?;
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
                }
                let size = bytes.len();
                std::fs::write(path, bytes).map_err(|e| io_error(path, e))?;
                info!(path = %path.display(), bytes = size, "wrote seed script");
            }
            FileTarget::Chunked { dir, chunk_size } => {
                let paths = self.write_chunks(input, dir, *chunk_size)?;
                info!(files = paths.len(), "wrote batched seed scripts");
            }
        }

        Ok(SinkReport {
            written: input.rows.len(),
            failures: Vec::new(),
        })
    }
}

fn io_error(path: &Path, source: std::io::Error) -> SinkError {
    SinkError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Keep a label on its comment line
fn comment_safe(label: &str) -> String {
    label.replace(['\r', '\n'], " ")
}
