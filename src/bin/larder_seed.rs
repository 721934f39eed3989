//! larder-seed: Seed a catalog table from multilingual JSON records
//!
//! Usage:
//!   # Generate an English seed script on stdout
//!   larder-seed cocktails.json --schema cocktails
//!
//!   # Italian, written to a file
//!   larder-seed cocktails.json --schema cocktails --locale it --output seed-it.sql
//!
//!   # Every locale kept, split into batch files of 10 statements
//!   larder-seed desserts.jsonl --schema desserts --locale all --output-dir ./seeds
//!
//!   # Upsert straight into the database (SUPABASE_URL, SUPABASE_SERVICE_ROLE_KEY)
//!   larder-seed desserts.json --schema ./schemas/desserts.json --direct

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use larder::config::ConnectionConfig;
use larder::pipeline::{Pipeline, RunSummary};
use larder::schema::{catalog, TableSchema};
use larder::sink::direct::DEFAULT_BATCH_SIZE;
use larder::sink::{
    DirectSink, FileSink, FileTarget, RestClient, RowSink, FAILURE_DISPLAY_LIMIT,
};
use larder::source::read_source;
use larder::types::{GenerationContext, TargetLocale};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "larder-seed")]
#[command(about = "Generate idempotent upserts from multilingual catalog records", long_about = None)]
struct Args {
    /// Input file: JSON array, single object, or NDJSON (stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Built-in schema preset (cocktails, desserts) or a schema JSON file
    #[arg(long, short = 's')]
    schema: String,

    /// Target locale code, or "all" to keep every translation
    #[arg(long, short = 'l', default_value = "en")]
    locale: TargetLocale,

    /// Write the script to this file instead of stdout
    #[arg(long, short = 'o', conflicts_with_all = ["output_dir", "direct"])]
    output: Option<PathBuf>,

    /// Write batch files to <DIR>/<table>/batch-NN.sql
    #[arg(long, conflicts_with = "direct")]
    output_dir: Option<PathBuf>,

    /// Statements per batch file
    #[arg(long, default_value_t = 10, requires = "output_dir")]
    chunk_size: usize,

    /// Upsert directly over the REST API instead of writing SQL
    #[arg(long)]
    direct: bool,

    /// Rows per upsert request
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE, requires = "direct")]
    batch_size: usize,

    /// Don't wrap scripts in BEGIN/COMMIT
    #[arg(long)]
    no_transaction: bool,

    /// Timestamp recorded in script headers (RFC 3339, default: now)
    #[arg(long)]
    generated_at: Option<DateTime<Utc>>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("larder=info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let schema = resolve_schema(&args.schema)?;
    let context = GenerationContext::new(args.locale, args.generated_at.unwrap_or_else(Utc::now));

    // Credentials are checked before any record is read
    let mut sink = build_sink(&args)?;

    let records = read_source(args.input.as_deref())?;
    let summary = Pipeline::new(&schema, &context)
        .run(&records, sink.as_mut())
        .with_context(|| format!("{} sink failed", sink.name()))?;

    print_summary(&summary);

    if !summary.report.is_clean() {
        bail!("{} rows failed to upsert", summary.report.failures.len());
    }
    Ok(())
}

fn resolve_schema(name: &str) -> Result<TableSchema> {
    if catalog::PRESETS.contains(&name) {
        return Ok(catalog::preset(name)?);
    }
    let path = Path::new(name);
    if path.exists() {
        return TableSchema::load(path);
    }
    bail!(
        "unknown schema `{}`: expected one of {} or a schema JSON file",
        name,
        catalog::PRESETS.join(", ")
    )
}

fn build_sink(args: &Args) -> Result<Box<dyn RowSink>> {
    if args.direct {
        let config = ConnectionConfig::from_env()?;
        let client = RestClient::new(&config).context("Failed to build REST client")?;
        return Ok(Box::new(DirectSink::new(client, args.batch_size)?));
    }

    let target = match (&args.output, &args.output_dir) {
        (Some(path), _) => FileTarget::File(path.clone()),
        (None, Some(dir)) => {
            if args.chunk_size == 0 {
                bail!("--chunk-size must be at least 1");
            }
            FileTarget::Chunked {
                dir: dir.clone(),
                chunk_size: args.chunk_size,
            }
        }
        (None, None) => FileTarget::Stdout,
    };
    Ok(Box::new(FileSink::new(target).with_transaction(!args.no_transaction)))
}

fn print_summary(summary: &RunSummary) {
    eprintln!();
    eprintln!("Records:     {}", summary.total);
    eprintln!("Transformed: {}", summary.transformed);
    eprintln!("Written:     {}", summary.report.written);
    eprintln!("Skipped:     {}", summary.skipped.len());
    eprintln!("Failed:      {}", summary.report.failures.len());

    if !summary.skipped.is_empty() {
        eprintln!("\nSkipped records:");
        for skip in summary.skipped.iter().take(FAILURE_DISPLAY_LIMIT) {
            let key = skip.key.as_deref().unwrap_or("<no key>");
            eprintln!("  #{} {}: {}", skip.index + 1, key, skip.error);
        }
        if summary.skipped.len() > FAILURE_DISPLAY_LIMIT {
            eprintln!("  ... and {} more", summary.skipped.len() - FAILURE_DISPLAY_LIMIT);
        }
    }

    if !summary.report.is_clean() {
        eprintln!("\nFailures:");
        for line in summary.report.failure_lines(FAILURE_DISPLAY_LIMIT) {
            eprintln!("  {}", line);
        }
    }
}
