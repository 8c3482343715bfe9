//! Chunkwise CLI - Command-line tool for record chunking
//!
//! This binary provides command-line interfaces for:
//! - split: NDJSON records → NDJSON chunk envelopes
//! - merge: NDJSON chunk envelopes → NDJSON records
//! - inspect: show how a schema's fields resolve to container strategies

use chunkwise_engine::{FieldKind, RecordType, Registry};
use chunkwise_io::{
    merge_ndjson, registry_from_schema_file, split_ndjson, write_atomically, ChunkOptions,
    MergeSummary, SplitSummary, UnknownContainerPolicy,
};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chunkwise")]
#[command(about = "Split records with container fields into bounded chunks and merge them back")]
#[command(version)]
struct Cli {
    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split NDJSON records into chunk envelopes
    ///
    /// Examples:
    ///   chunkwise split people.ndjson --schema person.toml --chunk-size 50 -o chunks.ndjson
    ///   cat people.ndjson | chunkwise split - --schema person.toml
    Split {
        /// Input NDJSON file ("-" for stdin)
        input: PathBuf,
        /// Record schema file (TOML, or JSON by extension)
        #[arg(long)]
        schema: PathBuf,
        /// Maximum container elements per chunk
        #[arg(long, default_value = "100")]
        chunk_size: usize,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Reject container-like fields no strategy handles
        #[arg(long)]
        strict: bool,
        /// Show progress spinner while splitting
        #[arg(long)]
        progress: bool,
    },
    /// Merge chunk envelopes back into NDJSON records
    Merge {
        /// Input chunk envelope file ("-" for stdin)
        input: PathBuf,
        /// Record schema file (TOML, or JSON by extension)
        #[arg(long)]
        schema: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Reject container-like fields no strategy handles
        #[arg(long)]
        strict: bool,
        /// Show progress spinner while merging
        #[arg(long)]
        progress: bool,
    },
    /// Show how each field of a schema resolves
    ///
    /// Examples:
    ///   chunkwise inspect --schema person.toml
    ///   chunkwise inspect --schema person.toml --format json --strict
    Inspect {
        /// Record schema file (TOML, or JSON by extension)
        #[arg(long)]
        schema: PathBuf,
        /// Output format (table, json)
        #[arg(long, value_enum, default_value_t = InspectFormat::Table)]
        format: InspectFormat,
        /// Reject container-like fields no strategy handles
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum InspectFormat {
    Table,
    Json,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Split {
            input,
            schema,
            chunk_size,
            output,
            strict,
            progress,
        } => {
            handle_split(input, schema, chunk_size, output, strict, progress)?;
        }
        Commands::Merge {
            input,
            schema,
            output,
            strict,
            progress,
        } => {
            handle_merge(input, schema, output, strict, progress)?;
        }
        Commands::Inspect {
            schema,
            format,
            strict,
        } => {
            handle_inspect(schema, format, strict)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn chunk_options(chunk_size: usize, strict: bool) -> ChunkOptions {
    ChunkOptions {
        chunk_size,
        unknown_containers: if strict {
            UnknownContainerPolicy::Strict
        } else {
            UnknownContainerPolicy::Permissive
        },
    }
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead>, Box<dyn Error>> {
    if path.as_os_str() == "-" {
        Ok(Box::new(BufReader::new(std::io::stdin().lock())))
    } else {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}


fn handle_split(
    input: PathBuf,
    schema: PathBuf,
    chunk_size: usize,
    output: Option<PathBuf>,
    strict: bool,
    show_progress: bool,
) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let opts = chunk_options(chunk_size, strict);
    opts.validate()?;
    let (registry, type_name) = registry_from_schema_file(&schema, &opts)?;
    debug!(schema = %schema.display(), record_type = %type_name, "schema loaded");

    let reader = open_input(&input)?;

    let mut progress_bar = show_progress.then(|| create_spinner("Splitting records"));
    // file output only appears once the whole input split cleanly
    let summary = match output.as_deref() {
        Some(path) => write_atomically(path, |writer| {
            split_ndjson(reader, writer, &registry, &type_name, opts.chunk_size)
        })?,
        None => {
            let writer = BufWriter::new(std::io::stdout().lock());
            split_ndjson(reader, writer, &registry, &type_name, opts.chunk_size)?
        }
    };
    let elapsed = start.elapsed();
    let rec_rate = summary.records_read as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    if let Some(pb) = progress_bar.take() {
        pb.finish_with_message(format!(
            "Split {} records into {} chunks in {:.2?} ({:.1} rec/s)",
            summary.records_read, summary.chunks_written, elapsed, rec_rate
        ));
    }
    report_split_summary(&summary, output.as_deref(), elapsed)?;
    Ok(())
}

fn handle_merge(
    input: PathBuf,
    schema: PathBuf,
    output: Option<PathBuf>,
    strict: bool,
    show_progress: bool,
) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let opts = chunk_options(ChunkOptions::default().chunk_size, strict);
    let (registry, type_name) = registry_from_schema_file(&schema, &opts)?;

    let reader = open_input(&input)?;

    let mut progress_bar = show_progress.then(|| create_spinner("Merging chunks"));
    let summary = match output.as_deref() {
        Some(path) => write_atomically(path, |writer| {
            merge_ndjson(reader, writer, &registry, &type_name)
        })?,
        None => {
            let writer = BufWriter::new(std::io::stdout().lock());
            merge_ndjson(reader, writer, &registry, &type_name)?
        }
    };
    let elapsed = start.elapsed();
    let rec_rate = summary.records_written as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    if let Some(pb) = progress_bar.take() {
        pb.finish_with_message(format!(
            "Merged {} chunks into {} records in {:.2?} ({:.1} rec/s)",
            summary.chunks_read, summary.records_written, elapsed, rec_rate
        ));
    }
    report_merge_summary(&summary, output.as_deref(), elapsed)?;
    Ok(())
}

fn describe_output(output: Option<&Path>) -> String {
    output
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "stdout".to_string())
}

fn report_split_summary(
    summary: &SplitSummary,
    output: Option<&Path>,
    elapsed: Duration,
) -> Result<(), Box<dyn Error>> {
    let mut stderr = std::io::stderr().lock();
    writeln!(
        &mut stderr,
        "Split to {} (records: {}, chunks: {}, unchunked: {}, longest container: {}, elapsed: {:.2?})",
        describe_output(output),
        summary.records_read,
        summary.chunks_written,
        summary.passthrough_records,
        summary.max_container_len,
        elapsed
    )?;
    Ok(())
}

fn report_merge_summary(
    summary: &MergeSummary,
    output: Option<&Path>,
    elapsed: Duration,
) -> Result<(), Box<dyn Error>> {
    let mut stderr = std::io::stderr().lock();
    writeln!(
        &mut stderr,
        "Merged to {} (chunks: {}, records: {}, elapsed: {:.2?})",
        describe_output(output),
        summary.chunks_read,
        summary.records_written,
        elapsed
    )?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct FieldReport {
    name: String,
    signature: String,
    nullable: bool,
    kind: &'static str,
    strategy: Option<String>,
}

#[derive(Debug, Serialize)]
struct InspectReport {
    record_type: String,
    strategies: Vec<String>,
    fields: Vec<FieldReport>,
}

fn build_report(registry: &Registry, record_type: &RecordType) -> InspectReport {
    InspectReport {
        record_type: record_type.name().to_string(),
        strategies: registry.strategies().map(str::to_string).collect(),
        fields: record_type
            .fields()
            .iter()
            .map(|field| FieldReport {
                name: field.name().to_string(),
                signature: field.signature().to_string(),
                nullable: field.signature().is_nullable(),
                kind: match field.kind() {
                    FieldKind::Scalar => "scalar",
                    FieldKind::Container(_) => "container",
                },
                strategy: field.strategy().map(|handle| handle.name().to_string()),
            })
            .collect(),
    }
}

fn handle_inspect(
    schema: PathBuf,
    format: InspectFormat,
    strict: bool,
) -> Result<(), Box<dyn Error>> {
    let opts = chunk_options(ChunkOptions::default().chunk_size, strict);
    let (registry, type_name) = registry_from_schema_file(&schema, &opts)?;
    let record_type = registry
        .record_type(&type_name)
        .ok_or_else(|| format!("record type '{}' missing after registration", type_name))?;
    let report = build_report(&registry, &record_type);

    let mut stdout = std::io::stdout().lock();
    match format {
        InspectFormat::Table => print_inspect_table(&mut stdout, &report)?,
        InspectFormat::Json => print_inspect_json(&mut stdout, &report)?,
    }
    Ok(())
}

fn print_inspect_table(writer: &mut dyn Write, report: &InspectReport) -> Result<(), Box<dyn Error>> {
    writeln!(writer, "Record type: {}", report.record_type)?;
    writeln!(writer, "Strategies: {}", report.strategies.join(", "))?;
    writeln!(writer)?;
    writeln!(writer, "Field\tSignature\tKind\tStrategy")?;
    for field in &report.fields {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            field.name,
            field.signature,
            field.kind,
            field.strategy.as_deref().unwrap_or("-")
        )?;
    }
    Ok(())
}

fn print_inspect_json(writer: &mut dyn Write, report: &InspectReport) -> Result<(), Box<dyn Error>> {
    serde_json::to_writer_pretty(&mut *writer, report)?;
    writeln!(writer)?;
    Ok(())
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
