//! Chunkwise I/O - typed records, chunk streams and batch processing
//!
//! This crate provides the layers above the engine:
//!
//! - The `Chunkable` trait and `chunkable!` macro for plain Rust structs
//! - NDJSON split/merge over chunk envelopes
//! - Parallel chunking of record batches

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod parallel;
pub mod stream;
pub mod typed;

// Re-export commonly used types
pub use chunkwise_engine::{
    ChunkOptions, Record, RecordType, Registry, RegistryBuilder, UnknownContainerPolicy,
};
pub use chunkwise_model::{ChunkError, RecordSchema, Result};

// Re-export our own types
pub use parallel::{chunk_batch, chunk_batch_with, BatchConfig};
pub use stream::{merge_ndjson, split_ndjson, ChunkEnvelope, MergeSummary, SplitSummary};
pub use typed::Chunkable;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Load a schema file and build a registry holding its record type.
///
/// Returns the registry and the record type's name.
pub fn registry_from_schema_file(
    path: impl AsRef<Path>,
    opts: &ChunkOptions,
) -> Result<(Registry, String)> {
    let schema = RecordSchema::load(path.as_ref())?;
    let name = schema.name.clone();
    let registry = opts.registry_builder().record_type(schema).build()?;
    Ok((registry, name))
}

/// Run `write` against a temporary file beside `output`, then move it into
/// place. When `write` fails, `output` is left untouched.
pub fn write_atomically<T, F>(output: impl AsRef<Path>, write: F) -> Result<T>
where
    F: FnOnce(BufWriter<&mut File>) -> Result<T>,
{
    let output = output.as_ref();
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    let value = write(BufWriter::new(temp.as_file_mut()))?;
    temp.persist(output).map_err(|err| ChunkError::Io(err.error))?;
    debug!(output = %output.display(), "output committed");
    Ok(value)
}

/// Split an NDJSON file into a chunk envelope file
pub fn split_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    registry: &Registry,
    type_name: &str,
    opts: &ChunkOptions,
) -> Result<SplitSummary> {
    opts.validate()?;
    let reader = BufReader::new(File::open(input)?);
    write_atomically(output, |writer| {
        split_ndjson(reader, writer, registry, type_name, opts.chunk_size)
    })
}

/// Merge a chunk envelope file back into an NDJSON file
pub fn merge_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    registry: &Registry,
    type_name: &str,
) -> Result<MergeSummary> {
    let reader = BufReader::new(File::open(input)?);
    write_atomically(output, |writer| {
        merge_ndjson(reader, writer, registry, type_name)
    })
}
