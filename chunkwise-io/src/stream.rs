//! NDJSON chunk streams
//!
//! `split_ndjson` reads one record per line and writes one [`ChunkEnvelope`]
//! per chunk. `merge_ndjson` reads envelopes back, groups consecutive ones by
//! record index, and writes one merged record per line.
//!
//! A record whose containers are all empty or null produces no chunks. So
//! that it still survives a split/merge round trip, it is written as a single
//! envelope carrying the record unchanged.

use chunkwise_engine::{chunk, merge_chunks, Record, RecordType, Registry};
use chunkwise_model::{ChunkError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// One chunk on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkEnvelope {
    /// Zero-based index of the source record in the input stream
    pub record: u64,
    /// Zero-based index of this chunk within its record
    pub chunk: u64,
    /// The chunk itself, every declared field present
    pub data: Value,
}

/// Statistics from [`split_ndjson`]
#[derive(Debug, Clone, Default)]
pub struct SplitSummary {
    /// Input records read
    pub records_read: usize,
    /// Envelopes written
    pub chunks_written: usize,
    /// Records written through unchanged because they produced no chunks
    pub passthrough_records: usize,
    /// Length of the longest container seen
    pub max_container_len: usize,
    /// Time spent processing
    pub processing_duration: Duration,
}

/// Statistics from [`merge_ndjson`]
#[derive(Debug, Clone, Default)]
pub struct MergeSummary {
    /// Envelopes read
    pub chunks_read: usize,
    /// Merged records written
    pub records_written: usize,
    /// Time spent processing
    pub processing_duration: Duration,
}

fn lookup(registry: &Registry, type_name: &str) -> Result<Arc<RecordType>> {
    registry.record_type(type_name).ok_or_else(|| {
        ChunkError::Registry(format!("record type '{}' is not registered", type_name))
    })
}

fn write_line<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Split every NDJSON record read from `reader` into chunk envelopes.
///
/// Blank lines are skipped. The first malformed line or record aborts the
/// split; envelopes already written stay written, so callers writing to a
/// file go through [`write_atomically`](crate::write_atomically).
pub fn split_ndjson<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    registry: &Registry,
    type_name: &str,
    chunk_size: usize,
) -> Result<SplitSummary> {
    let start = Instant::now();
    let record_type = lookup(registry, type_name)?;
    let mut summary = SplitSummary::default();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let index = summary.records_read as u64;
        let record = Record::from_value(Arc::clone(&record_type), serde_json::from_str(&line)?)?;
        let sequence = chunk(&record, chunk_size)?;
        summary.records_read += 1;
        summary.max_container_len = summary.max_container_len.max(sequence.max_len());

        if sequence.is_empty() {
            trace!(record = index, "record has no container elements, passing through");
            write_line(
                &mut writer,
                &ChunkEnvelope {
                    record: index,
                    chunk: 0,
                    data: record.into_value(),
                },
            )?;
            summary.chunks_written += 1;
            summary.passthrough_records += 1;
            continue;
        }

        for (chunk_index, piece) in sequence.iter().enumerate() {
            write_line(
                &mut writer,
                &ChunkEnvelope {
                    record: index,
                    chunk: chunk_index as u64,
                    data: piece.into_value(),
                },
            )?;
            summary.chunks_written += 1;
        }
    }

    writer.flush()?;
    summary.processing_duration = start.elapsed();
    debug!(
        record_type = type_name,
        records = summary.records_read,
        chunks = summary.chunks_written,
        passthrough = summary.passthrough_records,
        "split finished"
    );
    Ok(summary)
}

/// Merge chunk envelopes read from `reader` back into NDJSON records.
///
/// Envelopes of one record must be consecutive with chunk indices `0, 1, ..`;
/// record indices must strictly increase. Anything else is a
/// [`ChunkError::Stream`] error.
pub fn merge_ndjson<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    registry: &Registry,
    type_name: &str,
) -> Result<MergeSummary> {
    let start = Instant::now();
    let record_type = lookup(registry, type_name)?;
    let mut summary = MergeSummary::default();
    let mut current: Option<u64> = None;
    let mut group: Vec<Record> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let envelope: ChunkEnvelope = serde_json::from_str(&line)?;
        summary.chunks_read += 1;

        if current != Some(envelope.record) {
            if let Some(previous) = current {
                if envelope.record <= previous {
                    return Err(ChunkError::Stream(format!(
                        "record {} appears after record {}",
                        envelope.record, previous
                    )));
                }
                flush_group(&mut writer, &record_type, &mut group)?;
                summary.records_written += 1;
            }
            current = Some(envelope.record);
        }

        if envelope.chunk != group.len() as u64 {
            return Err(ChunkError::Stream(format!(
                "record {}: expected chunk {}, found chunk {}",
                envelope.record,
                group.len(),
                envelope.chunk
            )));
        }
        group.push(Record::from_value(Arc::clone(&record_type), envelope.data)?);
    }

    if current.is_some() {
        flush_group(&mut writer, &record_type, &mut group)?;
        summary.records_written += 1;
    }

    writer.flush()?;
    summary.processing_duration = start.elapsed();
    debug!(
        record_type = type_name,
        chunks = summary.chunks_read,
        records = summary.records_written,
        "merge finished"
    );
    Ok(summary)
}

fn flush_group<W: Write>(
    writer: &mut W,
    record_type: &Arc<RecordType>,
    group: &mut Vec<Record>,
) -> Result<()> {
    let merged = merge_chunks(record_type, group.drain(..))?;
    write_line(writer, &merged.into_value())
}
