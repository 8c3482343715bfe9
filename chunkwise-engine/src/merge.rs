//! Merge orchestrator
//!
//! Folds chunks back into a single record. Container fields are appended in
//! chunk order through their strategy; scalar fields take the value of the
//! last chunk that was merged.

use crate::descriptor::{same_type, FieldKind, RecordType};
use crate::record::Record;
use chunkwise_model::{ChunkError, Result};
use std::borrow::Borrow;
use std::sync::Arc;
use tracing::debug;

/// Merge chunks into a default-constructed record of `record_type`.
///
/// An empty chunk sequence yields the default record.
pub fn merge_chunks<I>(record_type: &Arc<RecordType>, chunks: I) -> Result<Record>
where
    I: IntoIterator,
    I::Item: Borrow<Record>,
{
    merge_into(Record::new(Arc::clone(record_type)), chunks)
}

/// Merge chunks onto `base`.
///
/// Every chunk must be of the base record's type; the first that is not
/// fails with [`ChunkError::SchemaMismatch`].
pub fn merge_into<I>(mut base: Record, chunks: I) -> Result<Record>
where
    I: IntoIterator,
    I::Item: Borrow<Record>,
{
    let record_type = Arc::clone(base.record_type());
    let mut merged = 0usize;

    for chunk in chunks {
        let chunk = chunk.borrow();
        if !same_type(&record_type, chunk.record_type()) {
            return Err(ChunkError::SchemaMismatch {
                expected: record_type.name().to_string(),
                found: chunk.record_type().name().to_string(),
            });
        }

        let targets = base.values_mut();
        for ((field, target), source) in record_type
            .fields()
            .iter()
            .zip(targets.iter_mut())
            .zip(chunk.values())
        {
            match field.kind() {
                FieldKind::Scalar => target.clone_from(source),
                FieldKind::Container(handle) => {
                    // a null chunk value contributes nothing
                    if source.is_null() {
                        continue;
                    }
                    let strategy = handle.strategy();
                    if target.is_null() {
                        *target = strategy.empty_instance(field);
                    }
                    strategy.merge_append(field, target, source)?;
                }
            }
        }
        merged += 1;
    }

    for (field, target) in record_type
        .fields()
        .iter()
        .zip(base.values_mut().iter_mut())
    {
        if let FieldKind::Container(handle) = field.kind() {
            if !target.is_null() {
                handle.strategy().finish_merge(field, target)?;
            }
        }
    }

    debug!(
        record_type = record_type.name(),
        chunks = merged,
        "merged chunks"
    );

    Ok(base)
}
