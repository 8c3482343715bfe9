//! Chunk orchestrator
//!
//! Splits one record into an ordered sequence of partial records. The number
//! of chunks is driven by the longest container field: `ceil(max_len / size)`.
//! Every container field is sliced with the same `[start, start + size)`
//! window, so shorter fields simply run out early and yield empty containers.
//! Scalars are copied verbatim; null containers stay null.

use crate::descriptor::FieldKind;
use crate::record::{Record, Values};
use chunkwise_model::{ChunkError, Result};
use std::iter::FusedIterator;
use std::sync::Arc;
use tracing::{debug, trace};

/// Split `record` into chunks holding at most `chunk_size` elements per container.
///
/// Every container value is shape-checked here, before anything is yielded;
/// iterating the returned sequence cannot fail.
pub fn chunk(record: &Record, chunk_size: usize) -> Result<ChunkSequence<'_>> {
    if chunk_size < 1 {
        return Err(ChunkError::InvalidArgument(format!(
            "chunk size must be at least 1, got {chunk_size}"
        )));
    }

    let mut max_len = 0;
    for (field, value) in record.fields() {
        if let FieldKind::Container(handle) = field.kind() {
            if value.is_null() {
                continue;
            }
            let len = handle.strategy().length(field, value)?;
            max_len = max_len.max(len);
        }
    }

    let sequence = ChunkSequence {
        record,
        chunk_size,
        max_len,
    };

    debug!(
        record_type = record.record_type().name(),
        max_len,
        chunk_size,
        chunks = sequence.len(),
        "chunking record"
    );

    Ok(sequence)
}

/// Lazy, restartable sequence of chunks borrowed from one record
///
/// Chunks are rebuilt on every iteration; nothing is cached.
#[derive(Debug, Clone, Copy)]
pub struct ChunkSequence<'a> {
    record: &'a Record,
    chunk_size: usize,
    max_len: usize,
}

impl<'a> ChunkSequence<'a> {
    /// Number of chunks
    pub fn len(&self) -> usize {
        self.max_len.div_ceil(self.chunk_size)
    }

    /// Whether the record produces no chunks (no container elements at all)
    pub fn is_empty(&self) -> bool {
        self.max_len == 0
    }

    /// Length of the longest container field
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Chunk size in use
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Iterate the chunks from the start
    pub fn iter(&self) -> ChunkIter<'a> {
        ChunkIter {
            record: self.record,
            chunk_size: self.chunk_size,
            max_len: self.max_len,
            start: 0,
        }
    }

    /// Build chunk `index` directly, if it exists
    pub fn get(&self, index: usize) -> Option<Record> {
        let start = index.checked_mul(self.chunk_size)?;
        (start < self.max_len).then(|| build_chunk(self.record, start, self.chunk_size))
    }
}

impl<'a> IntoIterator for ChunkSequence<'a> {
    type Item = Record;
    type IntoIter = ChunkIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, 's> IntoIterator for &'s ChunkSequence<'a> {
    type Item = Record;
    type IntoIter = ChunkIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the chunks of one record
#[derive(Debug, Clone)]
pub struct ChunkIter<'a> {
    record: &'a Record,
    chunk_size: usize,
    max_len: usize,
    start: usize,
}

impl Iterator for ChunkIter<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if self.start >= self.max_len {
            return None;
        }
        let chunk = build_chunk(self.record, self.start, self.chunk_size);
        trace!(
            record_type = self.record.record_type().name(),
            start = self.start,
            "chunk built"
        );
        self.start = self.start.saturating_add(self.chunk_size);
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .max_len
            .saturating_sub(self.start)
            .div_ceil(self.chunk_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkIter<'_> {}

impl FusedIterator for ChunkIter<'_> {}

fn build_chunk(record: &Record, start: usize, chunk_size: usize) -> Record {
    let record_type = record.record_type();
    let values: Values = record
        .fields()
        .map(|(field, value)| match field.kind() {
            FieldKind::Container(handle) if !value.is_null() => {
                handle.strategy().slice(value, start, chunk_size)
            }
            _ => value.clone(),
        })
        .collect();
    Record::from_parts(Arc::clone(record_type), values)
}

/// Convenience: collect every chunk eagerly
pub fn chunk_all(record: &Record, chunk_size: usize) -> Result<Vec<Record>> {
    Ok(chunk(record, chunk_size)?.iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Registry;
    use chunkwise_model::RecordSchema;
    use serde_json::{json, Value};

    fn person(numbers: Value) -> Record {
        let record_type = Registry::with_builtins()
            .describe(
                &RecordSchema::new("ClassWithListProperty")
                    .with_field("Name", "string")
                    .with_field("Age", "int")
                    .with_field("Numbers", "List<int>"),
            )
            .unwrap();
        Record::from_value(
            record_type,
            json!({"Name": "John", "Age": 25, "Numbers": numbers}),
        )
        .unwrap()
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let record = person(json!([1, 2, 3]));
        assert!(matches!(
            chunk(&record, 0),
            Err(ChunkError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_chunks_follow_window() {
        let record = person(json!([1, 2, 3, 4, 5, 6, 7, 8, 9, 10]));
        let sequence = chunk(&record, 3).unwrap();
        assert_eq!(sequence.len(), 4);

        let numbers: Vec<Value> = sequence
            .iter()
            .map(|c| c.get("Numbers").unwrap().clone())
            .collect();
        assert_eq!(
            numbers,
            vec![json!([1, 2, 3]), json!([4, 5, 6]), json!([7, 8, 9]), json!([10])]
        );
        for c in &sequence {
            assert_eq!(c.get("Name"), Some(&json!("John")));
            assert_eq!(c.get("Age"), Some(&json!(25)));
        }
    }

    #[test]
    fn test_sequence_is_restartable() {
        let record = person(json!([1, 2, 3, 4, 5]));
        let sequence = chunk(&record, 2).unwrap();
        let first: Vec<Record> = sequence.iter().collect();
        let second: Vec<Record> = sequence.iter().collect();
        assert_eq!(first, second);
        assert_eq!(sequence.get(2).unwrap().get("Numbers"), Some(&json!([5])));
        assert!(sequence.get(3).is_none());
    }

    #[test]
    fn test_empty_and_null_containers_yield_nothing() {
        assert!(chunk(&person(json!([])), 3).unwrap().is_empty());
        assert_eq!(chunk(&person(Value::Null), 3).unwrap().iter().count(), 0);
    }

    #[test]
    fn test_shape_error_raised_before_iteration() {
        let record = person(json!("not a list"));
        assert!(matches!(
            chunk(&record, 3),
            Err(ChunkError::ValueShape { .. })
        ));
    }

    #[test]
    fn test_exact_size_hint() {
        let record = person(json!([1, 2, 3, 4, 5, 6, 7]));
        let mut iter = chunk(&record, 3).unwrap().iter();
        assert_eq!(iter.len(), 3);
        iter.next();
        assert_eq!(iter.len(), 2);
    }
}
