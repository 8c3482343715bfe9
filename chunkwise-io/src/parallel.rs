//! Parallel batch chunking
//!
//! Records are independent, so a batch is chunked on the rayon pool one
//! record per task. Results come back in input order.

use chunkwise_engine::{chunk_all, Record, RecordType, Registry};
use chunkwise_model::{ChunkError, Result};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

const MAX_BATCH_THREADS: usize = 16;

/// Configuration for [`chunk_batch_with`]
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchConfig {
    /// Cap on worker threads; `None` uses rayon's global pool
    pub max_threads: Option<usize>,
}

/// Chunk every record of a batch in parallel.
///
/// The outer vector follows the input order; each inner vector holds one
/// record's chunks. The first failing record fails the whole batch.
pub fn chunk_batch(
    registry: &Registry,
    type_name: &str,
    records: &[Value],
    chunk_size: usize,
) -> Result<Vec<Vec<Record>>> {
    chunk_batch_with(registry, type_name, records, chunk_size, BatchConfig::default())
}

/// [`chunk_batch`] with an explicit thread configuration
pub fn chunk_batch_with(
    registry: &Registry,
    type_name: &str,
    records: &[Value],
    chunk_size: usize,
    config: BatchConfig,
) -> Result<Vec<Vec<Record>>> {
    let record_type = registry.record_type(type_name).ok_or_else(|| {
        ChunkError::Registry(format!("record type '{}' is not registered", type_name))
    })?;
    if chunk_size < 1 {
        return Err(ChunkError::InvalidArgument(format!(
            "chunk size must be at least 1, got {chunk_size}"
        )));
    }

    let run = || -> Result<Vec<Vec<Record>>> {
        records
            .par_iter()
            .map(|value| chunk_one(&record_type, value, chunk_size))
            .collect()
    };

    let result = match config.max_threads {
        None => run(),
        Some(threads) => {
            let thread_count = threads.clamp(1, MAX_BATCH_THREADS);
            let pool = ThreadPoolBuilder::new()
                .num_threads(thread_count)
                .thread_name(|idx| format!("chunkwise-batch-{}", idx))
                .build()
                .map_err(|e| ChunkError::Internal(format!("Failed to create thread pool: {}", e)))?;
            pool.install(run)
        }
    }?;

    debug!(
        record_type = type_name,
        records = records.len(),
        chunks = result.iter().map(Vec::len).sum::<usize>(),
        "batch chunked"
    );
    Ok(result)
}

fn chunk_one(record_type: &Arc<RecordType>, value: &Value, chunk_size: usize) -> Result<Vec<Record>> {
    let record = Record::from_value(Arc::clone(record_type), value.clone())?;
    chunk_all(&record, chunk_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkwise_model::RecordSchema;
    use serde_json::json;

    fn registry() -> Registry {
        Registry::builder()
            .record_type(
                RecordSchema::new("Person")
                    .with_field("name", "String")
                    .with_field("numbers", "Vec<i64>"),
            )
            .build()
            .unwrap()
    }

    fn batch(count: usize) -> Vec<Value> {
        (0..count)
            .map(|i| json!({"name": format!("p{i}"), "numbers": (0..i as i64).collect::<Vec<_>>()}))
            .collect()
    }

    #[test]
    fn test_batch_preserves_order() {
        let records = batch(50);
        let chunked = chunk_batch(&registry(), "Person", &records, 4).unwrap();
        assert_eq!(chunked.len(), 50);
        for (i, chunks) in chunked.iter().enumerate() {
            assert_eq!(chunks.len(), i.div_ceil(4));
            for c in chunks {
                assert_eq!(c.get("name"), Some(&json!(format!("p{i}"))));
            }
        }
    }

    #[test]
    fn test_bounded_pool_matches_global() {
        let records = batch(20);
        let registry = registry();
        let global = chunk_batch(&registry, "Person", &records, 3).unwrap();
        let bounded = chunk_batch_with(
            &registry,
            "Person",
            &records,
            3,
            BatchConfig {
                max_threads: Some(2),
            },
        )
        .unwrap();
        assert_eq!(global, bounded);
    }

    #[test]
    fn test_bad_record_fails_batch() {
        let mut records = batch(5);
        records.push(json!({"name": "bad", "numbers": "nope"}));
        let err = chunk_batch(&registry(), "Person", &records, 2).unwrap_err();
        assert!(matches!(err, ChunkError::ValueShape { .. }));
    }

    #[test]
    fn test_zero_chunk_size() {
        let err = chunk_batch(&registry(), "Person", &batch(2), 0).unwrap_err();
        assert!(matches!(err, ChunkError::InvalidArgument(_)));
    }
}
