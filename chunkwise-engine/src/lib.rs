//! Chunkwise Engine - container strategies and the chunk/merge orchestrators
//!
//! This crate turns declared record schemas into resolved record types and
//! moves records between their whole and chunked forms:
//!
//! - Container strategies (built-in and custom) that know how to measure,
//!   slice, and append one kind of container
//! - A strategy registry that resolves each field to a strategy or scalar
//! - The chunk orchestrator, a lazy restartable sequence of partial records
//! - The merge orchestrator, which folds chunks back into one record

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod builtin;
pub mod chunk;
pub mod descriptor;
pub mod merge;
pub mod record;
pub mod registry;
pub mod strategy;

// Re-export commonly used types
pub use chunkwise_model::{ChunkError, FieldSpec, RecordSchema, Result, TypeSignature};

// Re-export our own types
pub use builtin::{builtin_strategies, ListStrategy, MapStrategy, SetStrategy};
pub use chunk::{chunk, chunk_all, ChunkIter, ChunkSequence};
pub use descriptor::{FieldDescriptor, FieldKind, RecordType, StrategyHandle};
pub use merge::{merge_chunks, merge_into};
pub use record::Record;
pub use registry::{Registry, RegistryBuilder};
pub use strategy::{ContainerKind, ContainerStrategy, FnStrategy};

/// Default number of container elements per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// What to do with a field that looks like a container but matches no strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownContainerPolicy {
    /// Log a warning and copy the field verbatim into every chunk
    #[default]
    Permissive,
    /// Fail resolution with [`ChunkError::UnsupportedContainer`]
    Strict,
}

/// Chunking options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOptions {
    /// Maximum container elements per chunk
    pub chunk_size: usize,
    /// Policy applied while resolving record types
    pub unknown_containers: UnknownContainerPolicy,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            unknown_containers: UnknownContainerPolicy::Permissive,
        }
    }
}

impl ChunkOptions {
    /// Reject option combinations the orchestrators cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ChunkError::InvalidArgument(
                "chunk size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Registry builder with the built-ins and this policy
    pub fn registry_builder(&self) -> RegistryBuilder {
        Registry::builder().unknown_containers(self.unknown_containers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = ChunkOptions::default();
        assert_eq!(opts.chunk_size, 100);
        assert_eq!(opts.unknown_containers, UnknownContainerPolicy::Permissive);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_zero_chunk_size_invalid() {
        let opts = ChunkOptions {
            chunk_size: 0,
            ..ChunkOptions::default()
        };
        assert!(matches!(opts.validate(), Err(ChunkError::InvalidArgument(_))));
    }

    #[test]
    fn test_registry_builder_carries_policy() {
        let opts = ChunkOptions {
            unknown_containers: UnknownContainerPolicy::Strict,
            ..ChunkOptions::default()
        };
        let registry = opts.registry_builder().build().unwrap();
        assert_eq!(registry.policy(), UnknownContainerPolicy::Strict);
    }
}
