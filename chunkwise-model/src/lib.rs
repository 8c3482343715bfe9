//! Chunkwise Model - Core primitives for record chunking
//!
//! This crate provides the shape-level vocabulary shared by the chunking
//! engine and its front ends, with no engine dependencies. It includes:
//!
//! - Error types
//! - Type signature parsing
//! - Record schemas (ordered, named, typed fields)
//! - Schema file loading (TOML / JSON)

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod schema;
pub mod signature;

// Re-export commonly used types
pub use error::{ChunkError, Result};
pub use schema::{FieldSpec, RecordSchema};
pub use signature::{ArrayLen, Shape, TypeSignature};
