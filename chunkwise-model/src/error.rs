//! Error types for chunking and merging

use thiserror::Error;

/// Chunkwise error types
#[derive(Debug, Error)]
pub enum ChunkError {
    /// A caller-supplied argument is out of range (e.g. a zero chunk size).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A record of one type was handed to an operation expecting another.
    #[error("Schema mismatch: expected record type '{expected}', found '{found}'")]
    SchemaMismatch {
        /// Record type the operation was configured for
        expected: String,
        /// Record type of the offending record
        found: String,
    },
    /// A record value carries a field its record type does not declare.
    #[error("Unknown field '{field}' for record type '{record_type}'")]
    UnknownField {
        /// Record type name
        record_type: String,
        /// Field name not present in the record type
        field: String,
    },
    /// Merge-append met a map key that is already present in the target.
    #[error("Duplicate key '{key}' while merging field '{field}'")]
    DuplicateKey {
        /// Field being merged
        field: String,
        /// Key that was already present
        key: String,
    },
    /// A record schema declares the same field name twice.
    #[error("Duplicate field '{field}' in record type '{record_type}'")]
    DuplicateField {
        /// Record type name
        record_type: String,
        /// Repeated field name
        field: String,
    },
    /// A type signature could not be parsed.
    #[error("Invalid type signature '{signature}': {reason}")]
    InvalidSignature {
        /// Signature text as supplied
        signature: String,
        /// What the parser rejected
        reason: String,
    },
    /// Strict policy: a container-looking field matched no strategy.
    #[error(
        "Unsupported container: field '{field}' of record type '{record_type}' has signature \
         '{signature}' but no registered strategy matches it"
    )]
    UnsupportedContainer {
        /// Record type name
        record_type: String,
        /// Field name
        field: String,
        /// Declared signature
        signature: String,
    },
    /// A container field holds a value its strategy cannot operate on.
    #[error("Field '{field}' expected a {expected} value for strategy '{strategy}', found {found}")]
    ValueShape {
        /// Field name
        field: String,
        /// Strategy name the field resolved to
        strategy: String,
        /// Expected JSON value kind
        expected: String,
        /// Actual JSON value kind
        found: String,
    },
    /// Schema document is malformed.
    #[error("Schema error: {0}")]
    Schema(String),
    /// Registry setup failed.
    #[error("Registry error: {0}")]
    Registry(String),
    /// A chunk stream is malformed (out-of-order record or chunk indices).
    #[error("Stream error: {0}")]
    Stream(String),
    /// Internal error (worker pool setup and similar)
    #[error("Internal error: {0}")]
    Internal(String),
    /// I/O operation failed while reading or writing records.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// TOML schema parsing failed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ChunkError {
    /// Build a [`ChunkError::ValueShape`] from the offending JSON value.
    pub fn value_shape(
        field: &str,
        strategy: &str,
        expected: &str,
        found: &serde_json::Value,
    ) -> Self {
        ChunkError::ValueShape {
            field: field.to_string(),
            strategy: strategy.to_string(),
            expected: expected.to_string(),
            found: json_kind(found).to_string(),
        }
    }
}

/// Short human-readable name of a JSON value's kind.
pub fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ChunkError>;
