//! Record schemas
//!
//! A [`RecordSchema`] is the unresolved shape of a record: an ordered list of
//! named fields, each with a textual type signature. The engine resolves it
//! against a strategy registry to decide which fields are containers.
//!
//! Schemas can be written in code, produced by the `chunkable!` macro, or
//! loaded from a TOML or JSON document:
//!
//! ```toml
//! name = "Person"
//!
//! [[fields]]
//! name = "name"
//! type = "String"
//!
//! [[fields]]
//! name = "numbers"
//! type = "Vec<i32>"
//! ```

use crate::error::{ChunkError, Result};
use crate::signature::TypeSignature;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Declared field: name plus type signature text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name
    pub name: String,
    /// Type signature as written
    #[serde(rename = "type")]
    pub signature: String,
}

impl FieldSpec {
    /// Create a field spec
    pub fn new(name: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
        }
    }

    /// Parse the declared signature
    pub fn parse_signature(&self) -> Result<TypeSignature> {
        TypeSignature::parse(&self.signature)
    }
}

/// Unresolved record shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
    /// Record type name
    pub name: String,
    /// Fields in declaration order
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl RecordSchema {
    /// Create an empty schema
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field (builder style)
    pub fn with_field(mut self, name: impl Into<String>, signature: impl Into<String>) -> Self {
        self.fields.push(FieldSpec::new(name, signature));
        self
    }

    /// Check the schema is well formed: a non-empty name, non-empty field
    /// names, no field declared twice, and every signature parses.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ChunkError::Schema("record type name is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(ChunkError::Schema(format!(
                    "record type '{}' has a field with an empty name",
                    self.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(ChunkError::DuplicateField {
                    record_type: self.name.clone(),
                    field: field.name.clone(),
                });
            }
            field.parse_signature()?;
        }
        Ok(())
    }

    /// Parse a schema from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let schema: RecordSchema = toml::from_str(text)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Parse a schema from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let schema: RecordSchema = serde_json::from_str(text)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Load a schema file; `.json` files are read as JSON, everything else as TOML
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }
}
