//! Record instances

use crate::descriptor::{same_type, FieldDescriptor, RecordType};
use chunkwise_model::error::json_kind;
use chunkwise_model::{ChunkError, Result};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::sync::Arc;

/// Field values, one slot per declared field
pub(crate) type Values = SmallVec<[Value; 8]>;

/// A value of a resolved record type
///
/// Every declared field has a slot; `Value::Null` means the field is null or
/// absent.
#[derive(Debug, Clone)]
pub struct Record {
    record_type: Arc<RecordType>,
    values: Values,
}

impl Record {
    /// Default-constructed record: every field null
    pub fn new(record_type: Arc<RecordType>) -> Self {
        let values = std::iter::repeat(Value::Null)
            .take(record_type.len())
            .collect();
        Self {
            record_type,
            values,
        }
    }

    pub(crate) fn from_parts(record_type: Arc<RecordType>, values: Values) -> Self {
        debug_assert_eq!(record_type.len(), values.len());
        Self {
            record_type,
            values,
        }
    }

    /// Build a record from a JSON object.
    ///
    /// Missing fields are null; keys the type does not declare are rejected.
    pub fn from_object(record_type: Arc<RecordType>, object: Map<String, Value>) -> Result<Self> {
        let mut record = Self::new(record_type);
        for (name, value) in object {
            record.set(&name, value)?;
        }
        Ok(record)
    }

    /// Build a record from a JSON value, which must be an object
    pub fn from_value(record_type: Arc<RecordType>, value: Value) -> Result<Self> {
        match value {
            Value::Object(object) => Self::from_object(record_type, object),
            other => Err(ChunkError::InvalidArgument(format!(
                "record of type '{}' must be a JSON object, found {}",
                record_type.name(),
                json_kind(&other)
            ))),
        }
    }

    /// Record type
    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    /// Value of a field by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.record_type
            .position(name)
            .map(|idx| &self.values[idx])
    }

    /// Replace a field's value
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        let idx = self
            .record_type
            .position(name)
            .ok_or_else(|| ChunkError::UnknownField {
                record_type: self.record_type.name().to_string(),
                field: name.to_string(),
            })?;
        self.values[idx] = value;
        Ok(())
    }

    /// Builder-style [`set`](Self::set)
    pub fn with(mut self, name: &str, value: Value) -> Result<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Field descriptors paired with their values, in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDescriptor, &Value)> {
        self.record_type.fields().iter().zip(self.values.iter())
    }

    pub(crate) fn values(&self) -> &[Value] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [Value] {
        &mut self.values
    }

    /// JSON object with every declared field, nulls included
    pub fn to_object(&self) -> Map<String, Value> {
        self.fields()
            .map(|(field, value)| (field.name().to_string(), value.clone()))
            .collect()
    }

    /// Consume into a JSON object value
    pub fn into_value(self) -> Value {
        let Record {
            record_type,
            values,
        } = self;
        Value::Object(
            record_type
                .fields()
                .iter()
                .zip(values)
                .map(|(field, value)| (field.name().to_string(), value))
                .collect(),
        )
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        same_type(&self.record_type, &other.record_type) && self.values == other.values
    }
}
