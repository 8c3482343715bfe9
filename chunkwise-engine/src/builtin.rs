//! Built-in container strategies
//!
//! Sequences, collections and arrays all travel as JSON arrays and share one
//! implementation; maps travel as JSON objects in insertion order; sets travel
//! as JSON arrays of distinct elements.

use crate::descriptor::FieldDescriptor;
use crate::strategy::{ContainerKind, ContainerStrategy};
use ahash::{AHashMap, RandomState};
use chunkwise_model::{ChunkError, Result, TypeSignature};
use serde_json::{Map, Value};
use std::hash::{BuildHasher, Hash, Hasher};
use std::mem;

/// Strategy name of the ordered-sequence built-in
pub const SEQUENCE: &str = "sequence";
/// Strategy name of the ordered-collection built-in
pub const COLLECTION: &str = "collection";
/// Strategy name of the key-value map built-in
pub const MAP: &str = "map";
/// Strategy name of the fixed-array built-in
pub const ARRAY: &str = "array";
/// Strategy name of the set built-in
pub const SET: &str = "set";

/// Built-in strategies in precedence order
pub fn builtin_strategies() -> Vec<Box<dyn ContainerStrategy>> {
    vec![
        Box::new(ListStrategy::new(ContainerKind::Sequence)),
        Box::new(ListStrategy::new(ContainerKind::Collection)),
        Box::new(MapStrategy),
        Box::new(ListStrategy::new(ContainerKind::Array)),
        Box::new(SetStrategy),
    ]
}

fn window<T: Clone>(items: &[T], start: usize, count: usize) -> Vec<T> {
    items.iter().skip(start).take(count).cloned().collect()
}

/// Array-backed strategy for sequences, collections and arrays
#[derive(Debug, Clone, Copy)]
pub struct ListStrategy {
    kind: ContainerKind,
}

impl ListStrategy {
    /// Strategy for one of the array-backed kinds
    pub fn new(kind: ContainerKind) -> Self {
        Self { kind }
    }
}

impl ContainerStrategy for ListStrategy {
    fn name(&self) -> &str {
        match self.kind {
            ContainerKind::Collection => COLLECTION,
            ContainerKind::Array => ARRAY,
            _ => SEQUENCE,
        }
    }

    fn kind(&self) -> ContainerKind {
        self.kind
    }

    fn matches(&self, signature: &TypeSignature) -> bool {
        self.kind.matches(signature)
    }

    fn length(&self, field: &FieldDescriptor, value: &Value) -> Result<usize> {
        value
            .as_array()
            .map(Vec::len)
            .ok_or_else(|| ChunkError::value_shape(field.name(), self.name(), "array", value))
    }

    fn slice(&self, value: &Value, start: usize, count: usize) -> Value {
        match value {
            Value::Array(items) => Value::Array(window(items, start, count)),
            // length() rejects everything else
            other => other.clone(),
        }
    }

    fn empty_instance(&self, _field: &FieldDescriptor) -> Value {
        Value::Array(Vec::new())
    }

    fn merge_append(
        &self,
        field: &FieldDescriptor,
        target: &mut Value,
        source: &Value,
    ) -> Result<()> {
        let incoming = source
            .as_array()
            .ok_or_else(|| ChunkError::value_shape(field.name(), self.name(), "array", source))?;
        match target {
            Value::Array(items) => {
                items.extend(incoming.iter().cloned());
                Ok(())
            }
            other => Err(ChunkError::value_shape(
                field.name(),
                self.name(),
                "array",
                other,
            )),
        }
    }
}

/// Object-backed strategy for key-value maps
///
/// Entries are sliced in insertion order. Merging a key that is already
/// present fails with [`ChunkError::DuplicateKey`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MapStrategy;

impl ContainerStrategy for MapStrategy {
    fn name(&self) -> &str {
        MAP
    }

    fn kind(&self) -> ContainerKind {
        ContainerKind::Map
    }

    fn matches(&self, signature: &TypeSignature) -> bool {
        ContainerKind::Map.matches(signature)
    }

    fn length(&self, field: &FieldDescriptor, value: &Value) -> Result<usize> {
        value
            .as_object()
            .map(Map::len)
            .ok_or_else(|| ChunkError::value_shape(field.name(), MAP, "object", value))
    }

    fn slice(&self, value: &Value, start: usize, count: usize) -> Value {
        match value {
            Value::Object(entries) => Value::Object(
                entries
                    .iter()
                    .skip(start)
                    .take(count)
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn empty_instance(&self, _field: &FieldDescriptor) -> Value {
        Value::Object(Map::new())
    }

    fn merge_append(
        &self,
        field: &FieldDescriptor,
        target: &mut Value,
        source: &Value,
    ) -> Result<()> {
        let incoming = source
            .as_object()
            .ok_or_else(|| ChunkError::value_shape(field.name(), MAP, "object", source))?;
        let entries = match target {
            Value::Object(entries) => entries,
            other => return Err(ChunkError::value_shape(field.name(), MAP, "object", other)),
        };

        for (key, value) in incoming {
            if entries.contains_key(key) {
                return Err(ChunkError::DuplicateKey {
                    field: field.name().to_string(),
                    key: key.clone(),
                });
            }
            entries.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

/// Array-backed strategy for sets
///
/// Elements keep their iteration order. Appending only extends the array;
/// repeats are absorbed once the merge finishes, matching set insertion.
/// Elements compare by JSON value equality, so objects with the same entries
/// in a different order are the same element.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetStrategy;

impl ContainerStrategy for SetStrategy {
    fn name(&self) -> &str {
        SET
    }

    fn kind(&self) -> ContainerKind {
        ContainerKind::Set
    }

    fn matches(&self, signature: &TypeSignature) -> bool {
        ContainerKind::Set.matches(signature)
    }

    fn length(&self, field: &FieldDescriptor, value: &Value) -> Result<usize> {
        value
            .as_array()
            .map(Vec::len)
            .ok_or_else(|| ChunkError::value_shape(field.name(), SET, "array", value))
    }

    fn slice(&self, value: &Value, start: usize, count: usize) -> Value {
        match value {
            Value::Array(items) => Value::Array(window(items, start, count)),
            other => other.clone(),
        }
    }

    fn empty_instance(&self, _field: &FieldDescriptor) -> Value {
        Value::Array(Vec::new())
    }

    fn merge_append(
        &self,
        field: &FieldDescriptor,
        target: &mut Value,
        source: &Value,
    ) -> Result<()> {
        let incoming = source
            .as_array()
            .ok_or_else(|| ChunkError::value_shape(field.name(), SET, "array", source))?;
        match target {
            Value::Array(items) => {
                items.extend(incoming.iter().cloned());
                Ok(())
            }
            other => Err(ChunkError::value_shape(field.name(), SET, "array", other)),
        }
    }

    fn finish_merge(&self, field: &FieldDescriptor, target: &mut Value) -> Result<()> {
        match target {
            Value::Array(items) => {
                dedup_values(items);
                Ok(())
            }
            other => Err(ChunkError::value_shape(field.name(), SET, "array", other)),
        }
    }
}

/// Drop repeated elements, keeping the first occurrence of each
fn dedup_values(items: &mut Vec<Value>) {
    let state = RandomState::new();
    let mut buckets: AHashMap<u64, Vec<usize>> = AHashMap::with_capacity(items.len());
    let mut kept: Vec<Value> = Vec::with_capacity(items.len());

    for value in items.drain(..) {
        let mut hasher = state.build_hasher();
        hash_value(&value, &mut hasher, &state);
        let bucket = buckets.entry(hasher.finish()).or_default();
        if bucket.iter().any(|&idx| kept[idx] == value) {
            continue;
        }
        bucket.push(kept.len());
        kept.push(value);
    }

    *items = kept;
}

/// Structural hash consistent with `Value` equality
fn hash_value<H: Hasher>(value: &Value, hasher: &mut H, state: &RandomState) {
    mem::discriminant(value).hash(hasher);
    match value {
        Value::Null => {}
        Value::Bool(b) => b.hash(hasher),
        Value::Number(n) => n.hash(hasher),
        Value::String(s) => s.hash(hasher),
        Value::Array(items) => {
            items.len().hash(hasher);
            for item in items {
                hash_value(item, hasher, state);
            }
        }
        Value::Object(entries) => {
            // entry order does not take part in object equality
            let combined = entries.iter().fold(0u64, |acc, (key, item)| {
                let mut entry = state.build_hasher();
                key.hash(&mut entry);
                hash_value(item, &mut entry, state);
                acc.wrapping_add(entry.finish())
            });
            entries.len().hash(hasher);
            combined.hash(hasher);
        }
    }
}
