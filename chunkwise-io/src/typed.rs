//! Typed bridge between Rust structs and engine records
//!
//! A [`Chunkable`] type declares its field schema once; its values are moved
//! through the engine as JSON objects via `serde_json`. The [`chunkable!`]
//! macro derives the schema from a struct definition.
//!
//! Chunks of a typed record are values of the same type, so container fields
//! must be able to hold fewer elements than the original. Fixed-length
//! arrays (`[T; N]`) cannot, and chunking them through this bridge fails on
//! conversion; use `Vec<T>` or `Box<[T]>` instead.

use chunkwise_engine::{Record, RecordType, Registry};
use chunkwise_model::{RecordSchema, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::borrow::Borrow;
use std::sync::Arc;
use tracing::trace;

/// A Rust type that can be chunked and merged
///
/// Field names in [`schema`](Self::schema) must match the names the type
/// serializes under.
pub trait Chunkable: Serialize + DeserializeOwned + Default {
    /// Field schema of the type
    fn schema() -> RecordSchema;

    /// Resolved record type: the registered one if present, else resolved on the fly
    fn record_type(registry: &Registry) -> Result<Arc<RecordType>> {
        let schema = Self::schema();
        match registry.record_type(&schema.name) {
            Some(record_type) => Ok(record_type),
            None => registry.describe(&schema),
        }
    }

    /// Convert into an engine record
    fn to_record(&self, registry: &Registry) -> Result<Record> {
        let record_type = Self::record_type(registry)?;
        Record::from_value(record_type, serde_json::to_value(self)?)
    }

    /// Convert back from an engine record
    fn from_record(record: &Record) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(
            record.to_object(),
        ))?)
    }

    /// Split into chunks of at most `chunk_size` container elements each
    fn chunk(&self, registry: &Registry, chunk_size: usize) -> Result<Vec<Self>> {
        let record = self.to_record(registry)?;
        let sequence = registry.chunk(&record, chunk_size)?;
        trace!(
            record_type = record.record_type().name(),
            chunks = sequence.len(),
            "typed record chunked"
        );
        sequence.iter().map(|chunk| Self::from_record(&chunk)).collect()
    }

    /// Merge chunks onto `Self::default()`
    fn merge_chunks<I>(registry: &Registry, chunks: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Borrow<Self>,
    {
        let base = Self::default().to_record(registry)?;
        let records = chunks
            .into_iter()
            .map(|chunk| chunk.borrow().to_record(registry))
            .collect::<Result<Vec<_>>>()?;
        Self::from_record(&registry.merge_into(base, records)?)
    }
}

/// Declare a struct and implement [`Chunkable`] for it.
///
/// The schema is built from the field names and their written types, so the
/// struct must serialize fields under their own names (no `rename`
/// attributes). The caller derives `Serialize`, `Deserialize` and `Default`.
///
/// ```
/// use chunkwise_io::{chunkable, Chunkable};
/// use serde::{Deserialize, Serialize};
///
/// chunkable! {
///     #[derive(Debug, Default, Serialize, Deserialize)]
///     pub struct Order {
///         pub id: u64,
///         pub lines: Vec<String>,
///     }
/// }
///
/// let schema = Order::schema();
/// assert_eq!(schema.name, "Order");
/// assert_eq!(schema.fields[1].signature, "Vec<String>");
/// ```
#[macro_export]
macro_rules! chunkable {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field : $ty
            ),*
        }

        impl $crate::Chunkable for $name {
            fn schema() -> $crate::RecordSchema {
                $crate::RecordSchema::new(stringify!($name))
                    $( .with_field(stringify!($field), stringify!($ty)) )*
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Chunkable;
    use chunkwise_model::ChunkError;
    use serde::Deserialize;
    use std::borrow::Cow;
    use std::collections::{BTreeMap, HashSet};

    chunkable! {
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        struct ClassWithListProperty {
            name: String,
            age: u32,
            numbers: Vec<i32>,
        }
    }

    chunkable! {
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        struct Inventory {
            warehouse: Option<String>,
            stock: BTreeMap<String, u32>,
            tags: Option<HashSet<String>>,
            bins: Box<[u16]>,
        }
    }

    chunkable! {
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        struct Labelled {
            label: Cow<'static, str>,
            items: Vec<u32>,
        }
    }

    fn person() -> ClassWithListProperty {
        ClassWithListProperty {
            name: "John".to_string(),
            age: 25,
            numbers: (1..=10).collect(),
        }
    }

    #[test]
    fn test_schema_from_macro() {
        let schema = Inventory::schema();
        assert_eq!(schema.name, "Inventory");
        let names: Vec<&str> = schema.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["warehouse", "stock", "tags", "bins"]);
        schema.validate().unwrap();
    }

    #[test]
    fn test_typed_chunks() {
        let registry = Registry::with_builtins();
        let chunks = person().chunk(&registry, 3).unwrap();
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].numbers, vec![1, 2, 3]);
        assert_eq!(chunks[3].numbers, vec![10]);
        assert!(chunks.iter().all(|c| c.name == "John" && c.age == 25));
    }

    #[test]
    fn test_typed_round_trip() {
        let registry = Registry::with_builtins();
        let original = person();
        let chunks = original.chunk(&registry, 4).unwrap();
        let merged = ClassWithListProperty::merge_chunks(&registry, &chunks).unwrap();
        assert_eq!(merged, original);
    }

    #[test]
    fn test_typed_fields_with_lifetimes() {
        let registry = Registry::with_builtins();
        let original = Labelled {
            label: Cow::Borrowed("bin"),
            items: (0..5).collect(),
        };
        let record_type = Labelled::record_type(&registry).unwrap();
        assert!(!record_type.fields()[0].is_container());

        let chunks = original.chunk(&registry, 2).unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.label == "bin"));
        assert_eq!(chunks[2].items, vec![4]);

        let merged = Labelled::merge_chunks(&registry, &chunks).unwrap();
        assert_eq!(merged, original);
    }

    #[test]
    fn test_typed_round_trip_mixed_containers() {
        let registry = Registry::with_builtins();
        let original = Inventory {
            warehouse: Some("north".to_string()),
            stock: (0..7).map(|i| (format!("sku{i}"), i * 10)).collect(),
            tags: None,
            bins: vec![4, 8, 15].into_boxed_slice(),
        };
        let chunks = original.chunk(&registry, 2).unwrap();
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.tags.is_none()));

        let merged = Inventory::merge_chunks(&registry, chunks).unwrap();
        assert_eq!(merged, original);
    }

    #[test]
    fn test_typed_empty_merge_is_default() {
        let registry = Registry::with_builtins();
        let merged =
            ClassWithListProperty::merge_chunks(&registry, Vec::<ClassWithListProperty>::new())
                .unwrap();
        assert_eq!(merged, ClassWithListProperty::default());
    }

    #[test]
    fn test_registered_type_is_reused() {
        let registry = Registry::builder()
            .record_type(ClassWithListProperty::schema())
            .build()
            .unwrap();
        let registered = registry.record_type("ClassWithListProperty").unwrap();
        let resolved = ClassWithListProperty::record_type(&registry).unwrap();
        assert!(Arc::ptr_eq(&registered, &resolved));
    }

    #[test]
    fn test_zero_chunk_size() {
        let registry = Registry::with_builtins();
        assert!(matches!(
            person().chunk(&registry, 0),
            Err(ChunkError::InvalidArgument(_))
        ));
    }
}
