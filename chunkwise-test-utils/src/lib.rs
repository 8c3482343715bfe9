//! Chunkwise Test Utilities
//!
//! Shared fixtures and helpers for the Chunkwise crates' tests.

use chunkwise_model::RecordSchema;
use serde_json::{Map, Value};

/// Builder for record objects; keys keep the order they were added in
pub struct RecordBuilder {
    fields: Map<String, Value>,
}

impl RecordBuilder {
    /// Create a new record builder
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// Add a field with a string value
    pub fn string(mut self, key: &str, value: &str) -> Self {
        self.fields
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Add a field with an integer value
    pub fn int(mut self, key: &str, value: i64) -> Self {
        self.fields.insert(key.to_string(), Value::Number(value.into()));
        self
    }

    /// Add a field with a null value
    pub fn null(mut self, key: &str) -> Self {
        self.fields.insert(key.to_string(), Value::Null);
        self
    }

    /// Add a list field of integers
    pub fn ints(mut self, key: &str, values: impl IntoIterator<Item = i64>) -> Self {
        let items = values.into_iter().map(Value::from).collect();
        self.fields.insert(key.to_string(), Value::Array(items));
        self
    }

    /// Add a list field of strings
    pub fn strings<'a>(mut self, key: &str, values: impl IntoIterator<Item = &'a str>) -> Self {
        let items = values.into_iter().map(Value::from).collect();
        self.fields.insert(key.to_string(), Value::Array(items));
        self
    }

    /// Add a string-to-string map field, entries in the given order
    pub fn map<'a>(
        mut self,
        key: &str,
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::from(v)))
            .collect();
        self.fields.insert(key.to_string(), Value::Object(entries));
        self
    }

    /// Add a field with an arbitrary value
    pub fn value(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Build the record
    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Record shapes used throughout the test suites
pub mod fixtures {
    use super::*;

    /// Name, age, and one list of numbers
    pub fn list_property_schema() -> RecordSchema {
        RecordSchema::new("ClassWithListProperty")
            .with_field("Name", "string")
            .with_field("Age", "int")
            .with_field("Numbers", "List<int>")
    }

    /// One record of [`list_property_schema`] with `Numbers` = `1..=count`
    pub fn list_property_record(count: i64) -> Value {
        RecordBuilder::new()
            .string("Name", "John")
            .int("Age", 25)
            .ints("Numbers", 1..=count)
            .build()
    }

    /// A map and a fixed array side by side
    pub fn multiple_collection_schema() -> RecordSchema {
        RecordSchema::new("ClassWithMultipleCollectionProperties")
            .with_field("Name", "string")
            .with_field("Attributes", "Dictionary<string, string>")
            .with_field("Numbers", "int[]")
    }

    /// Five map entries and eight array elements
    pub fn multiple_collection_record() -> Value {
        RecordBuilder::new()
            .string("Name", "John")
            .map(
                "Attributes",
                [
                    ("Location", "USA"),
                    ("Occupation", "Engineer"),
                    ("Hobby", "Chess"),
                    ("Language", "English"),
                    ("Pet", "Dog"),
                ],
            )
            .ints("Numbers", 1..=8)
            .build()
    }

    /// Every built-in container kind, each nullable, plus a scalar
    pub fn all_containers_schema() -> RecordSchema {
        RecordSchema::new("AllContainers")
            .with_field("id", "u64")
            .with_field("sequence", "Option<Vec<i64>>")
            .with_field("collection", "Option<VecDeque<i64>>")
            .with_field("map", "Option<IndexMap<String, i64>>")
            .with_field("array", "Option<Box<[i64]>>")
            .with_field("set", "Option<BTreeSet<String>>")
    }

    /// Records of [`list_property_schema`] with growing list lengths
    pub fn list_property_records(count: usize) -> Vec<Value> {
        (0..count)
            .map(|i| {
                RecordBuilder::new()
                    .string("Name", &format!("user_{i}"))
                    .int("Age", 20 + (i % 50) as i64)
                    .ints("Numbers", 0..(i as i64 % 17))
                    .build()
            })
            .collect()
    }
}

/// Utility functions for test assertions
pub mod assertions {
    use serde_json::Value;

    /// Assert that two JSON values are equal, including object key order
    pub fn assert_json_ordered(actual: &Value, expected: &Value, context: &str) {
        let same = match (actual, expected) {
            (Value::Object(a), Value::Object(b)) => {
                a.keys().eq(b.keys())
                    && a.iter()
                        .zip(b.iter())
                        .all(|((_, x), (_, y))| ordered_eq(x, y))
            }
            _ => ordered_eq(actual, expected),
        };
        if !same {
            panic!(
                "JSON assertion failed in {}:\nExpected: {}\nActual: {}",
                context, expected, actual
            );
        }
    }

    fn ordered_eq(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Object(x), Value::Object(y)) => {
                x.keys().eq(y.keys())
                    && x.values().zip(y.values()).all(|(p, q)| ordered_eq(p, q))
            }
            (Value::Array(x), Value::Array(y)) => {
                x.len() == y.len() && x.iter().zip(y).all(|(p, q)| ordered_eq(p, q))
            }
            _ => a == b,
        }
    }
}
