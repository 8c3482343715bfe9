//! End-to-end chunk/merge scenarios over the fixture record shapes

use chunkwise_engine::{
    chunk, merge_chunks, ChunkError, FnStrategy, Record, Registry, TypeSignature,
};
use chunkwise_test_utils::{assertions::assert_json_ordered, fixtures, RecordBuilder};
use serde_json::{json, Value};

fn registry() -> Registry {
    Registry::builder()
        .record_type(fixtures::list_property_schema())
        .record_type(fixtures::multiple_collection_schema())
        .record_type(fixtures::all_containers_schema())
        .build()
        .expect("build registry")
}

fn record(registry: &Registry, type_name: &str, value: Value) -> Record {
    let record_type = registry.record_type(type_name).expect("registered type");
    Record::from_value(record_type, value).expect("record from value")
}

#[test]
fn test_list_property_chunks_and_merges() {
    let registry = registry();
    let original = record(
        &registry,
        "ClassWithListProperty",
        fixtures::list_property_record(10),
    );

    let chunks: Vec<Record> = registry.chunk(&original, 3).unwrap().iter().collect();
    assert_eq!(chunks.len(), 4);

    let numbers: Vec<&Value> = chunks.iter().map(|c| c.get("Numbers").unwrap()).collect();
    assert_eq!(numbers[0], &json!([1, 2, 3]));
    assert_eq!(numbers[1], &json!([4, 5, 6]));
    assert_eq!(numbers[2], &json!([7, 8, 9]));
    assert_eq!(numbers[3], &json!([10]));
    for c in &chunks {
        assert_eq!(c.get("Name"), Some(&json!("John")));
        assert_eq!(c.get("Age"), Some(&json!(25)));
    }

    let merged = registry
        .merge_chunks(original.record_type(), &chunks)
        .unwrap();
    assert_eq!(merged, original);
}

#[test]
fn test_multiple_collections_chunk_in_lockstep() {
    let registry = registry();
    let original = record(
        &registry,
        "ClassWithMultipleCollectionProperties",
        fixtures::multiple_collection_record(),
    );

    let sequence = registry.chunk(&original, 3).unwrap();
    assert_eq!(sequence.len(), 3);
    assert_eq!(sequence.max_len(), 8);

    let map_counts: Vec<usize> = sequence
        .iter()
        .map(|c| c.get("Attributes").unwrap().as_object().unwrap().len())
        .collect();
    assert_eq!(map_counts, vec![3, 2, 0]);

    let array_counts: Vec<usize> = sequence
        .iter()
        .map(|c| c.get("Numbers").unwrap().as_array().unwrap().len())
        .collect();
    assert_eq!(array_counts, vec![3, 3, 2]);

    let merged = merge_chunks(original.record_type(), &sequence).unwrap();
    assert_json_ordered(
        &merged.clone().into_value(),
        &original.clone().into_value(),
        "multiple collections",
    );
}

#[test]
fn test_every_builtin_kind_round_trips() {
    let registry = registry();
    let value = RecordBuilder::new()
        .int("id", 7)
        .ints("sequence", 0..11)
        .ints("collection", 100..104)
        .value("map", json!({"z": 1, "y": 2, "x": 3, "w": 4, "v": 5}))
        .ints("array", [9, 8, 7])
        .strings("set", ["red", "green", "blue", "cyan", "pink", "gray"])
        .build();
    let original = record(&registry, "AllContainers", value.clone());

    for size in [1, 2, 4, 5, 11, 50] {
        let sequence = chunk(&original, size).unwrap();
        assert_eq!(sequence.len(), 11usize.div_ceil(size));
        let merged = merge_chunks(original.record_type(), &sequence).unwrap();
        assert_json_ordered(&merged.into_value(), &value, &format!("size {size}"));
    }
}

#[test]
fn test_null_fields_survive_round_trip() {
    let registry = registry();
    let value = RecordBuilder::new()
        .int("id", 1)
        .ints("sequence", 0..5)
        .null("collection")
        .null("map")
        .build();
    let original = record(&registry, "AllContainers", value);

    let chunks: Vec<Record> = chunk(&original, 2).unwrap().iter().collect();
    assert!(chunks
        .iter()
        .all(|c| c.get("map") == Some(&Value::Null) && c.get("set") == Some(&Value::Null)));

    let merged = merge_chunks(original.record_type(), &chunks).unwrap();
    assert_eq!(merged.get("collection"), Some(&Value::Null));
    assert_eq!(merged.get("array"), Some(&Value::Null));
    assert_eq!(merged, original);
}

#[test]
fn test_record_without_elements_yields_no_chunks() {
    let registry = registry();
    let original = record(
        &registry,
        "ClassWithListProperty",
        fixtures::list_property_record(0),
    );
    let sequence = chunk(&original, 4).unwrap();
    assert!(sequence.is_empty());

    let merged = merge_chunks(original.record_type(), &sequence).unwrap();
    assert_eq!(merged, Record::new(original.record_type().clone()));
}

#[test]
fn test_custom_strategy_round_trip() {
    let registry = Registry::builder()
        .register_strategy_first(FnStrategy::new(
            "text-lines",
            |signature: &TypeSignature| signature.name() == "Lines",
            |value: &Value| value.as_str().map(|s| s.lines().count()),
            |value: &Value, start, count| {
                let lines: Vec<&str> = value.as_str().unwrap_or("").lines().collect();
                let window: Vec<&str> = lines.iter().skip(start).take(count).copied().collect();
                json!(window.join("\n"))
            },
            |_: &TypeSignature| json!(""),
            |target: &mut Value, source: &Value| {
                let head = target.as_str().unwrap_or("");
                let tail = source.as_str().unwrap_or("");
                let joined = match (head.is_empty(), tail.is_empty()) {
                    (true, _) => tail.to_string(),
                    (_, true) => head.to_string(),
                    _ => format!("{head}\n{tail}"),
                };
                *target = json!(joined);
                Ok(())
            },
        ))
        .record_type(
            chunkwise_engine::RecordSchema::new("Poem")
                .with_field("title", "String")
                .with_field("body", "Lines"),
        )
        .build()
        .unwrap();

    let poem = record(
        &registry,
        "Poem",
        json!({"title": "Stanzas", "body": "one\ntwo\nthree\nfour\nfive"}),
    );
    let chunks: Vec<Record> = chunk(&poem, 2).unwrap().iter().collect();
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[2].get("body"), Some(&json!("five")));

    let merged = merge_chunks(poem.record_type(), &chunks).unwrap();
    assert_eq!(merged, poem);
}

#[test]
fn test_wrong_container_shape_fails_before_chunking() {
    let registry = registry();
    let bad = record(
        &registry,
        "ClassWithMultipleCollectionProperties",
        json!({"Name": "John", "Attributes": [1, 2], "Numbers": [1]}),
    );
    match chunk(&bad, 2) {
        Err(ChunkError::ValueShape {
            field, expected, ..
        }) => {
            assert_eq!(field, "Attributes");
            assert_eq!(expected, "object");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_merge_rejects_foreign_chunks() {
    let registry = registry();
    let list = record(
        &registry,
        "ClassWithListProperty",
        fixtures::list_property_record(4),
    );
    let multi = record(
        &registry,
        "ClassWithMultipleCollectionProperties",
        fixtures::multiple_collection_record(),
    );
    let err = merge_chunks(list.record_type(), [&list, &multi]).unwrap_err();
    assert!(matches!(err, ChunkError::SchemaMismatch { .. }));
}
