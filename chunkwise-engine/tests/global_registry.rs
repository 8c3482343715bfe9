//! Process-wide registry installation
//!
//! Lives in its own test binary so the global slot starts empty.

use chunkwise_engine::{chunk, ChunkError, Registry, RecordSchema};
use chunkwise_test_utils::fixtures;

#[test]
fn test_install_global_once() {
    let installed = Registry::builder()
        .record_type(fixtures::list_property_schema())
        .build()
        .unwrap()
        .install_global()
        .unwrap();
    assert!(std::ptr::eq(installed, Registry::global()));
    assert!(Registry::global()
        .record_type("ClassWithListProperty")
        .is_some());

    let second = Registry::builder()
        .record_type(RecordSchema::new("Other").with_field("x", "u8"))
        .build()
        .unwrap()
        .install_global();
    assert!(matches!(second, Err(ChunkError::Registry(_))));

    let record_type = Registry::global()
        .record_type("ClassWithListProperty")
        .unwrap();
    let record = chunkwise_engine::Record::from_value(
        record_type,
        fixtures::list_property_record(5),
    )
    .unwrap();
    assert_eq!(chunk(&record, 2).unwrap().len(), 3);
}
