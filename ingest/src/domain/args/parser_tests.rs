use prost::Message;

use super::*;
use crate::domain::args::{ArgRow, ArgValue, ArgsCollector};
use crate::domain::interned::InternedDataStore;

// ============================================================================
// TEST SCHEMA
// ============================================================================

#[derive(Clone, PartialEq, Message)]
struct SubMessage {
    #[prost(int32, optional, tag = "1")]
    field: Option<i32>,
}

#[derive(Clone, PartialEq, Message)]
struct Item {
    #[prost(int64, optional, tag = "1")]
    x: Option<i64>,
}

#[derive(Clone, PartialEq, Message)]
struct Location {
    #[prost(string, optional, tag = "1")]
    file_name: Option<String>,
    #[prost(uint32, optional, tag = "2")]
    line: Option<u32>,
}

#[derive(Clone, PartialEq, Message)]
struct Recursive {
    #[prost(message, optional, boxed, tag = "1")]
    child: Option<Box<Recursive>>,
    #[prost(int32, optional, tag = "2")]
    value: Option<i32>,
}

#[derive(Clone, PartialEq, Message)]
struct MainMessage {
    #[prost(int32, optional, tag = "1")]
    field1: Option<i32>,
    #[prost(string, optional, tag = "2")]
    field2: Option<String>,
    #[prost(message, optional, tag = "3")]
    field3: Option<SubMessage>,
    #[prost(message, repeated, tag = "4")]
    items: Vec<Item>,
    #[prost(bytes = "vec", optional, tag = "5")]
    blob: Option<Vec<u8>>,
    #[prost(uint64, optional, tag = "6")]
    count: Option<u64>,
    #[prost(double, optional, tag = "7")]
    ratio: Option<f64>,
    #[prost(bool, optional, tag = "8")]
    flag: Option<bool>,
    #[prost(sint32, optional, tag = "9")]
    delta: Option<i32>,
    #[prost(int32, repeated, packed = "true", tag = "10")]
    packed_values: Vec<i32>,
    #[prost(uint64, optional, tag = "11")]
    location_iid: Option<u64>,
    #[prost(int32, optional, tag = "12")]
    kind: Option<i32>,
    #[prost(string, repeated, tag = "13")]
    tags: Vec<String>,
    #[prost(int32, optional, tag = "100")]
    ext_value: Option<i32>,
    #[prost(int32, optional, tag = "200")]
    not_in_schema: Option<i32>,
}

const LOCATION_FIELD_ID: u32 = 4;

fn test_pool() -> DescriptorPool {
    let mut pool = DescriptorPool::new();
    pool.add_message(
        MessageDescriptor::new("test.protos.SubMessage")
            .with_field(FieldDescriptor::new("field", 1, FieldType::Int32)),
    );
    pool.add_message(
        MessageDescriptor::new("test.protos.Item")
            .with_field(FieldDescriptor::new("x", 1, FieldType::Int64)),
    );
    pool.add_message(
        MessageDescriptor::new("test.protos.Location")
            .with_field(FieldDescriptor::new("file_name", 1, FieldType::String))
            .with_field(FieldDescriptor::new("line", 2, FieldType::Uint32)),
    );
    pool.add_message(
        MessageDescriptor::new("test.protos.Recursive")
            .with_field(
                FieldDescriptor::new("child", 1, FieldType::Message)
                    .with_type_name("test.protos.Recursive"),
            )
            .with_field(FieldDescriptor::new("value", 2, FieldType::Int32)),
    );
    pool.add_message(
        MessageDescriptor::new("test.protos.MainMessage")
            .with_field(FieldDescriptor::new("field1", 1, FieldType::Int32))
            .with_field(FieldDescriptor::new("field2", 2, FieldType::String))
            .with_field(
                FieldDescriptor::new("field3", 3, FieldType::Message)
                    .with_type_name("test.protos.SubMessage"),
            )
            .with_field(
                FieldDescriptor::new("items", 4, FieldType::Message)
                    .with_type_name("test.protos.Item")
                    .repeated(),
            )
            .with_field(FieldDescriptor::new("blob", 5, FieldType::Bytes))
            .with_field(FieldDescriptor::new("count", 6, FieldType::Uint64))
            .with_field(FieldDescriptor::new("ratio", 7, FieldType::Double))
            .with_field(FieldDescriptor::new("flag", 8, FieldType::Bool))
            .with_field(FieldDescriptor::new("delta", 9, FieldType::Sint32))
            .with_field(FieldDescriptor::new("packed_values", 10, FieldType::Int32).repeated())
            .with_field(FieldDescriptor::new("location_iid", 11, FieldType::Uint64))
            .with_field(
                FieldDescriptor::new("kind", 12, FieldType::Enum).with_type_name("test.protos.Kind"),
            )
            .with_field(FieldDescriptor::new("tags", 13, FieldType::String).repeated()),
    );
    pool.add_extension(
        "test.protos.MainMessage",
        FieldDescriptor::new("ext_value", 100, FieldType::Int32),
    )
    .unwrap();
    pool
}

fn parse(
    parser: &ProtoToArgsParser<'_>,
    message: &MainMessage,
    allowed_fields: Option<&[u32]>,
) -> (Result<(), ArgsError>, Vec<ArgRowView>) {
    let mut collector = ArgsCollector::new();
    let result = parser.parse_message(
        &message.encode_to_vec(),
        ".test.protos.MainMessage",
        allowed_fields,
        &mut collector,
    );
    (result, rows(&collector))
}

type ArgRowView = (String, ArgValue);

fn rows(collector: &ArgsCollector<'_>) -> Vec<ArgRowView> {
    collector
        .rows()
        .iter()
        .map(|row| (row.key.clone(), row.value.clone()))
        .collect()
}

fn row(key: &str, value: ArgValue) -> ArgRowView {
    (key.to_string(), value)
}

// ============================================================================
// GENERIC WALK
// ============================================================================

#[test]
fn test_basic_fields_in_stream_order() {
    let pool = test_pool();
    let parser = ProtoToArgsParser::new(&pool);
    let message = MainMessage {
        field1: Some(42),
        field2: Some("hello".to_string()),
        field3: Some(SubMessage { field: Some(7) }),
        ..Default::default()
    };
    let mut collector = ArgsCollector::new();

    let result = parser.parse_message(
        &message.encode_to_vec(),
        ".test.protos.MainMessage",
        None,
        &mut collector,
    );

    let arg = |key: &str, value| ArgRow {
        flat_key: key.to_string(),
        key: key.to_string(),
        value,
    };
    assert_eq!(result, Ok(()));
    assert_eq!(
        collector.rows(),
        &[
            arg("field1", ArgValue::Int(42)),
            arg("field2", ArgValue::String("hello".into())),
            arg("field3.field", ArgValue::Int(7)),
        ]
    );
}

#[test]
fn test_parser_is_shareable_across_threads() {
    fn assert_sync<T: Sync>(_: &T) {}

    let pool = test_pool();
    let mut parser = ProtoToArgsParser::new(&pool);
    parser.add_parsing_override("field1", |field, scope, sink| {
        let value = field.as_varint().unwrap_or_default();
        sink.add_string(scope.key(), &format!("n{value}"));
        OverrideOutcome::Handled
    });
    assert_sync(&parser);

    let results: Vec<Vec<ArgRowView>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4i32)
            .map(|i| {
                let parser = &parser;
                s.spawn(move || {
                    let message = MainMessage {
                        field1: Some(i),
                        field3: Some(SubMessage { field: Some(i) }),
                        ..Default::default()
                    };
                    let (result, rows) = parse(parser, &message, None);
                    assert_eq!(result, Ok(()));
                    rows
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (i, rows) in results.into_iter().enumerate() {
        assert_eq!(
            rows,
            vec![
                row("field1", ArgValue::String(format!("n{i}"))),
                row("field3.field", ArgValue::Int(i as i64)),
            ]
        );
    }
}

#[test]
fn test_scalar_types_map_to_sink_calls() {
    let pool = test_pool();
    let parser = ProtoToArgsParser::new(&pool);
    let message = MainMessage {
        field1: Some(-5),
        count: Some(u64::MAX),
        ratio: Some(0.25),
        flag: Some(true),
        delta: Some(-3),
        kind: Some(2),
        ..Default::default()
    };

    let (result, rows) = parse(&parser, &message, None);

    assert_eq!(result, Ok(()));
    assert_eq!(
        rows,
        vec![
            row("field1", ArgValue::Int(-5)),
            row("count", ArgValue::Uint(u64::MAX)),
            row("ratio", ArgValue::Real(0.25)),
            row("flag", ArgValue::Bool(true)),
            row("delta", ArgValue::Int(-3)),
            row("kind", ArgValue::Int(2)),
        ]
    );
}

#[test]
fn test_repeated_fields_carry_indices_in_full_key_only() {
    let pool = test_pool();
    let parser = ProtoToArgsParser::new(&pool);
    let message = MainMessage {
        items: vec![Item { x: Some(1) }, Item { x: Some(2) }],
        tags: vec!["a".to_string(), "b".to_string()],
        ..Default::default()
    };

    let mut collector = ArgsCollector::new();
    let result = parser.parse_message(
        &message.encode_to_vec(),
        "test.protos.MainMessage",
        None,
        &mut collector,
    );

    assert_eq!(result, Ok(()));
    assert_eq!(
        collector.keys(),
        vec!["items[0].x", "items[1].x", "tags[0]", "tags[1]"]
    );
    assert_eq!(
        collector.values_for_flat_key("items.x"),
        vec![&ArgValue::Int(1), &ArgValue::Int(2)]
    );
    assert_eq!(collector.rows()[2].flat_key, "tags");
}

#[test]
fn test_packed_values_are_split() {
    let pool = test_pool();
    let parser = ProtoToArgsParser::new(&pool);
    let message = MainMessage {
        packed_values: vec![3, -1, 300],
        ..Default::default()
    };

    let (result, rows) = parse(&parser, &message, None);

    assert_eq!(result, Ok(()));
    assert_eq!(
        rows,
        vec![
            row("packed_values[0]", ArgValue::Int(3)),
            row("packed_values[1]", ArgValue::Int(-1)),
            row("packed_values[2]", ArgValue::Int(300)),
        ]
    );
}

#[test]
fn test_unknown_fields_are_skipped() {
    let pool = test_pool();
    let parser = ProtoToArgsParser::new(&pool);
    let message = MainMessage {
        field1: Some(1),
        not_in_schema: Some(9),
        ..Default::default()
    };

    let (result, rows) = parse(&parser, &message, None);

    assert_eq!(result, Ok(()));
    assert_eq!(rows, vec![row("field1", ArgValue::Int(1))]);
}

#[test]
fn test_unknown_top_level_type_fails_without_emitting() {
    let pool = test_pool();
    let parser = ProtoToArgsParser::new(&pool);
    let mut collector = ArgsCollector::new();

    let result = parser.parse_message(&[0x08, 0x01], ".test.protos.Missing", None, &mut collector);

    assert_eq!(
        result,
        Err(ArgsError::UnknownMessageType(".test.protos.Missing".to_string()))
    );
    assert!(collector.is_empty());
}

// ============================================================================
// ALLOW-LIST
// ============================================================================

#[test]
fn test_allowed_fields_filter_top_level() {
    let pool = test_pool();
    let parser = ProtoToArgsParser::new(&pool);
    let message = MainMessage {
        field1: Some(1),
        field2: Some("x".to_string()),
        field3: Some(SubMessage { field: Some(3) }),
        ..Default::default()
    };

    let (result, rows) = parse(&parser, &message, Some(&[1, 3]));

    assert_eq!(result, Ok(()));
    assert_eq!(
        rows,
        vec![
            row("field1", ArgValue::Int(1)),
            row("field3.field", ArgValue::Int(3)),
        ]
    );
}

#[test]
fn test_extensions_bypass_allowed_fields() {
    let pool = test_pool();
    let parser = ProtoToArgsParser::new(&pool);
    let message = MainMessage {
        field1: Some(1),
        ext_value: Some(77),
        ..Default::default()
    };

    let (result, rows) = parse(&parser, &message, Some(&[2]));

    assert_eq!(result, Ok(()));
    assert_eq!(rows, vec![row("ext_value", ArgValue::Int(77))]);
}

// ============================================================================
// ERRORS
// ============================================================================

#[test]
fn test_bytes_field_fails_but_siblings_survive() {
    let pool = test_pool();
    let parser = ProtoToArgsParser::new(&pool);
    let message = MainMessage {
        field1: Some(1),
        field3: Some(SubMessage { field: Some(3) }),
        blob: Some(vec![1, 2, 3]),
        count: Some(6),
        ..Default::default()
    };

    let (result, rows) = parse(&parser, &message, None);

    assert_eq!(
        result,
        Err(ArgsError::UnsupportedField {
            key: "blob".to_string(),
            field_type: "bytes",
        })
    );
    assert_eq!(
        rows,
        vec![
            row("field1", ArgValue::Int(1)),
            row("field3.field", ArgValue::Int(3)),
            row("count", ArgValue::Uint(6)),
        ]
    );
}

#[test]
fn test_wire_type_mismatch_is_reported() {
    let pool = test_pool();
    let parser = ProtoToArgsParser::new(&pool);
    // field 1 (int32) encoded as length-delimited, then field 6 = 2
    let bytes = [0x0a, 0x01, 0x41, 0x30, 0x02];
    let mut collector = ArgsCollector::new();

    let result = parser.parse_message(&bytes, "test.protos.MainMessage", None, &mut collector);

    assert_eq!(
        result,
        Err(ArgsError::WireTypeMismatch {
            key: "field1".to_string(),
            field_type: "int32",
            wire_type: "length-delimited",
        })
    );
    assert_eq!(rows(&collector), vec![row("count", ArgValue::Uint(2))]);
}

#[test]
fn test_truncated_message_keeps_earlier_values() {
    let pool = test_pool();
    let parser = ProtoToArgsParser::new(&pool);
    let mut bytes = MainMessage {
        field1: Some(5),
        ..Default::default()
    }
    .encode_to_vec();
    // field2, declared 10 bytes long, 2 present
    bytes.extend_from_slice(&[0x12, 0x0a, b'h', b'i']);
    let mut collector = ArgsCollector::new();

    let result = parser.parse_message(&bytes, "test.protos.MainMessage", None, &mut collector);

    assert!(matches!(result, Err(ArgsError::Malformed { .. })));
    assert_eq!(rows(&collector), vec![row("field1", ArgValue::Int(5))]);
}

#[test]
fn test_multiple_failures_report_first_and_count() {
    let pool = test_pool();
    let mut parser = ProtoToArgsParser::new(&pool);
    parser.add_interned_reference("location_iid", LOCATION_FIELD_ID, "test.protos.Location");
    let message = MainMessage {
        blob: Some(vec![1]),
        location_iid: Some(3),
        ..Default::default()
    };

    let (result, _) = parse(&parser, &message, None);

    match result {
        Err(ArgsError::Multiple { first, count }) => {
            assert!(matches!(*first, ArgsError::UnsupportedField { .. }));
            assert_eq!(count, 2);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_depth_limit_drops_deep_messages() {
    let pool = test_pool();
    let parser = ProtoToArgsParser::new(&pool).with_max_depth(2);
    let leaf = Recursive {
        child: None,
        value: Some(3),
    };
    let middle = Recursive {
        child: Some(Box::new(leaf)),
        value: Some(2),
    };
    let root = Recursive {
        child: Some(Box::new(middle)),
        value: Some(1),
    };
    let too_deep = Recursive {
        child: Some(Box::new(root.clone())),
        value: Some(0),
    };

    let mut collector = ArgsCollector::new();
    let result = parser.parse_message(
        &root.encode_to_vec(),
        "test.protos.Recursive",
        None,
        &mut collector,
    );
    assert_eq!(result, Ok(()));
    assert_eq!(
        collector.keys(),
        vec!["child.child.value", "child.value", "value"]
    );

    let mut collector = ArgsCollector::new();
    let result = parser.parse_message(
        &too_deep.encode_to_vec(),
        "test.protos.Recursive",
        None,
        &mut collector,
    );
    assert_eq!(
        result,
        Err(ArgsError::DepthExceeded {
            key: "child.child.child".to_string(),
            max_depth: 2,
        })
    );
    assert_eq!(
        collector.keys(),
        vec!["child.child.value", "child.value", "value"]
    );
}

// ============================================================================
// OVERRIDES
// ============================================================================

#[test]
fn test_handled_override_replaces_generic_output() {
    let pool = test_pool();
    let mut parser = ProtoToArgsParser::new(&pool);
    parser.add_parsing_override("field3.field", |field, scope, sink| {
        let value = field.as_varint().unwrap_or_default();
        sink.add_string(scope.key(), &format!("value={value}"));
        OverrideOutcome::Handled
    });
    let message = MainMessage {
        field1: Some(1),
        field3: Some(SubMessage { field: Some(9) }),
        ..Default::default()
    };

    let (result, rows) = parse(&parser, &message, None);

    assert_eq!(result, Ok(()));
    assert_eq!(
        rows,
        vec![
            row("field1", ArgValue::Int(1)),
            row("field3.field", ArgValue::String("value=9".into())),
        ]
    );
}

#[test]
fn test_handled_override_on_message_skips_recursion() {
    let pool = test_pool();
    let mut parser = ProtoToArgsParser::new(&pool);
    parser.add_parsing_override("field3", |_, _, _| OverrideOutcome::Handled);
    let message = MainMessage {
        field3: Some(SubMessage { field: Some(9) }),
        field2: Some("kept".to_string()),
        ..Default::default()
    };

    let (result, rows) = parse(&parser, &message, None);

    assert_eq!(result, Ok(()));
    assert_eq!(rows, vec![row("field2", ArgValue::String("kept".into()))]);
}

#[test]
fn test_declined_override_falls_back_to_generic_walk() {
    let pool = test_pool();
    let mut parser = ProtoToArgsParser::new(&pool);
    parser.add_parsing_override("field1", |field, scope, sink| {
        if field.as_varint() == Some(0) {
            sink.add_string(scope.key(), "zero");
            return OverrideOutcome::Handled;
        }
        OverrideOutcome::Declined
    });

    let (_, rows) = parse(
        &parser,
        &MainMessage {
            field1: Some(4),
            ..Default::default()
        },
        None,
    );
    assert_eq!(rows, vec![row("field1", ArgValue::Int(4))]);

    let (_, rows) = parse(
        &parser,
        &MainMessage {
            field1: Some(0),
            ..Default::default()
        },
        None,
    );
    assert_eq!(rows, vec![row("field1", ArgValue::String("zero".into()))]);
}

#[test]
fn test_failed_override_is_recorded() {
    let pool = test_pool();
    let mut parser = ProtoToArgsParser::new(&pool);
    parser.add_parsing_override("field2", |_, scope, _| {
        OverrideOutcome::Failed(ArgsError::override_failed(
            scope.key().flat_key.clone(),
            "rejected",
        ))
    });
    let message = MainMessage {
        field1: Some(1),
        field2: Some("x".to_string()),
        ..Default::default()
    };

    let (result, rows) = parse(&parser, &message, None);

    assert_eq!(result, Err(ArgsError::override_failed("field2", "rejected")));
    assert_eq!(rows, vec![row("field1", ArgValue::Int(1))]);
}

#[test]
fn test_override_applies_to_every_repeated_occurrence() {
    let pool = test_pool();
    let mut parser = ProtoToArgsParser::new(&pool);
    parser.add_parsing_override("items.x", |field, scope, sink| {
        let doubled = field.as_varint().unwrap_or_default() * 2;
        sink.add_unsigned_integer(scope.key(), doubled);
        OverrideOutcome::Handled
    });
    let message = MainMessage {
        items: vec![Item { x: Some(1) }, Item { x: Some(5) }],
        ..Default::default()
    };

    let (_, rows) = parse(&parser, &message, None);

    assert_eq!(
        rows,
        vec![
            row("items[0].x", ArgValue::Uint(2)),
            row("items[1].x", ArgValue::Uint(10)),
        ]
    );
}

#[test]
fn test_override_can_extend_key_scope() {
    let pool = test_pool();
    let mut parser = ProtoToArgsParser::new(&pool);
    parser.add_parsing_override("field2", |field, scope, sink| {
        let text = field.as_str_lossy().unwrap_or_default();
        for (index, part) in text.split(',').enumerate() {
            let mut parts = scope.enter_dictionary("parts");
            let entry = parts.enter_array(index);
            sink.add_string(entry.key(), part);
        }
        OverrideOutcome::Handled
    });
    let message = MainMessage {
        field2: Some("a,b".to_string()),
        field1: Some(1),
        ..Default::default()
    };

    let mut collector = ArgsCollector::new();
    parser
        .parse_message(
            &message.encode_to_vec(),
            "test.protos.MainMessage",
            None,
            &mut collector,
        )
        .unwrap();

    assert_eq!(
        collector.keys(),
        vec!["field1", "field2.parts[0]", "field2.parts[1]"]
    );
    assert_eq!(
        collector.values_for_flat_key("field2.parts"),
        vec![&ArgValue::String("a".into()), &ArgValue::String("b".into())]
    );
}

#[test]
fn test_later_override_replaces_earlier() {
    let pool = test_pool();
    let mut parser = ProtoToArgsParser::new(&pool);
    parser.add_parsing_override("field1", |_, scope, sink| {
        sink.add_string(scope.key(), "first");
        OverrideOutcome::Handled
    });
    parser.add_parsing_override("field1", |_, scope, sink| {
        sink.add_string(scope.key(), "second");
        OverrideOutcome::Handled
    });

    let (_, rows) = parse(
        &parser,
        &MainMessage {
            field1: Some(1),
            ..Default::default()
        },
        None,
    );

    assert_eq!(rows, vec![row("field1", ArgValue::String("second".into()))]);
}

// ============================================================================
// INTERNED REFERENCES
// ============================================================================

#[test]
fn test_interned_reference_is_expanded() {
    let pool = test_pool();
    let mut parser = ProtoToArgsParser::new(&pool);
    parser.add_interned_reference("location_iid", LOCATION_FIELD_ID, "test.protos.Location");

    let mut store = InternedDataStore::new();
    let location = Location {
        file_name: Some("main.rs".to_string()),
        line: Some(12),
    };
    store.insert(LOCATION_FIELD_ID, 3, location.encode_to_vec());

    let message = MainMessage {
        field1: Some(1),
        location_iid: Some(3),
        ..Default::default()
    };
    let mut collector = ArgsCollector::with_interned(&store);
    let result = parser.parse_message(
        &message.encode_to_vec(),
        "test.protos.MainMessage",
        None,
        &mut collector,
    );

    assert_eq!(result, Ok(()));
    assert_eq!(
        rows(&collector),
        vec![
            row("field1", ArgValue::Int(1)),
            row("location_iid.file_name", ArgValue::String("main.rs".into())),
            row("location_iid.line", ArgValue::Uint(12)),
        ]
    );
}

#[test]
fn test_missing_interned_entry_is_reported() {
    let pool = test_pool();
    let mut parser = ProtoToArgsParser::new(&pool);
    parser.add_interned_reference("location_iid", LOCATION_FIELD_ID, "test.protos.Location");
    let message = MainMessage {
        location_iid: Some(8),
        count: Some(1),
        ..Default::default()
    };

    let (result, rows) = parse(&parser, &message, None);

    assert_eq!(
        result,
        Err(ArgsError::InternedNotFound {
            key: "location_iid".to_string(),
            field_id: LOCATION_FIELD_ID,
            iid: 8,
        })
    );
    assert_eq!(rows, vec![row("count", ArgValue::Uint(1))]);
}
