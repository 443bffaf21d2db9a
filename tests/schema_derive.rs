//! JSON Schema derivation over programmatically built descriptor pools.

mod common;

use common::*;
use grpc_mcp_gateway::generator::schema::{message_schema, message_schema_json};
use prost::Message;
use prost_reflect::DescriptorPool;
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    MessageOptions,
};
use serde_json::json;

fn schema_of(pool: &DescriptorPool, fqn: &str, openai: bool) -> serde_json::Value {
    let md = pool.get_message_by_name(fqn).expect("message in pool");
    message_schema(pool, &md, openai)
}

fn schema_json_of(pool: &DescriptorPool, fqn: &str, openai: bool) -> String {
    let md = pool.get_message_by_name(fqn).expect("message in pool");
    message_schema_json(pool, &md, openai)
}

#[test]
fn empty_message_shape() {
    let mut pool = base_pool();
    add_file(&mut pool, file("test/empty.proto", "test.v1", vec![message("Empty", vec![])], vec![]));

    assert_eq!(
        schema_json_of(&pool, "test.v1.Empty", false),
        r#"{"properties":{},"required":[],"type":"object"}"#
    );
}

#[test]
fn scalar_fields() {
    let mut pool = base_pool();
    add_file(
        &mut pool,
        file(
            "test/scalars.proto",
            "test.v1",
            vec![message(
                "Scalars",
                vec![
                    field("flag", 1, Type::Bool),
                    field("count", 2, Type::Int32),
                    field("big", 3, Type::Int64),
                    field("unsigned_big", 4, Type::Uint64),
                    field("ratio", 5, Type::Double),
                    field("label", 6, Type::String),
                    field("blob", 7, Type::Bytes),
                ],
            )],
            vec![],
        ),
    );

    let schema = schema_of(&pool, "test.v1.Scalars", false);
    let props = &schema["properties"];
    assert_eq!(props["flag"]["type"], "boolean");
    assert_eq!(props["count"]["type"], "integer");
    // 64-bit integers serialize as decimal strings per the proto3 JSON rule.
    assert_eq!(props["big"]["type"], "string");
    assert_eq!(props["unsigned_big"]["type"], "string");
    assert_eq!(props["ratio"]["type"], "number");
    assert_eq!(props["label"]["type"], "string");
    assert_eq!(props["blob"]["type"], "string");
    assert_eq!(props["blob"]["contentEncoding"], "base64");
    assert_eq!(props["blob"]["format"], "byte");
}

#[test]
fn repeated_field_wraps_items() {
    let mut pool = base_pool();
    add_file(
        &mut pool,
        file(
            "test/list.proto",
            "test.v1",
            vec![message("List", vec![repeated(field("tags", 1, Type::String))])],
            vec![],
        ),
    );

    let schema = schema_of(&pool, "test.v1.List", false);
    assert_eq!(
        schema["properties"]["tags"],
        json!({ "type": "array", "items": { "type": "string" } })
    );
}

#[test]
fn enum_field_preserves_declared_values() {
    let mut pool = base_pool();
    let priority = EnumDescriptorProto {
        name: Some("Priority".to_string()),
        value: [
            ("PRIORITY_UNSPECIFIED", 0),
            ("PRIORITY_LOW", 1),
            ("PRIORITY_HIGH", 2),
        ]
        .iter()
        .map(|(name, number)| EnumValueDescriptorProto {
            name: Some(name.to_string()),
            number: Some(*number),
            ..Default::default()
        })
        .collect(),
        ..Default::default()
    };
    let fd = prost_types::FileDescriptorProto {
        enum_type: vec![priority],
        ..file(
            "test/enum.proto",
            "test.v1",
            vec![message(
                "Task",
                vec![enum_field("priority", 1, ".test.v1.Priority")],
            )],
            vec![],
        )
    };
    add_file(&mut pool, fd);

    let schema = schema_of(&pool, "test.v1.Task", false);
    assert_eq!(
        schema["properties"]["priority"],
        json!({
            "type": "string",
            "enum": ["PRIORITY_UNSPECIFIED", "PRIORITY_LOW", "PRIORITY_HIGH"],
        })
    );
}

fn map_file(key_type: Type) -> prost_types::FileDescriptorProto {
    // map<K, string> labels = 1; desugars into a repeated nested MapEntry.
    let entry = DescriptorProto {
        name: Some("LabelsEntry".to_string()),
        field: vec![field("key", 1, key_type), field("value", 2, Type::String)],
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    };
    let holder = DescriptorProto {
        nested_type: vec![entry],
        ..message(
            "Holder",
            vec![repeated(message_field("labels", 1, ".test.v1.Holder.LabelsEntry"))],
        )
    };
    file("test/map.proto", "test.v1", vec![holder], vec![])
}

#[test]
fn map_with_bool_key() {
    let mut pool = base_pool();
    add_file(&mut pool, map_file(Type::Bool));

    let schema = schema_of(&pool, "test.v1.Holder", false);
    let labels = &schema["properties"]["labels"];
    assert_eq!(labels["type"], "object");
    assert_eq!(labels["propertyNames"]["enum"], json!(["true", "false"]));
    assert_eq!(labels["additionalProperties"], json!({ "type": "string" }));
}

#[test]
fn map_key_patterns() {
    let mut pool = base_pool();
    add_file(&mut pool, map_file(Type::Uint64));
    let schema = schema_of(&pool, "test.v1.Holder", false);
    assert_eq!(
        schema["properties"]["labels"]["propertyNames"]["pattern"],
        r"^(0|[1-9]\d*)$"
    );

    let mut pool = base_pool();
    add_file(&mut pool, map_file(Type::Sint32));
    let schema = schema_of(&pool, "test.v1.Holder", false);
    assert_eq!(
        schema["properties"]["labels"]["propertyNames"]["pattern"],
        r"^-?(0|[1-9]\d*)$"
    );
}

#[test]
fn map_in_openai_mode_is_pair_list() {
    let mut pool = base_pool();
    add_file(&mut pool, map_file(Type::String));

    let schema = schema_of(&pool, "test.v1.Holder", true);
    let labels = &schema["properties"]["labels"];
    assert_eq!(labels["type"], "array");
    assert_eq!(labels["items"]["required"], json!(["key", "value"]));
    assert_eq!(labels["items"]["additionalProperties"], json!(false));
}

fn oneof_file() -> prost_types::FileDescriptorProto {
    let chunk = DescriptorProto {
        oneof_decl: vec![oneof("payload")],
        ..message(
            "Chunk",
            vec![
                in_oneof(field("text", 1, Type::String), 0),
                in_oneof(field("count", 2, Type::Int32), 0),
            ],
        )
    };
    file("test/oneof.proto", "test.v1", vec![chunk], vec![])
}

#[test]
fn oneof_standard_mode_uses_any_of() {
    let mut pool = base_pool();
    add_file(&mut pool, oneof_file());

    let schema = schema_of(&pool, "test.v1.Chunk", false);
    // Members appear only under anyOf.
    assert_eq!(schema["properties"], json!({}));
    let any_of = schema["anyOf"].as_array().expect("anyOf present");
    assert_eq!(any_of.len(), 1);
    let one_of = any_of[0]["oneOf"].as_array().expect("oneOf entries");
    assert_eq!(one_of.len(), 2);
    assert_eq!(one_of[0]["required"], json!(["text"]));
    assert_eq!(one_of[1]["required"], json!(["count"]));
    assert_eq!(any_of[0]["$comment"], "Protobuf oneOf group.");
}

#[test]
fn oneof_openai_mode_flattens_members() {
    let mut pool = base_pool();
    add_file(&mut pool, oneof_file());

    let schema = schema_of(&pool, "test.v1.Chunk", true);
    assert!(schema.get("anyOf").is_none());
    assert_eq!(schema["type"], json!(["object", "null"]));
    assert_eq!(schema["additionalProperties"], json!(false));
    assert_eq!(schema["required"], json!(["text", "count"]));
    assert_eq!(schema["properties"]["text"]["type"], json!(["string", "null"]));
    assert_eq!(
        schema["properties"]["count"]["type"],
        json!(["integer", "null"])
    );
    let note = schema["properties"]["text"]["description"]
        .as_str()
        .expect("oneof note");
    assert!(note.contains("'payload' oneof group"));
}

#[test]
fn proto3_optional_is_not_a_oneof_group() {
    let mut pool = base_pool();
    let holder = DescriptorProto {
        oneof_decl: vec![oneof("_nickname")],
        ..message(
            "Profile",
            vec![FieldDescriptorProto {
                proto3_optional: Some(true),
                oneof_index: Some(0),
                ..field("nickname", 1, Type::String)
            }],
        )
    };
    add_file(
        &mut pool,
        file("test/optional.proto", "test.v1", vec![holder], vec![]),
    );

    let schema = schema_of(&pool, "test.v1.Profile", false);
    assert!(schema.get("anyOf").is_none());
    assert_eq!(schema["properties"]["nickname"]["type"], "string");
}

#[test]
fn well_known_types() {
    let mut pool = base_pool();
    let fd = prost_types::FileDescriptorProto {
        dependency: vec![
            "google/protobuf/timestamp.proto".to_string(),
            "google/protobuf/duration.proto".to_string(),
            "google/protobuf/struct.proto".to_string(),
            "google/protobuf/wrappers.proto".to_string(),
            "google/protobuf/field_mask.proto".to_string(),
        ],
        ..file(
            "test/wkt.proto",
            "test.v1",
            vec![message(
                "Wkt",
                vec![
                    message_field("created", 1, ".google.protobuf.Timestamp"),
                    message_field("ttl", 2, ".google.protobuf.Duration"),
                    message_field("extra", 3, ".google.protobuf.Struct"),
                    message_field("any_value", 4, ".google.protobuf.Value"),
                    message_field("big", 5, ".google.protobuf.Int64Value"),
                    message_field("flag", 6, ".google.protobuf.BoolValue"),
                    message_field("mask", 7, ".google.protobuf.FieldMask"),
                ],
            )],
            vec![],
        )
    };
    add_file(&mut pool, fd);

    let schema = schema_of(&pool, "test.v1.Wkt", false);
    let props = &schema["properties"];
    assert_eq!(
        props["created"],
        json!({ "type": ["string", "null"], "format": "date-time" })
    );
    assert_eq!(props["ttl"]["pattern"], r"^-?[0-9]+(\.[0-9]+)?s$");
    assert_eq!(props["extra"], json!({ "type": "object", "additionalProperties": true }));
    assert!(props["any_value"].get("type").is_none());
    assert_eq!(props["big"], json!({ "type": "string", "nullable": true }));
    assert_eq!(props["flag"], json!({ "type": "boolean", "nullable": true }));
    assert_eq!(props["mask"], json!({ "type": "string" }));

    // OpenAI mode re-renders the dynamic types as JSON-encoded strings.
    let schema = schema_of(&pool, "test.v1.Wkt", true);
    let props = &schema["properties"];
    assert_eq!(props["extra"]["type"], "string");
    assert_eq!(props["any_value"]["type"], "string");
}

#[test]
fn create_todo_request_shape() {
    let mut pool = base_pool();

    // Todo message plus CreateTodoRequest with a REQUIRED parent field; the
    // field_behavior option value requires the raw encoding path.
    add_file(
        &mut pool,
        file(
            "test/todo.proto",
            "test.v1",
            vec![message(
                "Todo",
                vec![field("name", 1, Type::String), field("title", 2, Type::String)],
            )],
            vec![],
        ),
    );
    add_raw_file(
        &mut pool,
        RawFile {
            name: Some("test/todo_service.proto".to_string()),
            package: Some("test.v1".to_string()),
            dependency: vec![
                "test/todo.proto".to_string(),
                "google/api/field_behavior.proto".to_string(),
            ],
            message_type: vec![RawMessage {
                name: Some("CreateTodoRequest".to_string()),
                field: vec![
                    raw_field("parent", 1, Type::String, Some(required_field_options())),
                    raw_field("todo_id", 2, Type::String, None),
                    raw_message_field("todo", 3, ".test.v1.Todo"),
                ],
                ..Default::default()
            }
            .encode_to_vec()],
            ..Default::default()
        },
    );

    let schema = schema_of(&pool, "test.v1.CreateTodoRequest", false);
    assert_eq!(schema["required"], json!(["parent"]));
    assert_eq!(schema["properties"]["parent"], json!({ "type": "string" }));
    assert_eq!(schema["properties"]["todo_id"], json!({ "type": "string" }));
    assert_eq!(schema["properties"]["todo"]["type"], "object");

    // Stable key order after sort.
    let serialized = schema_json_of(&pool, "test.v1.CreateTodoRequest", false);
    assert!(serialized.starts_with(r#"{"properties":"#));
}

#[test]
fn buf_validate_constraints_applied() {
    let mut pool = base_pool();

    let string_rules = ValidateOptions {
        field: Some(ValidateFieldRules {
            string: Some(ValidateStringRules {
                min_len: Some(1),
                max_len: Some(63),
                pattern: Some("^[a-z][a-z0-9-]*$".to_string()),
                uuid: None,
                email: None,
            }),
            int32: None,
        }),
    };
    let int_rules = ValidateOptions {
        field: Some(ValidateFieldRules {
            int32: Some(ValidateInt32Rules {
                gt: Some(0),
                lt: Some(100),
                gte: None,
                lte: None,
            }),
            string: None,
        }),
    };

    add_raw_file(
        &mut pool,
        RawFile {
            name: Some("test/validated.proto".to_string()),
            package: Some("test.v1".to_string()),
            dependency: vec!["buf/validate/validate.proto".to_string()],
            message_type: vec![RawMessage {
                name: Some("Validated".to_string()),
                field: vec![
                    raw_field("slug", 1, Type::String, Some(string_rules.encode_to_vec())),
                    raw_field("limit", 2, Type::Int32, Some(int_rules.encode_to_vec())),
                ],
                ..Default::default()
            }
            .encode_to_vec()],
            ..Default::default()
        },
    );

    let schema = schema_of(&pool, "test.v1.Validated", false);
    let slug = &schema["properties"]["slug"];
    assert_eq!(slug["minLength"], 1);
    assert_eq!(slug["maxLength"], 63);
    assert_eq!(slug["pattern"], "^[a-z][a-z0-9-]*$");

    // Open bounds are tightened: gt 0 -> minimum 1, lt 100 -> maximum 99.
    let limit = &schema["properties"]["limit"];
    assert_eq!(limit["minimum"], 1);
    assert_eq!(limit["maximum"], 99);
}

#[test]
fn schema_is_deterministic() {
    let build = || {
        let mut pool = base_pool();
        add_file(&mut pool, oneof_file());
        add_file(&mut pool, map_file(Type::Bool));
        (
            schema_json_of(&pool, "test.v1.Chunk", false),
            schema_json_of(&pool, "test.v1.Holder", false),
        )
    };
    // Two independent runs over the same descriptors are byte-identical.
    assert_eq!(build(), build());
}

#[test]
fn schema_round_trips_through_json() {
    let mut pool = base_pool();
    add_file(&mut pool, oneof_file());

    let serialized = schema_json_of(&pool, "test.v1.Chunk", false);
    let value: serde_json::Value = serde_json::from_str(&serialized).unwrap();
    assert_eq!(serde_json::to_string(&value).unwrap(), serialized);
}
