//! JSON Schema derivation from protobuf message descriptors.
//!
//! For a message descriptor and an `openai` flag, produces a JSON Schema
//! object following the proto3 JSON mapping. The flag changes how `oneof`
//! groups, nullability, and `additionalProperties` are rendered: some
//! consumers reject `anyOf` and open objects, so OpenAI mode flattens
//! oneof members into nullable required properties and closes the object.
//!
//! Output is deterministic: fields follow descriptor order, enum lists keep
//! declaration order, oneof groups appear in declaration order, and the
//! serialized JSON carries lexicographically sorted keys.

use prost_reflect::{DescriptorPool, FieldDescriptor, Kind, MessageDescriptor, OneofDescriptor};
use serde_json::{json, Map, Value};

use super::options::{extract_validate_constraints, is_field_required};

/// Maps a protobuf scalar kind to a JSON Schema type string. 64-bit integers
/// serialize as decimal strings per the proto3 JSON rule.
fn kind_to_type(kind: &Kind) -> &'static str {
    match kind {
        Kind::Bool => "boolean",
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 | Kind::Uint32 | Kind::Fixed32 => "integer",
        Kind::Float | Kind::Double => "number",
        // string, bytes, enum, 64-bit integer variants
        _ => "string",
    }
}

/// Serializes the schema for `md` to a stable JSON string (sorted keys).
pub fn message_schema_json(pool: &DescriptorPool, md: &MessageDescriptor, openai: bool) -> String {
    serde_json::to_string(&message_schema(pool, md, openai))
        .unwrap_or_else(|_| "{}".to_string())
}

/// Converts a protobuf message descriptor into a JSON Schema value.
pub fn message_schema(pool: &DescriptorPool, md: &MessageDescriptor, openai: bool) -> Value {
    let mut props = Map::new();
    let mut required: Vec<String> = Vec::new();

    for fd in md.fields() {
        let name = fd.name().to_string();
        if let Some(oneof) = fd.containing_oneof() {
            if !is_synthetic_oneof(&oneof) {
                if openai {
                    let mut schema = field_schema(pool, &fd, openai);
                    if let Some(obj) = schema.as_object_mut() {
                        if let Some(Value::String(t)) = obj.get("type").cloned() {
                            obj.insert("type".to_string(), json!([t, "null"]));
                        }
                        obj.insert(
                            "description".to_string(),
                            json!(format!(
                                "Note: Part of the '{}' oneof group. Only one field in this group can be set. Setting multiple fields WILL result in an error.",
                                oneof.name()
                            )),
                        );
                    }
                    props.insert(name.clone(), schema);
                    required.push(name);
                }
                // Standard mode: oneof members appear only under anyOf below.
                continue;
            }
        }
        props.insert(name.clone(), field_schema(pool, &fd, openai));
        if is_field_required(pool, &fd) || openai {
            required.push(name);
        }
    }

    let mut result = Map::new();
    result.insert("type".to_string(), json!("object"));
    result.insert("properties".to_string(), Value::Object(props));
    result.insert("required".to_string(), json!(required));

    if !openai {
        let mut any_of: Vec<Value> = Vec::new();
        for oneof in md.oneofs() {
            if is_synthetic_oneof(&oneof) {
                continue;
            }
            let entries: Vec<Value> = oneof
                .fields()
                .map(|fd| {
                    let name = fd.name().to_string();
                    json!({
                        "properties": { name.clone(): field_schema(pool, &fd, openai) },
                        "required": [name],
                    })
                })
                .collect();
            if !entries.is_empty() {
                any_of.push(json!({
                    "oneOf": entries,
                    "$comment": "Protobuf oneOf group.",
                }));
            }
        }
        if !any_of.is_empty() {
            result.insert("anyOf".to_string(), Value::Array(any_of));
        }
    }

    if openai {
        result.insert("additionalProperties".to_string(), json!(false));
        if let Some(Value::String(t)) = result.get("type").cloned() {
            result.insert("type".to_string(), json!([t, "null"]));
        }
    }

    Value::Object(result)
}

/// As [`message_schema`], with a root `description` attached when non-empty.
pub fn message_schema_with_description(
    pool: &DescriptorPool,
    md: &MessageDescriptor,
    openai: bool,
    description: &str,
) -> Value {
    let mut schema = message_schema(pool, md, openai);
    if !description.is_empty() {
        if let Some(obj) = schema.as_object_mut() {
            obj.insert("description".to_string(), json!(description));
        }
    }
    schema
}

/// Converts a single protobuf field descriptor to a JSON Schema value.
fn field_schema(pool: &DescriptorPool, fd: &FieldDescriptor, openai: bool) -> Value {
    if fd.is_map() {
        return map_schema(pool, fd, openai);
    }
    let mut schema = match fd.kind() {
        Kind::Message(md) => message_field_schema(pool, &md, openai),
        Kind::Enum(ed) => {
            let vals: Vec<String> = ed.values().map(|v| v.name().to_string()).collect();
            json!({ "type": "string", "enum": vals })
        }
        kind => scalar_schema(&kind, openai),
    };
    if let Some(obj) = schema.as_object_mut() {
        for (k, v) in extract_validate_constraints(pool, fd) {
            obj.insert(k, v);
        }
    }
    if fd.is_list() {
        return json!({ "type": "array", "items": schema });
    }
    schema
}

/// Returns a JSON Schema for a protobuf scalar field.
fn scalar_schema(kind: &Kind, openai: bool) -> Value {
    let mut s = Map::new();
    s.insert("type".to_string(), json!(kind_to_type(kind)));
    if matches!(kind, Kind::Bytes) {
        s.insert("contentEncoding".to_string(), json!("base64"));
        if !openai {
            s.insert("format".to_string(), json!("byte"));
        }
    }
    Value::Object(s)
}

/// Handles protobuf `map<K,V>` fields. Standard mode constrains
/// `propertyNames` by the key kind; OpenAI mode renders a key/value pair list
/// because open objects are rejected there.
fn map_schema(pool: &DescriptorPool, fd: &FieldDescriptor, openai: bool) -> Value {
    let Kind::Message(entry) = fd.kind() else {
        return json!({ "type": "object" });
    };
    let key = entry.map_entry_key_field();
    let value = entry.map_entry_value_field();

    if openai {
        let value_type = field_schema(pool, &value, openai)
            .get("type")
            .cloned()
            .unwrap_or(Value::Null);
        return json!({
            "type": "array",
            "description": "List of key-value pairs",
            "items": {
                "type": "object",
                "properties": {
                    "key": { "type": "string" },
                    "value": { "type": value_type },
                },
                "required": ["key", "value"],
                "additionalProperties": false,
            },
        });
    }

    let mut key_constraints = Map::new();
    key_constraints.insert("type".to_string(), json!("string"));
    match key.kind() {
        Kind::Bool => {
            key_constraints.insert("enum".to_string(), json!(["true", "false"]));
        }
        Kind::Uint32 | Kind::Fixed32 | Kind::Uint64 | Kind::Fixed64 => {
            key_constraints.insert("pattern".to_string(), json!(r"^(0|[1-9]\d*)$"));
        }
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 | Kind::Int64 | Kind::Sint64
        | Kind::Sfixed64 => {
            key_constraints.insert("pattern".to_string(), json!(r"^-?(0|[1-9]\d*)$"));
        }
        _ => {}
    }

    json!({
        "type": "object",
        "propertyNames": key_constraints,
        "additionalProperties": field_schema(pool, &value, openai),
    })
}

/// Handles message-typed fields including the well-known types.
fn message_field_schema(pool: &DescriptorPool, md: &MessageDescriptor, openai: bool) -> Value {
    match md.full_name() {
        "google.protobuf.Timestamp" => json!({ "type": ["string", "null"], "format": "date-time" }),
        "google.protobuf.Duration" => {
            json!({ "type": ["string", "null"], "pattern": r"^-?[0-9]+(\.[0-9]+)?s$" })
        }
        "google.protobuf.Struct" => {
            if openai {
                json!({ "type": "string", "description": "JSON-encoded object (google.protobuf.Struct)." })
            } else {
                json!({ "type": "object", "additionalProperties": true })
            }
        }
        "google.protobuf.Value" => {
            if openai {
                json!({ "type": "string", "description": "JSON-encoded value (google.protobuf.Value)." })
            } else {
                json!({ "description": "Dynamic JSON value (google.protobuf.Value)." })
            }
        }
        "google.protobuf.ListValue" => {
            if openai {
                json!({ "type": "string", "description": "JSON-encoded array (google.protobuf.ListValue)." })
            } else {
                json!({
                    "type": "array",
                    "description": "JSON array of values (google.protobuf.ListValue).",
                    "items": {},
                })
            }
        }
        "google.protobuf.FieldMask" => {
            if openai {
                json!({ "type": ["string", "null"] })
            } else {
                json!({ "type": "string" })
            }
        }
        "google.protobuf.Any" => {
            let mut s = json!({
                "type": "object",
                "properties": { "@type": { "type": "string" }, "value": {} },
                "required": ["@type"],
            });
            if !openai {
                s["type"] = json!(["object", "null"]);
            }
            s
        }
        "google.protobuf.DoubleValue"
        | "google.protobuf.FloatValue"
        | "google.protobuf.Int32Value"
        | "google.protobuf.UInt32Value" => json!({ "type": "number", "nullable": true }),
        // 64-bit wrappers serialize as decimal strings.
        "google.protobuf.Int64Value" | "google.protobuf.UInt64Value" => {
            json!({ "type": "string", "nullable": true })
        }
        "google.protobuf.StringValue" => json!({ "type": "string", "nullable": true }),
        "google.protobuf.BoolValue" => json!({ "type": "boolean", "nullable": true }),
        "google.protobuf.BytesValue" => {
            let mut s = json!({ "type": "string", "nullable": true });
            if !openai {
                s["format"] = json!("byte");
            }
            s
        }
        _ => message_schema(pool, md, openai),
    }
}

/// A synthetic oneof is the single-member group proto3 `optional` desugars
/// into; it is not a user-declared choice.
fn is_synthetic_oneof(oneof: &OneofDescriptor) -> bool {
    let mut fields = oneof.fields();
    match (fields.next(), fields.next()) {
        (Some(fd), None) => fd.field_descriptor_proto().proto3_optional(),
        _ => false,
    }
}
