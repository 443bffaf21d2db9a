//! Test support: descriptor pools built programmatically.
//!
//! Most descriptors are assembled from typed `prost_types` values. Option
//! extension *values* (field_behavior, buf.validate, mcp.protobuf.*) cannot
//! be expressed through the typed structs, so the files carrying them are
//! encoded through raw mirrors whose `options` fields are plain bytes; the
//! payloads are produced by small extension mirrors below.

#![allow(dead_code)]

use prost::Message;
use prost_reflect::DescriptorPool;
use prost_types::{
    field_descriptor_proto, DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto,
    FieldDescriptorProto, FileDescriptorProto, MethodDescriptorProto, OneofDescriptorProto,
    ServiceDescriptorProto, SourceCodeInfo,
};

pub use field_descriptor_proto::Label;
pub use field_descriptor_proto::Type;

// ---------------------------------------------------------------------------
// Typed builders
// ---------------------------------------------------------------------------

pub fn field(name: &str, number: i32, r#type: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(r#type as i32),
        ..Default::default()
    }
}

pub fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..field(name, number, Type::Message)
    }
}

pub fn enum_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..field(name, number, Type::Enum)
    }
}

pub fn repeated(mut fd: FieldDescriptorProto) -> FieldDescriptorProto {
    fd.label = Some(Label::Repeated as i32);
    fd
}

pub fn in_oneof(mut fd: FieldDescriptorProto, index: i32) -> FieldDescriptorProto {
    fd.oneof_index = Some(index);
    fd
}

pub fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

pub fn oneof(name: &str) -> OneofDescriptorProto {
    OneofDescriptorProto {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

pub fn unary_method(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        ..Default::default()
    }
}

pub fn server_streaming_method(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        server_streaming: Some(true),
        ..unary_method(name, input, output)
    }
}

pub fn file(
    name: &str,
    package: &str,
    messages: Vec<DescriptorProto>,
    services: Vec<ServiceDescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: Some(package.to_string()),
        message_type: messages,
        service: services,
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Extension declarations (typed; values are injected through raw mirrors)
// ---------------------------------------------------------------------------

/// `google/api/field_behavior.proto`: the FieldBehavior enum and its
/// extension on FieldOptions (number 1052).
pub fn google_field_behavior_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("google/api/field_behavior.proto".to_string()),
        package: Some("google.api".to_string()),
        dependency: vec!["google/protobuf/descriptor.proto".to_string()],
        enum_type: vec![EnumDescriptorProto {
            name: Some("FieldBehavior".to_string()),
            value: [
                ("FIELD_BEHAVIOR_UNSPECIFIED", 0),
                ("OPTIONAL", 1),
                ("REQUIRED", 2),
                ("OUTPUT_ONLY", 3),
            ]
            .iter()
            .map(|(name, number)| EnumValueDescriptorProto {
                name: Some(name.to_string()),
                number: Some(*number),
                ..Default::default()
            })
            .collect(),
            ..Default::default()
        }],
        extension: vec![FieldDescriptorProto {
            name: Some("field_behavior".to_string()),
            number: Some(1052),
            label: Some(Label::Repeated as i32),
            r#type: Some(Type::Enum as i32),
            type_name: Some(".google.api.FieldBehavior".to_string()),
            extendee: Some(".google.protobuf.FieldOptions".to_string()),
            ..Default::default()
        }],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

/// Minimal `buf/validate/validate.proto`: FieldRules with string/int rules
/// and the `buf.validate.field` extension on FieldOptions (number 1159).
pub fn buf_validate_file() -> FileDescriptorProto {
    let string_rules = message(
        "StringRules",
        vec![
            FieldDescriptorProto {
                name: Some("min_len".to_string()),
                number: Some(2),
                label: Some(Label::Optional as i32),
                r#type: Some(Type::Uint64 as i32),
                ..Default::default()
            },
            FieldDescriptorProto {
                name: Some("max_len".to_string()),
                number: Some(3),
                label: Some(Label::Optional as i32),
                r#type: Some(Type::Uint64 as i32),
                ..Default::default()
            },
            field("pattern", 6, Type::String),
            field("email", 12, Type::Bool),
            field("uuid", 22, Type::Bool),
        ],
    );
    let int32_rules = message(
        "Int32Rules",
        vec![
            field("lt", 2, Type::Int32),
            field("lte", 3, Type::Int32),
            field("gt", 4, Type::Int32),
            field("gte", 5, Type::Int32),
        ],
    );
    let int64_rules = message(
        "Int64Rules",
        vec![
            field("lt", 2, Type::Int64),
            field("lte", 3, Type::Int64),
            field("gt", 4, Type::Int64),
            field("gte", 5, Type::Int64),
        ],
    );
    let field_rules = message(
        "FieldRules",
        vec![
            message_field("int32", 3, ".buf.validate.Int32Rules"),
            message_field("int64", 4, ".buf.validate.Int64Rules"),
            message_field("string", 14, ".buf.validate.StringRules"),
        ],
    );

    FileDescriptorProto {
        name: Some("buf/validate/validate.proto".to_string()),
        package: Some("buf.validate".to_string()),
        dependency: vec!["google/protobuf/descriptor.proto".to_string()],
        message_type: vec![field_rules, string_rules, int32_rules, int64_rules],
        extension: vec![FieldDescriptorProto {
            name: Some("field".to_string()),
            number: Some(1159),
            label: Some(Label::Optional as i32),
            r#type: Some(Type::Message as i32),
            type_name: Some(".buf.validate.FieldRules".to_string()),
            extendee: Some(".google.protobuf.FieldOptions".to_string()),
            ..Default::default()
        }],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

/// `mcp/protobuf/mcp.proto`: MCPProgress and the mcp.protobuf.* extensions.
pub fn mcp_options_file() -> FileDescriptorProto {
    let progress = message(
        "MCPProgress",
        vec![
            field("progress", 1, Type::Double),
            FieldDescriptorProto {
                proto3_optional: Some(true),
                oneof_index: Some(0),
                ..field("total", 2, Type::Double)
            },
            field("message", 3, Type::String),
        ],
    );
    let progress = DescriptorProto {
        oneof_decl: vec![oneof("_total")],
        ..progress
    };
    let tool_options = message(
        "MCPToolOptions",
        vec![field("name", 1, Type::String), field("description", 2, Type::String)],
    );
    let prompt = message(
        "MCPPrompt",
        vec![
            field("name", 1, Type::String),
            field("description", 2, Type::String),
            field("schema", 3, Type::String),
        ],
    );
    let elicitation = message(
        "MCPElicitation",
        vec![field("message", 1, Type::String), field("schema", 2, Type::String)],
    );
    let app = message(
        "MCPApp",
        vec![
            field("name", 1, Type::String),
            field("version", 2, Type::String),
            field("description", 3, Type::String),
        ],
    );
    let service_options = message(
        "MCPServiceOptions",
        vec![message_field("app", 1, ".mcp.protobuf.MCPApp")],
    );

    let ext = |name: &str, number: i32, type_name: &str, extendee: &str| FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(Type::Message as i32),
        type_name: Some(type_name.to_string()),
        extendee: Some(extendee.to_string()),
        ..Default::default()
    };

    FileDescriptorProto {
        name: Some("mcp/protobuf/mcp.proto".to_string()),
        package: Some("mcp.protobuf".to_string()),
        dependency: vec!["google/protobuf/descriptor.proto".to_string()],
        message_type: vec![progress, tool_options, prompt, elicitation, app, service_options],
        extension: vec![
            ext(
                "service",
                51200,
                ".mcp.protobuf.MCPServiceOptions",
                ".google.protobuf.ServiceOptions",
            ),
            ext(
                "tool",
                51201,
                ".mcp.protobuf.MCPToolOptions",
                ".google.protobuf.MethodOptions",
            ),
            ext(
                "prompt",
                51202,
                ".mcp.protobuf.MCPPrompt",
                ".google.protobuf.MethodOptions",
            ),
            ext(
                "elicitation",
                51203,
                ".mcp.protobuf.MCPElicitation",
                ".google.protobuf.MethodOptions",
            ),
        ],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Raw mirrors: FileDescriptorProto with options carried as opaque bytes,
// letting tests inject extension values the typed structs cannot express.
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawFile {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub package: Option<String>,
    #[prost(string, repeated, tag = "3")]
    pub dependency: Vec<String>,
    #[prost(bytes, repeated, tag = "4")]
    pub message_type: Vec<Vec<u8>>,
    #[prost(bytes, repeated, tag = "6")]
    pub service: Vec<Vec<u8>>,
    #[prost(bytes, optional, tag = "9")]
    pub source_code_info: Option<Vec<u8>>,
    #[prost(string, optional, tag = "12")]
    pub syntax: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawMessage {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(bytes, repeated, tag = "2")]
    pub field: Vec<Vec<u8>>,
    #[prost(bytes, repeated, tag = "8")]
    pub oneof_decl: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawField {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(int32, optional, tag = "3")]
    pub number: Option<i32>,
    #[prost(int32, optional, tag = "4")]
    pub label: Option<i32>,
    #[prost(int32, optional, tag = "5")]
    pub r#type: Option<i32>,
    #[prost(string, optional, tag = "6")]
    pub type_name: Option<String>,
    #[prost(bytes, optional, tag = "8")]
    pub options: Option<Vec<u8>>,
    #[prost(int32, optional, tag = "9")]
    pub oneof_index: Option<i32>,
    #[prost(bool, optional, tag = "17")]
    pub proto3_optional: Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawService {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(bytes, repeated, tag = "2")]
    pub method: Vec<Vec<u8>>,
    #[prost(bytes, optional, tag = "3")]
    pub options: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RawMethod {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub input_type: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub output_type: Option<String>,
    #[prost(bytes, optional, tag = "4")]
    pub options: Option<Vec<u8>>,
    #[prost(bool, optional, tag = "5")]
    pub client_streaming: Option<bool>,
    #[prost(bool, optional, tag = "6")]
    pub server_streaming: Option<bool>,
}

/// FieldOptions carrying `google.api.field_behavior` values.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FieldBehaviorOptions {
    #[prost(int32, repeated, packed = "false", tag = "1052")]
    pub field_behavior: Vec<i32>,
}

/// FieldOptions carrying `buf.validate.field` rules, encoded from loose
/// string/int mirrors.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateOptions {
    #[prost(message, optional, tag = "1159")]
    pub field: Option<ValidateFieldRules>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateFieldRules {
    #[prost(message, optional, tag = "3")]
    pub int32: Option<ValidateInt32Rules>,
    #[prost(message, optional, tag = "14")]
    pub string: Option<ValidateStringRules>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateStringRules {
    #[prost(uint64, optional, tag = "2")]
    pub min_len: Option<u64>,
    #[prost(uint64, optional, tag = "3")]
    pub max_len: Option<u64>,
    #[prost(string, optional, tag = "6")]
    pub pattern: Option<String>,
    #[prost(bool, optional, tag = "12")]
    pub email: Option<bool>,
    #[prost(bool, optional, tag = "22")]
    pub uuid: Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateInt32Rules {
    #[prost(int32, optional, tag = "2")]
    pub lt: Option<i32>,
    #[prost(int32, optional, tag = "3")]
    pub lte: Option<i32>,
    #[prost(int32, optional, tag = "4")]
    pub gt: Option<i32>,
    #[prost(int32, optional, tag = "5")]
    pub gte: Option<i32>,
}

/// MethodOptions carrying `mcp.protobuf.tool`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ToolMethodOptions {
    #[prost(message, optional, tag = "51201")]
    pub tool: Option<grpc_mcp_gateway::mcppb::McpToolOptions>,
}

/// FieldOptions bytes marking a field REQUIRED.
pub fn required_field_options() -> Vec<u8> {
    FieldBehaviorOptions {
        field_behavior: vec![2],
    }
    .encode_to_vec()
}

pub fn raw_field(name: &str, number: i32, r#type: Type, options: Option<Vec<u8>>) -> Vec<u8> {
    RawField {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(r#type as i32),
        options,
        ..Default::default()
    }
    .encode_to_vec()
}

pub fn raw_message_field(name: &str, number: i32, type_name: &str) -> Vec<u8> {
    RawField {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(Type::Message as i32),
        type_name: Some(type_name.to_string()),
        ..Default::default()
    }
    .encode_to_vec()
}

// ---------------------------------------------------------------------------
// Pools
// ---------------------------------------------------------------------------

/// A pool seeded with the well-known types plus the extension declaration
/// files above.
pub fn base_pool() -> DescriptorPool {
    let mut pool = DescriptorPool::global();
    pool.add_file_descriptor_proto(google_field_behavior_file())
        .expect("add field_behavior file");
    pool.add_file_descriptor_proto(buf_validate_file())
        .expect("add buf.validate file");
    pool.add_file_descriptor_proto(mcp_options_file())
        .expect("add mcp options file");
    pool
}

/// Adds a typed file to the pool.
pub fn add_file(pool: &mut DescriptorPool, fd: FileDescriptorProto) {
    pool.add_file_descriptor_proto(fd).expect("add file");
}

#[derive(Clone, PartialEq, ::prost::Message)]
struct RawFileSet {
    #[prost(bytes, repeated, tag = "1")]
    file: Vec<Vec<u8>>,
}

/// Adds a raw-encoded file to the pool through the bytes path, which
/// preserves extension option values a typed decode would drop.
pub fn add_raw_file(pool: &mut DescriptorPool, raw: RawFile) {
    let set = RawFileSet {
        file: vec![raw.encode_to_vec()],
    };
    pool.decode_file_descriptor_set(set.encode_to_vec().as_slice())
        .expect("add raw file");
}

/// Typed source info helper: a single location with a leading comment.
pub fn source_info(path: Vec<i32>, leading: &str) -> SourceCodeInfo {
    SourceCodeInfo {
        location: vec![prost_types::source_code_info::Location {
            path,
            leading_comments: Some(leading.to_string()),
            ..Default::default()
        }],
    }
}
