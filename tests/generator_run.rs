//! End-to-end plugin runs: encoded CodeGeneratorRequest in, response files out.

mod common;

use common::*;
use prost::Message;
use prost_reflect::DescriptorPool;
use prost_types::{DescriptorProto, ServiceDescriptorProto};

use grpc_mcp_gateway::plugin;

/// CodeGeneratorRequest mirror with raw file bytes, so option extension
/// values survive into the plugin's descriptor pool.
#[derive(Clone, PartialEq, ::prost::Message)]
struct RawRequest {
    #[prost(string, repeated, tag = "1")]
    file_to_generate: Vec<String>,
    #[prost(string, optional, tag = "2")]
    parameter: Option<String>,
    #[prost(bytes, repeated, tag = "15")]
    proto_file: Vec<Vec<u8>>,
}

/// Serialized descriptor for a file baked into the prost-reflect global pool
/// (descriptor.proto and friends); protoc would pass these as dependencies.
fn global_file_bytes(name: &str) -> Vec<u8> {
    DescriptorPool::global()
        .get_file_by_name(name)
        .unwrap_or_else(|| panic!("{name} in global pool"))
        .file_descriptor_proto()
        .encode_to_vec()
}

fn clock_file() -> Vec<u8> {
    file(
        "store/apps/utilities/clock/v1/clock_service.proto",
        "store.apps.utilities.clock.v1",
        vec![
            message("ConvertTimeRequest", vec![field("time", 1, Type::String)]),
            message("ConvertTimeResponse", vec![field("time", 1, Type::String)]),
        ],
        vec![ServiceDescriptorProto {
            name: Some("ClockService".to_string()),
            method: vec![unary_method(
                "ConvertTime",
                ".store.apps.utilities.clock.v1.ConvertTimeRequest",
                ".store.apps.utilities.clock.v1.ConvertTimeResponse",
            )],
            ..Default::default()
        }],
    )
    .encode_to_vec()
}

fn counter_file() -> Vec<u8> {
    let chunk = DescriptorProto {
        oneof_decl: vec![oneof("payload")],
        ..message(
            "CountStreamChunk",
            vec![
                in_oneof(
                    message_field("progress", 1, ".mcp.protobuf.MCPProgress"),
                    0,
                ),
                in_oneof(message_field("result", 2, ".counter.v1.CountResponse"), 0),
            ],
        )
    };
    let fd = prost_types::FileDescriptorProto {
        dependency: vec!["mcp/protobuf/mcp.proto".to_string()],
        ..file(
            "counter/v1/counter_service.proto",
            "counter.v1",
            vec![
                message("CountRequest", vec![field("to", 1, Type::Int32)]),
                message("CountResponse", vec![field("count", 1, Type::Int32)]),
                chunk,
            ],
            vec![ServiceDescriptorProto {
                name: Some("CounterService".to_string()),
                method: vec![
                    server_streaming_method(
                        "Count",
                        ".counter.v1.CountRequest",
                        ".counter.v1.CountStreamChunk",
                    ),
                    // Plain streaming without the progress convention: omitted
                    // from tool registration.
                    server_streaming_method(
                        "Watch",
                        ".counter.v1.CountRequest",
                        ".counter.v1.CountResponse",
                    ),
                ],
                ..Default::default()
            }],
        )
    };
    fd.encode_to_vec()
}

/// A service whose method carries an MCPTool name override.
fn renamed_file() -> Vec<u8> {
    let tool_opts = ToolMethodOptions {
        tool: Some(grpc_mcp_gateway::mcppb::McpToolOptions {
            name: "custom_tool_name".to_string(),
            description: "Overridden description".to_string(),
        }),
    };
    RawFile {
        name: Some("renamed/v1/renamed_service.proto".to_string()),
        package: Some("renamed.v1".to_string()),
        dependency: vec!["mcp/protobuf/mcp.proto".to_string()],
        message_type: vec![RawMessage {
            name: Some("PingRequest".to_string()),
            field: vec![raw_field("payload", 1, Type::String, None)],
            ..Default::default()
        }
        .encode_to_vec()],
        service: vec![RawService {
            name: Some("RenamedService".to_string()),
            method: vec![RawMethod {
                name: Some("Ping".to_string()),
                input_type: Some(".renamed.v1.PingRequest".to_string()),
                output_type: Some(".renamed.v1.PingRequest".to_string()),
                options: Some(tool_opts.encode_to_vec()),
                ..Default::default()
            }
            .encode_to_vec()],
            ..Default::default()
        }
        .encode_to_vec()],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
    .encode_to_vec()
}

fn base_proto_files() -> Vec<Vec<u8>> {
    vec![
        global_file_bytes("google/protobuf/descriptor.proto"),
        google_field_behavior_file().encode_to_vec(),
        buf_validate_file().encode_to_vec(),
        mcp_options_file().encode_to_vec(),
    ]
}

fn run_plugin(files_to_generate: &[&str], parameter: &str, extra: Vec<Vec<u8>>) -> prost_types::compiler::CodeGeneratorResponse {
    let mut proto_file = base_proto_files();
    proto_file.extend(extra);
    let request = RawRequest {
        file_to_generate: files_to_generate.iter().map(|s| s.to_string()).collect(),
        parameter: Some(parameter.to_string()),
        proto_file,
    };
    plugin::run(&request.encode_to_vec()).expect("plugin run")
}

fn file_named<'a>(
    response: &'a prost_types::compiler::CodeGeneratorResponse,
    name: &str,
) -> &'a str {
    response
        .file
        .iter()
        .find(|f| f.name.as_deref() == Some(name))
        .unwrap_or_else(|| panic!("missing output file {name}; got {:?}", names(response)))
        .content
        .as_deref()
        .unwrap_or("")
}

fn names(response: &prost_types::compiler::CodeGeneratorResponse) -> Vec<String> {
    response
        .file
        .iter()
        .filter_map(|f| f.name.clone())
        .collect()
}

#[test]
fn rust_output_for_unary_service() {
    let response = run_plugin(
        &["store/apps/utilities/clock/v1/clock_service.proto"],
        "lang=rust",
        vec![clock_file()],
    );
    assert_eq!(response.error, None);

    let content = file_named(
        &response,
        "store/apps/utilities/clock/v1/clock_service.mcp.rs",
    );
    // The derived tool name follows service_snake-method_snake_version.
    assert!(content.contains("\"clock_service-convert_time_v1\""));
    assert!(content.contains(
        "pub const CLOCK_SERVICE_MCP_DEFAULT_BASE_PATH: &str = \"/store/apps/utilities/clock/v1/clockservice/mcp\""
    ));
    assert!(content.contains("pub trait ClockServiceMcpServer"));
    assert!(content.contains("pub fn register_clock_service_mcp_handler"));
    assert!(content.contains("pub fn forward_to_clock_service_mcp_client"));
    assert!(content.contains("pub async fn serve_clock_service_mcp"));
}

#[test]
fn rust_output_for_progress_stream() {
    let response = run_plugin(
        &["counter/v1/counter_service.proto"],
        "lang=rust",
        vec![counter_file()],
    );
    assert_eq!(response.error, None);

    let content = file_named(&response, "counter/v1/counter_service.mcp.rs");
    assert!(content.contains("\"counter_service-count_v1\""));
    assert!(content.contains("spawn_progress_relay"));
    assert!(content.contains("spawn_forward_progress_relay"));
    assert!(content.contains("InProcessServerStream"));
    // Streaming without the progress convention is not projected.
    assert!(!content.contains("watch"));
}

#[test]
fn tool_name_override_from_method_options() {
    let response = run_plugin(
        &["renamed/v1/renamed_service.proto"],
        "lang=rust",
        vec![renamed_file()],
    );
    assert_eq!(response.error, None);

    let content = file_named(&response, "renamed/v1/renamed_service.mcp.rs");
    assert!(content.contains("\"custom_tool_name\""));
    assert!(content.contains("Overridden description"));
    assert!(!content.contains("renamed_service-ping"));
}

#[test]
fn go_output_and_package_suffix() {
    let response = run_plugin(
        &["store/apps/utilities/clock/v1/clock_service.proto"],
        "lang=go",
        vec![clock_file()],
    );
    assert_eq!(response.error, None);
    let content = file_named(
        &response,
        "store/apps/utilities/clock/v1/clock_service.pb.mcp.go",
    );
    assert!(content.contains("func ServeClockServiceMCP"));
    assert!(content.contains("func RegisterClockServiceMCPHandler"));
    assert!(content.contains("func ForwardToClockServiceMCPClient"));
    assert!(content.contains("const ClockServiceMCPDefaultBasePath"));

    let response = run_plugin(
        &["store/apps/utilities/clock/v1/clock_service.proto"],
        "lang=go,package_suffix=mcp",
        vec![clock_file()],
    );
    assert_eq!(response.error, None);
    // Suffixed output moves into a sub-directory named after the package.
    let file_names = names(&response);
    assert!(
        file_names
            .iter()
            .any(|n| n.ends_with("mcp/clock_service.pb.mcp.go")),
        "got {file_names:?}"
    );
}

#[test]
fn invalid_package_suffix_reported_in_error() {
    let response = run_plugin(
        &["store/apps/utilities/clock/v1/clock_service.proto"],
        "lang=go,package_suffix=not-an-ident",
        vec![clock_file()],
    );
    let error = response.error.expect("error reported");
    assert!(error.contains("package_suffix"));
    // Output for the offending file is suppressed.
    assert!(response.file.is_empty());
}

#[test]
fn python_output() {
    let response = run_plugin(
        &["counter/v1/counter_service.proto"],
        "lang=python",
        vec![counter_file()],
    );
    assert_eq!(response.error, None);
    let content = file_named(&response, "counter/v1/counter_service_pb2_mcp.py");
    assert!(content.contains("def register_counter_service_mcp_handler"));
    assert!(content.contains("def forward_to_counter_service_mcp_client"));
    assert!(content.contains("async def serve_counter_service_mcp"));
    assert!(content.contains("COUNTER_SERVICE_MCP_DEFAULT_BASE_PATH"));
    assert!(content.contains("import counter.v1.counter_service_pb2"));
}

#[test]
fn cpp_batch_emits_shared_files_once() {
    let response = run_plugin(
        &[
            "counter/v1/counter_service.proto",
            "store/apps/utilities/clock/v1/clock_service.proto",
        ],
        "lang=cpp",
        vec![clock_file(), counter_file()],
    );
    assert_eq!(response.error, None);

    let file_names = names(&response);
    // Per-service artifacts for both files.
    assert!(file_names.contains(&"counter/v1/counter_service.mcp.h".to_string()));
    assert!(file_names.contains(&"counter/v1/counter_service.mcp.cc".to_string()));
    assert!(
        file_names.contains(&"store/apps/utilities/clock/v1/clock_service.mcp.h".to_string())
    );

    // Shared project files exactly once, keyed to the first file in sorted
    // order (counter sorts before store).
    for shared in [
        "rust/lib.rs",
        "rust/mcp_handler.rs",
        "rust/Cargo.toml",
        "rust/build.rs",
        "rust/mcp_include.h",
        "Makefile",
        "main.cc",
    ] {
        let count = file_names.iter().filter(|n| n.as_str() == shared).count();
        assert_eq!(count, 1, "{shared} emitted {count} times");
    }
    let bridge = file_named(&response, "rust/lib.rs");
    assert!(bridge.contains("CounterService"));
}

#[test]
fn lang_all_covers_every_target() {
    let response = run_plugin(
        &["counter/v1/counter_service.proto"],
        "lang=all",
        vec![counter_file()],
    );
    assert_eq!(response.error, None);
    let file_names = names(&response);
    assert!(file_names.contains(&"counter/v1/counter_service.pb.mcp.go".to_string()));
    assert!(file_names.contains(&"counter/v1/counter_service_pb2_mcp.py".to_string()));
    assert!(file_names.contains(&"counter/v1/counter_service.mcp.rs".to_string()));
    assert!(file_names.contains(&"counter/v1/counter_service.mcp.h".to_string()));
}

#[test]
fn unsupported_language_reported() {
    let response = run_plugin(
        &["counter/v1/counter_service.proto"],
        "lang=cobol",
        vec![counter_file()],
    );
    assert!(response.error.expect("error").contains("unsupported language"));
}

#[test]
fn colliding_tool_name_overrides_reported() {
    // Two methods forced onto the same tool name through MCPTool.name.
    let tool_opts = ToolMethodOptions {
        tool: Some(grpc_mcp_gateway::mcppb::McpToolOptions {
            name: "same_name".to_string(),
            description: String::new(),
        }),
    };
    let method = |name: &str| {
        RawMethod {
            name: Some(name.to_string()),
            input_type: Some(".clash.v1.PingRequest".to_string()),
            output_type: Some(".clash.v1.PingRequest".to_string()),
            options: Some(tool_opts.encode_to_vec()),
            ..Default::default()
        }
        .encode_to_vec()
    };
    let file = RawFile {
        name: Some("clash/v1/clash_service.proto".to_string()),
        package: Some("clash.v1".to_string()),
        dependency: vec!["mcp/protobuf/mcp.proto".to_string()],
        message_type: vec![RawMessage {
            name: Some("PingRequest".to_string()),
            field: vec![raw_field("payload", 1, Type::String, None)],
            ..Default::default()
        }
        .encode_to_vec()],
        service: vec![RawService {
            name: Some("ClashService".to_string()),
            method: vec![method("Ping"), method("Pong")],
            ..Default::default()
        }
        .encode_to_vec()],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
    .encode_to_vec();

    let response = run_plugin(&["clash/v1/clash_service.proto"], "lang=rust", vec![file]);
    let error = response.error.expect("collision reported");
    assert!(error.contains("same_name"));
    assert!(response.file.is_empty());
}

#[test]
fn files_without_services_produce_no_output() {
    let response = run_plugin(
        &["test/plain.proto"],
        "lang=rust",
        vec![file(
            "test/plain.proto",
            "test.v1",
            vec![message("Plain", vec![field("x", 1, Type::String)])],
            vec![],
        )
        .encode_to_vec()],
    );
    assert_eq!(response.error, None);
    assert!(response.file.is_empty());
}

#[test]
fn method_comment_becomes_tool_description() {
    let fd = prost_types::FileDescriptorProto {
        // Leading comment on service 0, method 0; lint annotations are
        // stripped and lines joined with single spaces.
        source_code_info: Some(source_info(
            vec![6, 0, 2, 0],
            " Converts a time between zones.\n buf:lint:ignore COMMENT_RPC\n Accurate to the second.\n",
        )),
        ..prost_types::FileDescriptorProto::decode(clock_file().as_slice()).unwrap()
    };

    let response = run_plugin(
        &["store/apps/utilities/clock/v1/clock_service.proto"],
        "lang=rust",
        vec![fd.encode_to_vec()],
    );
    assert_eq!(response.error, None);
    let content = file_named(
        &response,
        "store/apps/utilities/clock/v1/clock_service.mcp.rs",
    );
    assert!(content
        .contains("\"Converts a time between zones. Accurate to the second.\""));
    assert!(!content.contains("buf:lint"));
}

#[test]
fn schema_constant_matches_deriver_output() {
    let response = run_plugin(
        &["store/apps/utilities/clock/v1/clock_service.proto"],
        "lang=rust",
        vec![clock_file()],
    );
    let content = file_named(
        &response,
        "store/apps/utilities/clock/v1/clock_service.mcp.rs",
    );
    // The registered schema is the deriver's exact serialization.
    let expected =
        r#"{\"properties\":{\"time\":{\"type\":\"string\"}},\"required\":[],\"type\":\"object\"}"#;
    assert!(
        content.contains(expected),
        "schema constant not found in generated source"
    );
}
