//! Serving runtime: transport multiplexing, metadata bridging, the
//! in-process stream shim, the streaming-progress protocol, endpoint and
//! health probes, and MCP primitives.
//!
//! Generated code talks to this module: `register_*` / `forward_to_*`
//! functions populate an [`McpRegistry`], and [`start_server`] serves it over
//! the configured transports.

pub mod config;
pub mod dynamic;
pub mod endpoint;
pub mod health;
pub mod metadata;
pub mod primitives;
pub mod progress;
pub mod registry;
pub mod result;
pub mod server;
pub mod stream;

pub use config::{
    default_header_mappings, parse_transports, ExtraProperty, HeaderMapping, McpServerConfig,
    Transport,
};
pub use dynamic::{server_streaming_json, unary_json, DynamicCodec};
pub use endpoint::{resolve_base_path, server_endpoint, Endpoint};
pub use health::{health_handler, HealthState, McpPingError, McpPingResponse};
pub use metadata::{
    apply_metadata_to_request, forward_metadata, headers_middleware, progress_token_string,
    with_incoming_progress_token, with_progress_token, ForwardedHeaders, GRPC_PROGRESS_TOKEN_KEY,
};
pub use primitives::{
    app_resource_uri, default_app_html, default_prompt_result, default_resource_result,
    elicitation_schema, filter_completions, run_elicitation, ElicitField,
};
pub use progress::{
    spawn_forward_progress_relay, spawn_progress_relay, started_result, ProgressEvent,
    ProgressSink, PROGRESS_COMPLETE_TOTAL,
};
pub use registry::{
    McpRegistry, PromptArgumentDef, PromptRegistration, ResourceRegistration, ToolCallContext,
    ToolHandler, ToolRegistration,
};
pub use result::{error_result, grpc_error_result, json_result};
pub use server::start_server;
pub use stream::InProcessServerStream;
