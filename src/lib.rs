//! # grpc-mcp-gateway
//!
//! Bridges two RPC universes: gRPC services defined in Protocol Buffers and
//! the Model Context Protocol (MCP). Every gRPC method automatically appears
//! as an MCP tool, with a JSON Schema derived from the request message,
//! progress forwarding for server-streaming methods, metadata propagation,
//! and multi-transport serving.
//!
//! ## Components
//!
//! - [`generator`]: a protoc plugin that emits per-language bindings (Go,
//!   Python, Rust, C++) publishing each RPC as a named MCP tool with two
//!   registration paths: *forward* (dial a remote gRPC server) and
//!   *in-process* (call a local service implementation directly).
//! - [`runtime`]: a transport multiplexer serving MCP over stdio,
//!   streamable-HTTP, and legacy SSE from one tool registry, plus the
//!   metadata bridge, the in-process server-stream shim, the
//!   streaming-progress protocol, and endpoint/health probes.
//! - [`plugin`]: the protoc plugin protocol driver used by the
//!   `protoc-gen-mcp` binary.
//!
//! ## Example
//!
//! ```rust,no_run
//! use grpc_mcp_gateway::runtime::{start_server, McpRegistry, McpServerConfig, Transport};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> grpc_mcp_gateway::Result<()> {
//!     let mut registry = McpRegistry::new("todo-mcp", "0.1.0");
//!     // Generated code populates the registry:
//!     // todo_service_mcp::register_todo_service_mcp_handler(&mut registry, server);
//!
//!     let mut cfg = McpServerConfig::new("todo-mcp", "0.1.0");
//!     cfg.transports = vec![Transport::StreamableHttp];
//!     cfg.addr = ":8082".to_string();
//!
//!     start_server(CancellationToken::new(), cfg, registry).await
//! }
//! ```

/// Generated types for mcp.proto options.
#[allow(clippy::all)]
pub mod mcppb {
    include!("generated/mcp.rs");
}

pub mod error;
pub mod generator;
pub mod plugin;
pub mod runtime;

pub use error::{Error, Result};
pub use generator::{GeneratedFile, GenerateOptions, Language};
pub use runtime::{McpRegistry, McpServerConfig, Transport};
