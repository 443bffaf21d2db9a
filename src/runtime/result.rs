//! Conversion of gRPC outcomes into MCP tool results.

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use tonic::Status;

/// JSON-serialisable representation of a gRPC error.
#[derive(Debug, Serialize)]
struct GrpcError {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<serde_json::Value>,
}

/// Builds a plain-text MCP tool error result.
pub fn error_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult::error(vec![Content::text(text.into())])
}

/// Builds a successful tool result carrying a JSON payload as text.
pub fn json_result(value: &serde_json::Value) -> CallToolResult {
    let text = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    CallToolResult::success(vec![Content::text(text)])
}

/// Converts a gRPC status into an MCP tool error result. The status code is
/// preserved in the JSON error payload:
///
/// ```rust
/// use grpc_mcp_gateway::runtime::grpc_error_result;
///
/// let result = grpc_error_result(&tonic::Status::not_found("todo missing"));
/// assert_eq!(result.is_error, Some(true));
/// ```
pub fn grpc_error_result(status: &Status) -> CallToolResult {
    let err = GrpcError {
        code: format!("{:?}", status.code()),
        message: status.message().to_string(),
        details: Vec::new(),
    };
    match serde_json::to_string(&err) {
        Ok(json) => error_result(json),
        Err(_) => error_result(err.message),
    }
}
