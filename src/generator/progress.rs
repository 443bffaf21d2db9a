//! Detection of the streaming-progress convention on server-streaming RPCs.

use prost_reflect::{Kind, MessageDescriptor, MethodDescriptor};

/// Fully-qualified name of the progress chunk message.
pub const MCP_PROGRESS_FQN: &str = "mcp.protobuf.MCPProgress";

/// Describes a server-streaming RPC that uses `MCPProgress` for progress
/// updates: the streamed message carries a oneof with an `MCPProgress` member
/// and a result member.
#[derive(Debug, Clone)]
pub struct StreamProgressInfo {
    /// The streamed chunk message.
    pub chunk_message: MessageDescriptor,
    /// The final result message.
    pub result_message: MessageDescriptor,
    /// Oneof field name carrying progress updates (e.g. `"progress"`).
    pub progress_field: String,
    /// Oneof field name carrying the final result (e.g. `"result"`).
    pub result_field: String,
    pub service_name: String,
    pub method_name: String,
}

/// Returns [`StreamProgressInfo`] if the method is pure server-streaming and
/// the streamed message follows the progress convention: a non-synthetic
/// oneof containing exactly one `mcp.protobuf.MCPProgress` field and at least
/// one other message field (the result).
pub fn detect_progress_stream(meth: &MethodDescriptor) -> Option<StreamProgressInfo> {
    if !meth.is_server_streaming() || meth.is_client_streaming() {
        return None;
    }
    let msg = meth.output();

    for oneof in msg.oneofs() {
        let mut progress: Option<String> = None;
        let mut result: Option<(String, MessageDescriptor)> = None;
        for fd in oneof.fields() {
            let Kind::Message(field_msg) = fd.kind() else {
                continue;
            };
            if field_msg.full_name() == MCP_PROGRESS_FQN {
                progress = Some(fd.name().to_string());
            } else {
                result = Some((fd.name().to_string(), field_msg));
            }
        }
        if let (Some(progress_field), Some((result_field, result_message))) = (progress, result) {
            return Some(StreamProgressInfo {
                chunk_message: msg.clone(),
                result_message,
                progress_field,
                result_field,
                service_name: meth.parent_service().name().to_string(),
                method_name: meth.name().to_string(),
            });
        }
    }
    None
}
