//! HTTP-header to gRPC-metadata translation and progress-token propagation.
//!
//! Two directions are covered:
//!
//! - *Incoming HTTP → outgoing gRPC*: [`headers_middleware`] reads configured
//!   headers from each HTTP request and stores them on the request as a
//!   [`ForwardedHeaders`] extension; generated `forward_to_*` handlers later
//!   call [`forward_metadata`] to merge them with incoming gRPC metadata.
//! - *Progress token*: the MCP `params._meta.progressToken` is folded into
//!   gRPC metadata under [`GRPC_PROGRESS_TOKEN_KEY`] so that a single service
//!   implementation can decide whether to emit progress chunks regardless of
//!   whether it was reached in-process or over the wire.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::Request, extract::State, middleware::Next, response::Response};
use rmcp::model::{NumberOrString, ProgressToken};
use tonic::metadata::{Ascii, MetadataKey, MetadataMap, MetadataValue};

use super::config::HeaderMapping;

/// gRPC metadata key for the MCP progress token. When an MCP client sends
/// `progressToken` in `params._meta`, the gateway forwards it under this key.
/// gRPC servers can check for its presence to decide whether to send
/// `MCPProgress` chunks.
pub const GRPC_PROGRESS_TOKEN_KEY: &str = "mcp-progress-token";

/// HTTP headers extracted by [`headers_middleware`], keyed by gRPC metadata
/// key. Stored as a request extension and carried into the MCP request
/// context by the HTTP transport.
#[derive(Debug, Clone, Default)]
pub struct ForwardedHeaders(pub HashMap<String, String>);

/// Axum middleware that extracts configured headers from the incoming request
/// and stores them in the request extensions. The headers are later available
/// to tool handlers via [`forward_metadata`].
pub async fn headers_middleware(
    State(mappings): State<Arc<Vec<HeaderMapping>>>,
    mut req: Request,
    next: Next,
) -> Response {
    if !mappings.is_empty() {
        let mut pairs = HashMap::with_capacity(mappings.len());
        for mapping in mappings.iter() {
            if let Some(value) = req
                .headers()
                .get(&mapping.http_header)
                .and_then(|v| v.to_str().ok())
            {
                if !value.is_empty() {
                    pairs.insert(mapping.grpc_key.clone(), value.to_string());
                }
            }
        }
        if !pairs.is_empty() {
            req.extensions_mut().insert(ForwardedHeaders(pairs));
        }
    }
    next.run(req).await
}

/// Prepares outgoing gRPC metadata by combining:
///
/// 1. Incoming gRPC metadata (for gRPC→gRPC proxy scenarios) — all keys
///    except reserved `grpc-` prefixed ones are forwarded, lowercased.
/// 2. HTTP headers stored by [`headers_middleware`] — these overwrite
///    incoming metadata on key conflicts.
///
/// Both sources empty yields an empty map. The merge is a pure function of
/// its inputs; no ambient state is consulted.
pub fn forward_metadata(incoming: &MetadataMap, http: &ForwardedHeaders) -> MetadataMap {
    let mut md = MetadataMap::new();

    for key_value in incoming.iter() {
        if let tonic::metadata::KeyAndValueRef::Ascii(key, value) = key_value {
            let key = key.as_str().to_lowercase();
            if key.starts_with("grpc-") {
                continue; // reserved by gRPC
            }
            if let Ok(key) = MetadataKey::<Ascii>::from_bytes(key.as_bytes()) {
                md.append(key, value.clone());
            }
        }
    }

    for (key, value) in &http.0 {
        insert_ascii(&mut md, key, value);
    }

    md
}

/// Adds the MCP progress token to a metadata map under
/// [`GRPC_PROGRESS_TOKEN_KEY`]. Call before forwarding to a gRPC backend when
/// the MCP client sent `progressToken` in `params._meta`.
pub fn with_progress_token(md: &mut MetadataMap, token: &ProgressToken) {
    insert_ascii(md, GRPC_PROGRESS_TOKEN_KEY, &progress_token_string(token));
}

/// Adds the MCP progress token to a request's metadata as if it had arrived
/// as incoming gRPC metadata. Use for in-process (Register) streaming
/// handlers so server methods that inspect incoming metadata see the token
/// identically to the remote case.
pub fn with_incoming_progress_token<T>(req: &mut tonic::Request<T>, token: &ProgressToken) {
    insert_ascii(
        req.metadata_mut(),
        GRPC_PROGRESS_TOKEN_KEY,
        &progress_token_string(token),
    );
}

/// Stringifies a progress token; tokens may be strings or integers on the
/// wire and both are carried as strings in gRPC metadata.
pub fn progress_token_string(token: &ProgressToken) -> String {
    match &token.0 {
        NumberOrString::Number(n) => n.to_string(),
        NumberOrString::String(s) => s.to_string(),
    }
}

/// Merges a metadata map into a tonic request.
pub fn apply_metadata_to_request<T>(request: &mut tonic::Request<T>, metadata: MetadataMap) {
    for key_value in metadata.iter() {
        match key_value {
            tonic::metadata::KeyAndValueRef::Ascii(key, value) => {
                request.metadata_mut().insert(key.clone(), value.clone());
            }
            tonic::metadata::KeyAndValueRef::Binary(key, value) => {
                request.metadata_mut().insert_bin(key.clone(), value.clone());
            }
        }
    }
}

fn insert_ascii(md: &mut MetadataMap, key: &str, value: &str) {
    let Ok(key) = MetadataKey::<Ascii>::from_bytes(key.to_lowercase().as_bytes()) else {
        tracing::debug!(key, "skipping metadata entry: invalid key");
        return;
    };
    let Ok(value) = MetadataValue::try_from(value) else {
        tracing::debug!(%key, "skipping metadata entry: invalid value");
        return;
    };
    md.insert(key, value);
}
