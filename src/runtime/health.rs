//! gRPC-health-backed HTTP probe exposed as an MCP-ping response.
//!
//! The handler performs a `grpc.health.v1.Health/Check` against the backend
//! channel and answers in MCP ping shape:
//! `{"jsonrpc":"2.0","id":"health","result":{}}` when the backend reports
//! SERVING, or an error envelope with code `-32000` and HTTP 503 otherwise.
//! Suitable for load balancer / k8s probes and MCP clients that expect
//! ping-style responses.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tonic::transport::Channel;
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::HealthCheckRequest;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared state for the health handler.
#[derive(Clone)]
pub struct HealthState {
    /// Channel to the backend gRPC server that registers the health service.
    pub channel: Channel,
}

/// MCP ping response format per the MCP ping utility specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpPingResponse {
    pub jsonrpc: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpPingError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpPingError {
    pub code: i32,
    pub message: String,
}

impl McpPingResponse {
    fn serving() -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: "health".to_string(),
            result: Some(serde_json::json!({})),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: "health".to_string(),
            result: None,
            error: Some(McpPingError {
                code: -32000,
                message: message.into(),
            }),
        }
    }
}

/// Health probe handler. Registered at the configured health path; axum's
/// `get` routing also answers HEAD, and other methods fall through to 405.
pub async fn health_handler(
    State(state): State<HealthState>,
) -> (StatusCode, Json<McpPingResponse>) {
    let mut client = HealthClient::new(state.channel.clone());
    let request = HealthCheckRequest {
        service: String::new(),
    };

    let checked = tokio::time::timeout(HEALTH_CHECK_TIMEOUT, client.check(request)).await;
    match checked {
        Ok(Ok(response)) => {
            if response.into_inner().status == ServingStatus::Serving as i32 {
                (StatusCode::OK, Json(McpPingResponse::serving()))
            } else {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(McpPingResponse::error("not serving")),
                )
            }
        }
        Ok(Err(status)) => {
            tracing::debug!(error = %status, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(McpPingResponse::error("service unavailable")),
            )
        }
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(McpPingResponse::error("service unavailable")),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serving_response_shape() {
        let json = serde_json::to_string(&McpPingResponse::serving()).unwrap();
        assert_eq!(json, r#"{"jsonrpc":"2.0","id":"health","result":{}}"#);
    }

    #[test]
    fn test_not_serving_response_shape() {
        let json = serde_json::to_string(&McpPingResponse::error("not serving")).unwrap();
        assert_eq!(
            json,
            r#"{"jsonrpc":"2.0","id":"health","error":{"code":-32000,"message":"not serving"}}"#
        );
    }

    #[test]
    fn test_response_round_trip() {
        let resp = McpPingResponse::error("service unavailable");
        let json = serde_json::to_string(&resp).unwrap();
        let back: McpPingResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back.error.unwrap().code, -32000);
        assert!(back.result.is_none());
    }
}
