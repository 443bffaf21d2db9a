//! The streaming-progress protocol: relays progress chunks from a gRPC
//! server stream to MCP progress notifications.
//!
//! Tool handlers for progress-convention streaming methods return
//! `{"status":"started"}` immediately; a spawned task then forwards each
//! `MCPProgress` chunk as a progress notification and delivers the final
//! result through a terminal notification whose `total` is the sentinel
//! `1.0`. Intermediate updates must therefore carry `total > 1.0` or omit it.

use std::sync::Arc;

use async_trait::async_trait;
use prost_reflect::DynamicMessage;
use rmcp::model::{CallToolResult, Content, ProgressNotificationParam, ProgressToken};
use rmcp::service::Peer;
use rmcp::RoleServer;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::mcppb;

use super::stream::InProcessServerStream;

/// `total` value of the terminal progress notification. Clients distinguish
/// intermediate from terminal notifications on this value.
pub const PROGRESS_COMPLETE_TOTAL: f64 = 1.0;

/// The immediate tool response for progress-streaming tools.
pub fn started_result() -> CallToolResult {
    CallToolResult::success(vec![Content::text(r#"{"status":"started"}"#)])
}

/// One chunk produced by an in-process streaming implementation: either a
/// progress update or the final result payload.
pub enum ProgressEvent {
    Progress(mcppb::McpProgress),
    Result(serde_json::Value),
}

/// Destination for progress notifications. The only production
/// implementation is the MCP session peer; tests substitute a recorder.
#[async_trait]
pub trait ProgressSink: Send + Sync + 'static {
    async fn send_progress(
        &self,
        token: ProgressToken,
        progress: f64,
        total: Option<f64>,
        message: Option<String>,
    );
}

#[async_trait]
impl ProgressSink for Peer<RoleServer> {
    async fn send_progress(
        &self,
        token: ProgressToken,
        progress: f64,
        total: Option<f64>,
        message: Option<String>,
    ) {
        let params = ProgressNotificationParam {
            progress_token: token,
            progress,
            total,
            message,
        };
        if let Err(err) = self.notify_progress(params).await {
            tracing::debug!(error = %err, "failed to deliver progress notification");
        }
    }
}

/// Relays events from an in-process stream to the sink until the stream
/// closes or a result event arrives. Without a progress token there is
/// nothing to correlate notifications with, so the stream is drained and
/// dropped (the tool call already returned "started").
pub fn spawn_progress_relay<S: ProgressSink>(
    sink: S,
    token: Option<ProgressToken>,
    stream: Arc<InProcessServerStream<ProgressEvent>>,
    ct: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(token) = token else {
            while stream.recv().await.is_some() {}
            return;
        };
        loop {
            tokio::select! {
                _ = ct.cancelled() => return,
                event = stream.recv() => match event {
                    None => return,
                    Some(event) => {
                        if relay_event(&sink, &token, event).await {
                            return;
                        }
                    }
                },
            }
        }
    })
}

/// Relays chunks from a remote gRPC server stream (Forward path). The chunk
/// message is inspected for the configured oneof members: progress chunks
/// become notifications, the result chunk becomes the terminal notification.
/// Stream errors and cancellation end the relay silently.
pub fn spawn_forward_progress_relay<S: ProgressSink>(
    sink: S,
    token: Option<ProgressToken>,
    mut stream: tonic::Streaming<DynamicMessage>,
    progress_field: String,
    result_field: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(token) = token else {
            while let Ok(Some(_)) = stream.message().await {}
            return;
        };
        loop {
            let chunk = match stream.message().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => return,
                Err(status) => {
                    tracing::debug!(error = %status, "progress stream ended with error");
                    return;
                }
            };
            if let Some(event) = chunk_to_event(&chunk, &progress_field, &result_field) {
                if relay_event(&sink, &token, event).await {
                    return;
                }
            }
        }
    })
}

/// Sends one event to the sink; returns true when the event was terminal.
async fn relay_event<S: ProgressSink>(
    sink: &S,
    token: &ProgressToken,
    event: ProgressEvent,
) -> bool {
    match event {
        ProgressEvent::Progress(p) => {
            let message = if p.message.is_empty() {
                None
            } else {
                Some(p.message)
            };
            sink.send_progress(token.clone(), p.progress, p.total, message)
                .await;
            false
        }
        ProgressEvent::Result(value) => {
            let payload = serde_json::to_string(&value).unwrap_or_else(|_| "{}".to_string());
            sink.send_progress(
                token.clone(),
                PROGRESS_COMPLETE_TOTAL,
                Some(PROGRESS_COMPLETE_TOTAL),
                Some(payload),
            )
            .await;
            true
        }
    }
}

/// Maps a streamed chunk message onto a [`ProgressEvent`] by inspecting
/// which oneof member is set.
fn chunk_to_event(
    chunk: &DynamicMessage,
    progress_field: &str,
    result_field: &str,
) -> Option<ProgressEvent> {
    if chunk.has_field_by_name(progress_field) {
        if let Some(value) = chunk.get_field_by_name(progress_field) {
            if let prost_reflect::Value::Message(msg) = value.as_ref() {
                if let Ok(progress) = msg.transcode_to::<mcppb::McpProgress>() {
                    return Some(ProgressEvent::Progress(progress));
                }
            }
        }
        return None;
    }
    if chunk.has_field_by_name(result_field) {
        if let Some(value) = chunk.get_field_by_name(result_field) {
            if let prost_reflect::Value::Message(msg) = value.as_ref() {
                if let Ok(json) = serde_json::to_value(msg) {
                    return Some(ProgressEvent::Result(json));
                }
            }
        }
    }
    None
}
