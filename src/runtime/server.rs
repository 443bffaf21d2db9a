//! Transport multiplexer: serves one registry over stdio, streamable-HTTP,
//! and legacy SSE, concurrently when several transports are configured.
//!
//! HTTP transports share a single listener and axum router: streamable-HTTP
//! is mounted at the resolved base path (exact), SSE endpoints live under
//! `basePath + "/"`, and the optional health probe gets its own route. The
//! stdio transport gets its own registry instance because it owns the
//! process's standard streams; logging must already be directed to stderr.
//! No read or write timeouts are configured: progress-streaming tools hold
//! connections open for the duration of the work, and any finite timeout
//! would truncate legitimate traffic.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use rmcp::transport::sse_server::{SseServer, SseServerConfig};
use rmcp::transport::stdio;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use rmcp::ServiceExt;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

use super::config::{McpServerConfig, Transport};
use super::health::{health_handler, HealthState};
use super::metadata::headers_middleware;
use super::registry::McpRegistry;

/// Starts the MCP server using the configured transport(s). Multiple
/// transports run concurrently: HTTP-based transports share one listener
/// while stdio gets its own registry instance. Blocks until the cancellation
/// token fires or a fatal listener error occurs.
pub async fn start_server(
    ct: CancellationToken,
    cfg: McpServerConfig,
    registry: McpRegistry,
) -> Result<()> {
    let mut cfg = cfg;
    cfg.addr = cfg.resolve_addr();
    cfg.base_path = cfg.resolve_base_path();

    let transports = cfg.effective_transports();
    let has_stdio = transports.contains(&Transport::Stdio);
    let http_transports: Vec<Transport> =
        transports.iter().copied().filter(Transport::is_http).collect();

    // Notify the caller that the base path is resolved.
    if let Some(on_ready) = cfg.on_ready.clone() {
        on_ready(&cfg);
    }

    if !http_transports.is_empty() {
        let router = build_http_router(&cfg, &http_transports, registry.clone(), ct.clone());
        let addr = listen_addr(&cfg.addr);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!(addr = %addr, base_path = %cfg.base_path, "MCP HTTP listener bound");

        let shutdown = ct.clone();
        let serve = axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await });

        if has_stdio {
            // HTTP errors are logged but do not take down the stdio transport.
            tokio::spawn(async move {
                if let Err(err) = serve.await {
                    tracing::error!(error = %err, "HTTP server error");
                }
            });
        } else {
            serve.await?;
            return Ok(());
        }
    }

    if has_stdio {
        return serve_stdio(ct, registry).await;
    }

    if http_transports.is_empty() {
        return Err(Error::Config("no transports configured".to_string()));
    }
    Ok(())
}

/// Registers HTTP-based transports on a shared router.
fn build_http_router(
    cfg: &McpServerConfig,
    transports: &[Transport],
    registry: McpRegistry,
    ct: CancellationToken,
) -> Router {
    let mut router = Router::new();

    for transport in transports {
        match transport {
            Transport::StreamableHttp => {
                let service_registry = registry.clone();
                let service = StreamableHttpService::new(
                    move || Ok(service_registry.clone()),
                    LocalSessionManager::default().into(),
                    StreamableHttpServerConfig::default(),
                );
                router = router.route_service(&cfg.base_path, service);
            }
            Transport::Sse => {
                let (sse_server, sse_router) = SseServer::new(SseServerConfig {
                    bind: "0.0.0.0:0".parse().expect("static socket address"),
                    sse_path: format!("{}/sse", cfg.base_path),
                    post_path: format!("{}/message", cfg.base_path),
                    ct: ct.child_token(),
                    sse_keep_alive: Some(Duration::from_secs(15)),
                });
                let service_registry = registry.clone();
                sse_server.with_service(move || service_registry.clone());
                router = router.merge(sse_router);
            }
            Transport::Stdio => {}
        }
    }

    if !cfg.health_check_path.is_empty() {
        if let Some(channel) = cfg.health_check_channel.clone() {
            let mut path = cfg.health_check_path.clone();
            if !path.starts_with('/') {
                path.insert(0, '/');
            }
            let health_router = Router::new()
                .route(&path, get(health_handler))
                .with_state(HealthState { channel });
            router = router.merge(health_router);
        }
    }

    let mappings = Arc::new(cfg.header_mappings.clone());
    router.layer(axum::middleware::from_fn_with_state(
        mappings,
        headers_middleware,
    ))
}

/// Serves the registry over stdin/stdout until cancellation or session end.
async fn serve_stdio(ct: CancellationToken, registry: McpRegistry) -> Result<()> {
    let service = registry
        .serve(stdio())
        .await
        .map_err(|err| Error::Mcp(format!("stdio initialize: {err}")))?;

    let session_ct = service.cancellation_token();
    tokio::spawn(async move {
        ct.cancelled().await;
        session_ct.cancel();
    });

    service
        .waiting()
        .await
        .map(|_reason| ())
        .map_err(|err| Error::Mcp(format!("stdio session: {err}")))
}

/// A Go-style listen address (`":8080"`) has no host part; bind all
/// interfaces in that case.
fn listen_addr(addr: &str) -> String {
    if let Some(port) = addr.strip_prefix(':') {
        format!("0.0.0.0:{port}")
    } else {
        addr.to_string()
    }
}
