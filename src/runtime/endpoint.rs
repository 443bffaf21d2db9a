//! Computation of the externally visible MCP endpoint from the listen
//! address and environment overrides.

use super::config::{McpServerConfig, Transport};

/// An MCP server endpoint. Use [`server_endpoint`] to compute it from a
/// config, typically to log the URL before starting:
///
/// ```rust,no_run
/// use grpc_mcp_gateway::runtime::{server_endpoint, McpServerConfig};
///
/// let cfg = McpServerConfig::new("todo", "0.1.0");
/// let ep = server_endpoint(&cfg);
/// tracing::info!("MCP listening on {}", ep.url);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// `"stdio"`, `"http"`, or `"https"`.
    pub protocol: String,
    /// `"stdio"`, `"streamable-http"`, or `"sse"`.
    pub transport: String,
    /// Full URL (e.g. `"http://localhost:8082/todo/v1/todoservice/mcp"`).
    /// Empty for stdio.
    pub url: String,
}

/// Returns the effective base path: the configured one, or the generated
/// default when the config leaves it empty.
pub fn resolve_base_path(cfg: &McpServerConfig, generated_default: &str) -> String {
    if cfg.base_path.is_empty() {
        generated_default.to_string()
    } else {
        cfg.base_path.clone()
    }
}

/// Computes the endpoint for an MCP server based on its config.
///
/// For stdio-only configurations the URL is empty. For HTTP, host and port
/// come from the listen address with `MCP_SERVER_HOST` / `MCP_SERVER_PORT`
/// overrides, and the scheme honours `MCP_SERVER_TLS=true`.
pub fn server_endpoint(cfg: &McpServerConfig) -> Endpoint {
    let transports = cfg.effective_transports();
    let has_stdio = transports.contains(&Transport::Stdio);
    let has_http = transports.iter().any(Transport::is_http);

    if has_stdio && !has_http {
        return Endpoint {
            protocol: "stdio".to_string(),
            transport: Transport::Stdio.as_str().to_string(),
            url: String::new(),
        };
    }

    let transport_name = transports
        .iter()
        .find(|t| t.is_http())
        .copied()
        .unwrap_or(Transport::StreamableHttp)
        .as_str()
        .to_string();

    let addr = cfg.resolve_addr();

    let mut host = std::env::var("MCP_SERVER_HOST").unwrap_or_default();
    let mut port = std::env::var("MCP_SERVER_PORT").unwrap_or_default();

    if host.is_empty() || port.is_empty() {
        if let Some(listen_port) = addr.strip_prefix(':') {
            if host.is_empty() {
                host = "localhost".to_string();
            }
            if port.is_empty() {
                port = listen_port.to_string();
            }
        } else if let Some((listen_host, listen_port)) =
            addr.split_once(':').filter(|(_, p)| !p.is_empty())
        {
            if host.is_empty() {
                host = listen_host.to_string();
            }
            if port.is_empty() {
                port = listen_port.to_string();
            }
        } else {
            if host.is_empty() {
                host = "localhost".to_string();
            }
            if port.is_empty() {
                port = "8080".to_string();
            }
        }
    }

    let protocol = if std::env::var("MCP_SERVER_TLS").as_deref() == Ok("true") {
        "https"
    } else {
        "http"
    };

    let path = cfg.resolve_base_path();

    Endpoint {
        protocol: protocol.to_string(),
        transport: transport_name,
        url: format!("{protocol}://{host}:{port}{path}"),
    }
}
