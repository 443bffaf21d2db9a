//! Runtime configuration for MCP servers.

use std::fmt;
use std::str::FromStr;

/// Transport protocol for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// The modern Streamable HTTP transport (default).
    StreamableHttp,
    /// The legacy SSE transport (2024-11-05 spec).
    Sse,
    /// MCP over stdin/stdout.
    Stdio,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::StreamableHttp => "streamable-http",
            Transport::Sse => "sse",
            Transport::Stdio => "stdio",
        }
    }

    pub fn is_http(&self) -> bool {
        matches!(self, Transport::StreamableHttp | Transport::Sse)
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "streamable-http" => Ok(Transport::StreamableHttp),
            "sse" => Ok(Transport::Sse),
            "stdio" => Ok(Transport::Stdio),
            other => Err(crate::error::Error::UnsupportedTransport(other.to_string())),
        }
    }
}

/// Splits a comma-separated transport string into transports, skipping empty
/// entries. Unknown values are an error, reported before any listener binds.
/// Use with the `MCP_TRANSPORT` env var:
///
/// ```rust
/// use grpc_mcp_gateway::runtime::parse_transports;
///
/// let transports = parse_transports("stdio, streamable-http").unwrap();
/// assert_eq!(transports.len(), 2);
/// ```
pub fn parse_transports(s: &str) -> crate::error::Result<Vec<Transport>> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::parse)
        .collect()
}

/// Maps an HTTP header name to a gRPC metadata key. Used with
/// [`McpServerConfig::header_mappings`] to forward headers from MCP HTTP
/// requests into gRPC outgoing metadata.
#[derive(Debug, Clone)]
pub struct HeaderMapping {
    /// HTTP header name to read (case-insensitive).
    pub http_header: String,
    /// gRPC metadata key to write (lowercase).
    pub grpc_key: String,
}

impl HeaderMapping {
    pub fn new(http_header: impl Into<String>, grpc_key: impl Into<String>) -> Self {
        Self {
            http_header: http_header.into(),
            grpc_key: grpc_key.into(),
        }
    }
}

/// Commonly forwarded header mappings: Authorization, X-Request-Id, X-Trace-Id.
pub fn default_header_mappings() -> Vec<HeaderMapping> {
    vec![
        HeaderMapping::new("Authorization", "authorization"),
        HeaderMapping::new("X-Request-Id", "x-request-id"),
        HeaderMapping::new("X-Trace-Id", "x-trace-id"),
    ]
}

/// An additional property injected into every tool schema and extracted from
/// request arguments into the tool call context.
#[derive(Debug, Clone)]
pub struct ExtraProperty {
    /// JSON property name in tool arguments.
    pub name: String,
    /// Shown in the tool schema.
    pub description: String,
    /// If true, added to `schema.required`.
    pub required: bool,
}

/// Configuration for starting an MCP server.
///
/// Set `transports` (or the legacy scalar `transport`) to choose one or more
/// wire protocols. When multiple transports are specified they run
/// concurrently in the same process, e.g. stdio alongside streamable-http.
#[derive(Clone, Default)]
pub struct McpServerConfig {
    /// Server name reported during MCP initialization.
    pub name: String,
    /// Server version reported during MCP initialization.
    pub version: String,
    /// Single wire protocol (kept for backward compatibility). Ignored when
    /// `transports` is non-empty.
    pub transport: Option<Transport>,
    /// One or more wire protocols to serve concurrently. Takes precedence
    /// over `transport`.
    pub transports: Vec<Transport>,
    /// Listen address for HTTP-based transports (default `":8080"`).
    pub addr: String,
    /// HTTP path prefix for the MCP endpoint (default `"/mcp"`).
    pub base_path: String,
    /// Proto-derived default base path. If set, takes precedence over
    /// `base_path`.
    pub generated_base_path: String,
    /// HTTP header to gRPC metadata forwarding configuration.
    pub header_mappings: Vec<HeaderMapping>,
    /// When non-empty, registers an HTTP GET endpoint performing a gRPC
    /// health check through `health_check_channel`.
    pub health_check_path: String,
    /// gRPC channel probed by the health endpoint. The backend must serve
    /// `grpc.health.v1.Health`.
    pub health_check_channel: Option<tonic::transport::Channel>,
    /// Called after the base path is resolved, just before the server starts
    /// listening. Use this to log or inspect the final endpoint.
    pub on_ready: Option<std::sync::Arc<dyn Fn(&McpServerConfig) + Send + Sync>>,
}

impl McpServerConfig {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    /// The transports to serve: the list if non-empty, else the scalar, else
    /// streamable-http.
    pub fn effective_transports(&self) -> Vec<Transport> {
        if !self.transports.is_empty() {
            return self.transports.clone();
        }
        vec![self.transport.unwrap_or(Transport::StreamableHttp)]
    }

    /// Resolves the effective base path: generated > configured > `/mcp`.
    pub fn resolve_base_path(&self) -> String {
        if !self.generated_base_path.is_empty() {
            self.generated_base_path.clone()
        } else if !self.base_path.is_empty() {
            self.base_path.clone()
        } else {
            "/mcp".to_string()
        }
    }

    /// Resolves the listen address, defaulting to `":8080"`.
    pub fn resolve_addr(&self) -> String {
        if self.addr.is_empty() {
            ":8080".to_string()
        } else {
            self.addr.clone()
        }
    }
}
