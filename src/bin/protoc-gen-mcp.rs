//! protoc plugin that publishes every gRPC method as an MCP tool.
//!
//! Driven by the standard protoc plugin contract: a `CodeGeneratorRequest`
//! arrives on stdin, a `CodeGeneratorResponse` leaves on stdout. Parameters
//! are passed through protoc, e.g.:
//!
//! ```text
//! protoc --plugin=protoc-gen-mcp --mcp_out=gen --mcp_opt=lang=rust todo.proto
//! ```

use std::io::{Read, Write};

use prost::Message;

use grpc_mcp_gateway::plugin;

fn main() -> grpc_mcp_gateway::Result<()> {
    // stdout carries the plugin response; diagnostics must go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if std::env::args().any(|arg| arg == "--version") {
        println!("{}", plugin::version_banner());
        return Ok(());
    }

    let mut input = Vec::new();
    std::io::stdin().read_to_end(&mut input)?;

    let response = plugin::run(&input)?;

    let mut output = Vec::new();
    response
        .encode(&mut output)
        .map_err(|err| grpc_mcp_gateway::Error::descriptor(format!("encode response: {err}")))?;
    std::io::stdout().write_all(&output)?;
    Ok(())
}
