//! Error types for the gRPC-MCP gateway

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the gateway
///
/// This enum covers all possible errors that can occur in the code generator
/// and the serving runtime, including gRPC errors, descriptor errors, and
/// transport errors.
#[derive(Error, Debug)]
pub enum Error {
    /// gRPC call errors
    #[error("gRPC error: {0}")]
    Grpc(#[from] tonic::Status),

    /// gRPC transport errors
    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Code generator errors (bad parameters, malformed output)
    #[error("generator error: {0}")]
    Generator(String),

    /// Descriptor decoding or lookup errors
    #[error("descriptor error: {0}")]
    Descriptor(String),

    /// Invalid runtime configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Unsupported MCP transport value
    #[error("unsupported transport: {0:?}")]
    UnsupportedTransport(String),

    /// MCP framing / serving errors
    #[error("MCP error: {0}")]
    Mcp(String),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other error
    #[error("error: {0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Build a generator error from anything displayable.
    pub fn generator(msg: impl std::fmt::Display) -> Self {
        Error::Generator(msg.to_string())
    }

    /// Build a descriptor error from anything displayable.
    pub fn descriptor(msg: impl std::fmt::Display) -> Self {
        Error::Descriptor(msg.to_string())
    }
}
