//! Transport layer for the MCP server.
//!
//! - Stdio: standard input/output for CLI integration
//! - HTTP: streamable HTTP for web clients

pub mod http;
pub mod stdio;

pub use http::HttpTransport;
pub use stdio::StdioTransport;

use crate::error::BackendResult;
use std::future::Future;

/// Trait for MCP transport implementations.
pub trait Transport: Send + Sync {
    /// Start the transport and handle requests until shutdown.
    fn run(&self) -> impl Future<Output = BackendResult<()>> + Send;

    /// Name of this transport for logging.
    fn name(&self) -> &'static str;
}
