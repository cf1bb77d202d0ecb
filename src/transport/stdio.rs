//! Stdio transport for the MCP server.
//!
//! Reads JSON-RPC messages from stdin and writes responses to stdout,
//! the standard mode for CLI-based MCP integrations.

use crate::backend::BackendClient;
use crate::error::{BackendError, BackendResult};
use crate::mcp::SupabaseService;
use crate::transport::Transport;
use rmcp::{transport::stdio, ServiceExt};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

/// Stdio transport implementation.
pub struct StdioTransport {
    backend: Arc<dyn BackendClient>,
}

impl StdioTransport {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> BackendResult<()> {
        info!("Starting MCP server with stdio transport");

        let service = SupabaseService::new(self.backend.clone());
        let running_service = service.serve(stdio()).await.map_err(|e| {
            BackendError::connection(format!("Failed to start stdio transport: {e}"))
        })?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => info!("Stdio transport completed normally"),
                    Err(e) => {
                        tracing::warn!(error = %e, "Stdio transport error");
                        return Err(BackendError::connection(format!(
                            "Stdio transport error: {e}"
                        )));
                    }
                }
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received");
                true
            }
        };

        info!("Closing database connections");
        self.backend.close().await;

        if shutdown_requested {
            // tokio::select! cannot interrupt a blocking stdin read, so a
            // clean return is not possible once a signal arrived
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_signal() {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
