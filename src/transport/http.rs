//! Streamable HTTP transport for the MCP server.
//!
//! Suitable for web-based MCP integrations; sessions are managed locally
//! and responses stream over SSE.

use crate::backend::BackendClient;
use crate::error::{BackendError, BackendResult};
use crate::mcp::SupabaseService;
use crate::transport::Transport;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// HTTP transport implementation with streamable HTTP support.
pub struct HttpTransport {
    backend: Arc<dyn BackendClient>,
    host: String,
    port: u16,
    /// MCP endpoint path, e.g. "/mcp"
    endpoint: String,
}

impl HttpTransport {
    pub fn new(
        backend: Arc<dyn BackendClient>,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            host: host.into(),
            port,
            endpoint: endpoint.into(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> BackendResult<()> {
        let bind_addr = self.bind_addr();
        info!("Starting MCP server with HTTP transport on {}", bind_addr);

        let backend = self.backend.clone();
        let service = StreamableHttpService::new(
            move || Ok(SupabaseService::new(backend.clone())),
            LocalSessionManager::default().into(),
            Default::default(),
        );

        // nest_service doesn't support the root path "/"
        let app = if self.endpoint == "/" {
            axum::Router::new().fallback_service(service)
        } else {
            axum::Router::new().nest_service(&self.endpoint, service)
        };

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            BackendError::connection(format!("Failed to bind to {bind_addr}: {e}"))
        })?;

        info!(endpoint = %self.endpoint, "MCP endpoint ready");

        // SSE connections may keep the server alive indefinitely, so
        // shutdown is forced after a timeout once a signal is received
        const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();

        let shutdown_signal = async move {
            wait_for_signal().await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        tokio::select! {
            result = server => {
                match result {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        return Err(BackendError::connection(format!(
                            "HTTP server error: {e}"
                        )));
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for connections to close (send signal again to force exit)..."
                );

                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => {}
        }

        info!("Closing database connections");
        self.backend.close().await;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendResult;
    use crate::models::*;
    use async_trait::async_trait;

    struct NullBackend;

    #[async_trait]
    impl BackendClient for NullBackend {
        async fn execute_sql(&self, _sql: &str) -> BackendResult<QueryResult> {
            Ok(QueryResult::default())
        }
        async fn list_tables(&self, _: &ListTablesParams) -> BackendResult<Vec<TableInfo>> {
            Ok(vec![])
        }
        async fn describe_table(&self, p: &DescribeTableParams) -> BackendResult<TableSchema> {
            Err(crate::error::BackendError::not_found(p.table.clone()))
        }
        async fn list_extensions(&self) -> BackendResult<Vec<ExtensionInfo>> {
            Ok(vec![])
        }
        async fn list_migrations(&self) -> BackendResult<Vec<MigrationInfo>> {
            Ok(vec![])
        }
        async fn apply_migration(&self, name: &str, _: &str) -> BackendResult<AppliedMigration> {
            Ok(AppliedMigration {
                version: "0".into(),
                name: name.into(),
            })
        }
        async fn read_rows(&self, _: &ReadRowsParams) -> BackendResult<QueryResult> {
            Ok(QueryResult::default())
        }
        async fn insert_rows(&self, _: &InsertRowsParams) -> BackendResult<QueryResult> {
            Ok(QueryResult::default())
        }
        async fn update_rows(&self, _: &UpdateRowsParams) -> BackendResult<QueryResult> {
            Ok(QueryResult::default())
        }
        async fn delete_rows(&self, _: &DeleteRowsParams) -> BackendResult<QueryResult> {
            Ok(QueryResult::default())
        }
    }

    #[test]
    fn test_http_transport_bind_addr() {
        let transport = HttpTransport::new(Arc::new(NullBackend), "127.0.0.1", 8080, "/mcp");
        assert_eq!(transport.name(), "http");
        assert_eq!(transport.bind_addr(), "127.0.0.1:8080");
        assert_eq!(transport.endpoint(), "/mcp");
    }
}
