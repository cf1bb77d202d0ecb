//! Supabase MCP Server - Main entry point.
//!
//! Exposes SQL execution, schema inspection, migrations and row-level CRUD
//! against a hosted Supabase Postgres database as MCP tools.

use clap::Parser;
use std::sync::Arc;
use supabase_mcp_server::backend::{BackendClient, PgBackend};
use supabase_mcp_server::config::{Config, TransportMode};
use supabase_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    init_tracing(&config);

    info!(
        transport = %config.transport,
        "Starting Supabase MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    // The backend client is constructed once and injected everywhere;
    // nothing else in the crate opens database connections.
    let backend: Arc<dyn BackendClient> = Arc::new(PgBackend::connect(&config).await?);
    info!(url = %config.redacted_url(), "Database connection established");

    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            StdioTransport::new(backend).run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            HttpTransport::new(
                backend,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            )
            .run()
            .await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
