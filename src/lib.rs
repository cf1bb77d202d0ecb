//! Supabase MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools for AI assistants
//! to interact with a hosted Supabase Postgres database: SQL execution, schema
//! inspection, migrations, and row-level CRUD.
//!
//! The core is a validated command-dispatch pipeline:
//! tool invocation -> [`tools::validate`] -> [`models::Command`] ->
//! [`tools::execute`] -> [`backend::BackendClient`] -> [`models::ResponseEnvelope`].

pub mod backend;
pub mod config;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::{BackendError, ErrorInfo, ErrorKind, ValidationError};
pub use mcp::SupabaseService;
pub use models::{Command, ResponseEnvelope};
