//! MCP protocol integration.

pub mod service;

pub use service::SupabaseService;
