//! The validated command-dispatch pipeline.
//!
//! - `validate`: tool name + argument map -> typed [`crate::models::Command`]
//! - `executor`: command -> one backend call -> response envelope

pub mod executor;
pub mod validate;

pub use executor::{execute, handle_invocation};
pub use validate::{validate, ToolSpec, TOOL_SPECS};
