//! Data models
//!
//! Shared between the server and frontend (via API).
//! All wire field names are camelCase to match the client contract.

pub mod order;
pub mod role;

// Re-exports
pub use order::*;
pub use role::*;
