//! Infrastructure adapters. Implement outbound ports and the Tool Façade.
//!
//! Telegram (MTProto) and MCP (stdio tool transport). Map errors to the
//! typed domain taxonomy before they cross either boundary.

pub mod mcp;
pub mod telegram;

pub use mcp::TgHistoryServer;
