//! tg-history-mcp: read-only MCP server exporting historical messages from
//! public Telegram chats/channels over bounded UTC windows.

pub mod adapters;
pub mod core;
pub mod domain;
pub mod ports;
pub mod resource;
pub mod shared;
