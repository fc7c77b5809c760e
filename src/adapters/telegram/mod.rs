//! Telegram (MTProto) adapters: the `TgGateway`/`AuthPort` implementations,
//! the wire-to-domain mapper, and session storage.

pub mod auth_adapter;
pub mod client;
pub mod mapper;
pub mod session;

pub use auth_adapter::GrammersAuthAdapter;
pub use client::GrammersTgGateway;
