//! Port traits. API boundaries for the hexagon.
//!
//! Outbound: called by core components into infrastructure (Telegram).

pub mod outbound;

pub use outbound::{AuthPort, RawBatch, TgGateway};
