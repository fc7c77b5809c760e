//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;

pub use entities::{
    Artifact, ChatKind, ChatRef, Direction, ExportInfo, FilterRecord, Message, MessageWindow,
    MediaKind, Page, PageInfo, Sender, SignInResult,
};
pub use errors::{CoreError, GatewayError, WireError};
