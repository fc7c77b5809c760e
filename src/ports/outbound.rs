//! Outbound ports. Core components call into infrastructure through these.
//!
//! Implemented by adapters (Telegram MTProto via `grammers-client`).

use crate::domain::{ChatRef, CoreError, GatewayError, Message, SignInResult};

/// A batch of raw provider messages plus whether more remain in the
/// direction iterated (before filtering/window-clipping by the caller).
#[derive(Debug, Clone, Default)]
pub struct RawBatch {
    pub messages: Vec<Message>,
    /// True if the provider iterator had at least one more candidate beyond
    /// this batch (irrespective of window/filter — purely "more raw data").
    pub provider_has_more: bool,
}

/// Telegram gateway. Resolves entities and iterates message history.
///
/// Returns `GatewayError` rather than `CoreError` directly: callers route
/// every call through the Wait Controller (spec.md §4.C), which classifies
/// `RateLimited`/`Transient`/`Other` before translating to the wire error
/// taxonomy. Implementations should never sleep-and-retry themselves — that
/// is the Wait Controller's job.
#[async_trait::async_trait]
pub trait TgGateway: Send + Sync {
    /// Resolve `input` (username, t.me URL, bare username, or numeric id) to
    /// a canonical entity descriptor. Must reject private/invite-only
    /// entities with `GatewayError::Other(CoreError::ChannelPrivate)`.
    async fn resolve_entity(&self, input: &str) -> Result<ChatRef, GatewayError>;

    /// Fetch up to `limit` raw messages from `chat_id`, newest-first
    /// (Telegram's native order), with `min_id`/`max_id` bounds identical in
    /// meaning to MTProto's `messages.getHistory`: `min_id` excludes
    /// messages at or below it, `max_id` (when nonzero) excludes messages at
    /// or above it. `offset_date`, when set, additionally bounds by date
    /// (used when the window's lower bound is tighter than any known id).
    async fn get_messages(
        &self,
        chat_id: i64,
        min_id: i32,
        max_id: i32,
        offset_date: Option<i64>,
        limit: i32,
    ) -> Result<RawBatch, GatewayError>;
}

/// Authentication port. Checks auth state and performs the one-time
/// login/2FA flow via Telegram. Not part of the MCP tool surface — driven
/// by the `tg-history-login` setup binary before the server ever starts.
#[async_trait::async_trait]
pub trait AuthPort: Send + Sync {
    async fn is_authenticated(&self) -> Result<bool, CoreError>;
    async fn request_login_code(&self, phone: &str, api_hash: &str) -> Result<(), CoreError>;
    async fn sign_in(&self, code: &str) -> Result<SignInResult, CoreError>;
    async fn check_password(&self, password: &[u8]) -> Result<(), CoreError>;
}
