//! Domain errors. Used by ports and core components.
//!
//! Adapters map infrastructure errors into these; the Tool Façade maps these
//! into the wire error taxonomy (spec.md §7) without ever forwarding a raw
//! Telegram error string to the caller.

use schemars::JsonSchema;
use serde::Serialize;
use thiserror::Error;

/// Error kinds from spec.md §7, one variant per taxonomy row.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("chat not found")]
    ChatNotFound,

    #[error("invalid username: {0}")]
    UsernameInvalid(String),

    #[error("chat is not publicly accessible")]
    ChannelPrivate,

    /// Provider asked for a wait beyond budget. Carries the wait and a
    /// best-effort resumable cursor (spec.md §4.E.6).
    #[error("rate limited: retry after {retry_after_seconds}s")]
    RateLimited {
        retry_after_seconds: u64,
        resumable_cursor: Option<String>,
    },

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("artifact expired or not found")]
    ResourceExpired,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Transport-level gateway errors, classified by the Wait Controller before
/// they are translated into `CoreError`. Kept separate from `CoreError` so
/// the Wait Controller can distinguish "retry silently" from "give up and
/// surface" without re-parsing strings.
#[derive(Debug, Clone)]
pub enum GatewayError {
    /// Provider-signalled rate limit (MTProto FLOOD_WAIT), carrying the
    /// number of seconds the provider asked us to wait.
    RateLimited { retry_after_seconds: u64 },
    /// Transient network / generic server error, worth a bounded retry.
    Transient(String),
    /// Anything else — not retryable, propagate immediately.
    Other(CoreError),
}

impl From<GatewayError> for CoreError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::RateLimited {
                retry_after_seconds,
            } => CoreError::RateLimited {
                retry_after_seconds,
                resumable_cursor: None,
            },
            GatewayError::Transient(msg) => CoreError::Unavailable(msg),
            GatewayError::Other(e) => e,
        }
    }
}

/// Wire error shape (spec.md §6): `{type, title, status, detail}`, plus
/// `retry_after`/`cursor` for `RATE_LIMITED` so a caller can resume without
/// re-parsing `detail`. The Façade (`core::facade`) is the only place that
/// produces one — no other component ever serializes a `CoreError` directly.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct WireError {
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl CoreError {
    /// Map to the wire taxonomy of spec.md §7. Never includes the raw
    /// Telegram error string verbatim — `Unavailable`/`Internal` carry a
    /// generic `detail`, the underlying message only reaches server logs.
    pub fn to_wire(&self) -> WireError {
        match self {
            CoreError::Validation(msg) => WireError {
                r#type: "VALIDATION_ERROR".into(),
                title: "Request failed validation".into(),
                status: 400,
                detail: msg.clone(),
                retry_after: None,
                cursor: None,
            },
            CoreError::ChatNotFound => WireError {
                r#type: "CHAT_NOT_FOUND".into(),
                title: "Chat not found".into(),
                status: 404,
                detail: "no public chat matches the given reference".into(),
                retry_after: None,
                cursor: None,
            },
            CoreError::UsernameInvalid(msg) => WireError {
                r#type: "USERNAME_INVALID".into(),
                title: "Invalid username".into(),
                status: 400,
                detail: msg.clone(),
                retry_after: None,
                cursor: None,
            },
            CoreError::ChannelPrivate => WireError {
                r#type: "CHANNEL_PRIVATE".into(),
                title: "Chat is not publicly accessible".into(),
                status: 403,
                detail: "private groups and invite-only channels cannot be exported".into(),
                retry_after: None,
                cursor: None,
            },
            CoreError::RateLimited {
                retry_after_seconds,
                resumable_cursor,
            } => WireError {
                r#type: "RATE_LIMITED".into(),
                title: "Rate limited by Telegram".into(),
                status: 429,
                detail: format!("retry after {retry_after_seconds}s"),
                retry_after: Some(*retry_after_seconds),
                cursor: resumable_cursor.clone(),
            },
            CoreError::Unavailable(_) => WireError {
                r#type: "UNAVAILABLE".into(),
                title: "Telegram is temporarily unavailable".into(),
                status: 503,
                detail: "transient provider error after retries; safe to retry".into(),
                retry_after: None,
                cursor: None,
            },
            CoreError::ResourceExpired => WireError {
                r#type: "RESOURCE_EXPIRED".into(),
                title: "Export artifact expired".into(),
                status: 404,
                detail: "the artifact TTL has elapsed or the URI is unknown".into(),
                retry_after: None,
                cursor: None,
            },
            CoreError::Internal(_) => WireError {
                r#type: "INTERNAL_ERROR".into(),
                title: "Internal error".into(),
                status: 500,
                detail: "an uncategorized internal error occurred".into(),
                retry_after: None,
                cursor: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_maps_to_400() {
        let wire = CoreError::Validation("bad page_size".into()).to_wire();
        assert_eq!(wire.r#type, "VALIDATION_ERROR");
        assert_eq!(wire.status, 400);
        assert_eq!(wire.detail, "bad page_size");
    }

    #[test]
    fn rate_limited_carries_retry_after_and_cursor() {
        let wire = CoreError::RateLimited {
            retry_after_seconds: 120,
            resumable_cursor: Some("abc".into()),
        }
        .to_wire();
        assert_eq!(wire.r#type, "RATE_LIMITED");
        assert_eq!(wire.status, 429);
        assert_eq!(wire.retry_after, Some(120));
        assert_eq!(wire.cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn internal_and_unavailable_never_echo_raw_message() {
        let wire = CoreError::Unavailable("FLOOD_WAIT_420 raw rpc detail".into()).to_wire();
        assert!(!wire.detail.contains("FLOOD_WAIT_420"));
        let wire = CoreError::Internal("panic at src/foo.rs:42".into()).to_wire();
        assert!(!wire.detail.contains("src/foo.rs"));
    }
}
