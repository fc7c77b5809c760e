//! Request shapes for the two tool operations (spec.md §6). Kept separate
//! from `domain` because these are wire-facing input records — optional
//! strings before parsing, not the validated `MessageWindow` the core wants.

use schemars::JsonSchema;
use serde::Deserialize;

use crate::domain::{Direction, FilterRecord};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ResolveChatRequest {
    /// `@username`, a `t.me/...` URL, a bare username, or a signed numeric id.
    pub input: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FetchHistoryRequest {
    /// Chat reference (same grammar as `resolve_chat_tool.input`), or a
    /// `canonical_id` previously returned by `resolve_chat_tool`.
    pub chat: String,
    /// Inclusive lower bound, ISO-8601 UTC (`Z` or `+00:00` offset only).
    #[serde(default)]
    pub from_date: Option<String>,
    /// Inclusive upper bound, ISO-8601 UTC.
    #[serde(default)]
    pub to_date: Option<String>,
    /// Page size in `[1, 100]`. Defaults to 100.
    #[serde(default)]
    pub page_size: Option<u32>,
    /// Opaque cursor from a previous `fetch_history_tool` call.
    #[serde(default)]
    pub cursor: Option<String>,
    /// Nominal traversal direction for client bookkeeping; pages are always
    /// emitted in ascending `id` order regardless (spec.md §4.E.2).
    #[serde(default)]
    pub direction: Option<Direction>,
    /// Case-insensitive substring search over message text.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub filter: Option<FilterRecord>,
}
