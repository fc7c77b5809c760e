//! Domain entities. Pure data structures for the core business.
//!
//! No Telegram/IO types here — these are mapped from adapters.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Canonical identifier for a public chat, produced by the Chat Resolver.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChatRef {
    pub canonical_id: i64,
    pub kind: ChatKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    User,
    Group,
    Channel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Desc
    }
}

/// The requested slice of history. Immutable per call.
#[derive(Debug, Clone)]
pub struct MessageWindow {
    pub chat: ChatRef,
    pub from_utc: Option<DateTime<Utc>>,
    pub to_utc: Option<DateTime<Utc>>,
    pub direction: Direction,
    pub page_size: u32,
    pub search: Option<String>,
    pub filter: Option<FilterRecord>,
}

/// Recognized filter options. Any absent field is "no constraint"; all
/// present constraints AND-combine (spec.md §4.B).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FilterRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_types: Option<Vec<MediaKind>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_media: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_users: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_views: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_views: Option<i64>,
}

/// Deterministic, total classification of a message's media facet.
/// Variant order mirrors the precedence list in spec.md §4.B (photo wins
/// over video wins over ... wins over text) — `classify_media` relies on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
    Document,
    Audio,
    Voice,
    Sticker,
    Poll,
    Link,
    Text,
}

/// A Telegram sender, projected for external consumption.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Sender {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_bot: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

/// A single exported message (external shape, spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Message {
    pub id: i32,
    pub date: DateTime<Utc>,
    pub text: String,
    pub sender: Sender,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forwards: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactions: Option<i64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pinned: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub silent: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub post: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub noforwards: bool,
    pub media_type: MediaKind,
    pub has_media: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_date: Option<DateTime<Utc>>,
}

/// Pagination metadata returned alongside a Page.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageInfo {
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub total_fetched: usize,
}

/// Reference to a materialized NDJSON export, when the result was large
/// enough to divert to the Resource Manager.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExportInfo {
    pub uri: String,
    pub format: String,
}

/// The History Fetcher's output.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Page {
    pub messages: Vec<Message>,
    pub page_info: PageInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportInfo>,
}

/// Metadata for a Resource Manager-owned NDJSON artifact.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub uri: String,
    pub created_at: DateTime<Utc>,
    pub ttl: std::time::Duration,
    pub chat_canonical: i64,
    pub window_hash: String,
    pub size_bytes: u64,
    pub message_count: usize,
}

impl Artifact {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.created_at + chrono::Duration::from_std(self.ttl).unwrap_or_default()
    }
}

/// Result of one step of the login flow run by the out-of-band setup
/// bootstrap (see `bin/login.rs`); not part of the MCP tool surface.
#[derive(Debug, Clone)]
pub enum SignInResult {
    Success,
    PasswordRequired { hint: Option<String> },
}
