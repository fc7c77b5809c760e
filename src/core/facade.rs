//! Tool Façade (spec.md §4.G). Adapts the Chat Resolver and History Fetcher
//! to the external tool contract: validates inputs, builds a `MessageWindow`,
//! and shapes outputs — all transport-agnostic, no rmcp/MCP types here. The
//! `adapters::mcp` binding is a thin wrapper around this.
//!
//! Grounded on the teacher's `AuthService`/`SyncService` split (a use-case
//! struct holding `Arc<dyn Port>` dependencies, exposing one method per
//! external operation) — generalized from "drive a TUI menu" to "answer one
//! tool call and return," since the Façade owns no state across calls
//! (spec.md §3 Ownership).

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::cursor;
use crate::core::fetcher::HistoryFetcher;
use crate::core::resolver::ChatResolver;
use crate::domain::{CoreError, Direction, FilterRecord, MessageWindow, Page};

/// Maximum length accepted for the `input`/`chat` reference (spec.md §4.G:
/// "Validate non-empty, length bounded").
const MAX_CHAT_REF_LEN: usize = 256;

/// Input to `fetch_history_tool` (spec.md §6), already stripped of any
/// transport envelope.
#[derive(Debug, Clone, Default)]
pub struct FetchHistoryParams {
    pub chat: String,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub page_size: Option<u32>,
    pub cursor: Option<String>,
    pub direction: Option<Direction>,
    pub search: Option<String>,
    pub filter: Option<FilterRecord>,
}

pub struct ToolFacade {
    resolver: Arc<ChatResolver>,
    fetcher: Arc<HistoryFetcher>,
}

impl ToolFacade {
    pub fn new(resolver: Arc<ChatResolver>, fetcher: Arc<HistoryFetcher>) -> Self {
        Self { resolver, fetcher }
    }

    /// `resolve_chat_tool({input}) -> ChatRef` (spec.md §4.G, §6).
    pub async fn resolve_chat(&self, input: &str) -> Result<crate::domain::ChatRef, CoreError> {
        validate_chat_ref(input)?;
        self.resolver.resolve(input).await
    }

    /// `fetch_history_tool(...) -> Page` (spec.md §4.G, §6).
    pub async fn fetch_history(&self, params: FetchHistoryParams) -> Result<Page, CoreError> {
        validate_chat_ref(&params.chat)?;

        let from_utc = params.from_date.as_deref().map(parse_utc_date).transpose()?;
        let to_utc = params.to_date.as_deref().map(parse_utc_date).transpose()?;

        let chat = self.resolver.resolve(&params.chat).await?;

        let window = MessageWindow {
            chat,
            from_utc,
            to_utc,
            direction: params.direction.unwrap_or_default(),
            page_size: params.page_size.unwrap_or(100),
            search: params.search,
            filter: params.filter,
        };

        self.fetcher.fetch(&window, params.cursor.as_deref()).await
    }

    /// Build a human-readable summary line for `content[0].text` (spec.md
    /// §6): never embeds a raw Telegram error or internal path.
    pub fn summarize_page(page: &Page) -> String {
        if let Some(export) = &page.export {
            format!(
                "{} messages ({} inline, more available), exported to {}",
                page.page_info.total_fetched,
                page.messages.len(),
                export.uri
            )
        } else if page.page_info.has_more {
            format!(
                "{} messages, {} more available",
                page.messages.len(),
                page.page_info.total_fetched
            )
        } else {
            format!("{} messages, end of window reached", page.messages.len())
        }
    }
}

fn validate_chat_ref(input: &str) -> Result<(), CoreError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("chat reference must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_CHAT_REF_LEN {
        return Err(CoreError::Validation(format!(
            "chat reference must be at most {MAX_CHAT_REF_LEN} characters"
        )));
    }
    Ok(())
}

/// Parse an ISO-8601 datetime, rejecting anything not UTC (spec.md §9:
/// "any non-UTC input is a VALIDATION_ERROR"). Accepts both `Z` and `+00:00`
/// spellings of the zero offset; a bare date or an offset timestamp is
/// rejected rather than silently reinterpreted.
fn parse_utc_date(s: &str) -> Result<DateTime<Utc>, CoreError> {
    let parsed = DateTime::parse_from_rfc3339(s)
        .map_err(|e| CoreError::Validation(format!("invalid ISO-8601 UTC datetime {s:?}: {e}")))?;
    if parsed.offset().local_minus_utc() != 0 {
        return Err(CoreError::Validation(format!(
            "datetime {s:?} must be UTC (offset +00:00 / Z), got a non-UTC offset"
        )));
    }
    Ok(parsed.with_timezone(&Utc))
}

/// Decode a cursor against the given window without a fetch round-trip,
/// useful for an early `VALIDATION_ERROR` on window-hash mismatch before
/// the Façade ever calls the Fetcher (spec.md §8 invariant 4).
pub fn validate_cursor_for_window(opaque: &str, window: &MessageWindow) -> Result<(), CoreError> {
    cursor::decode(opaque, window).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::wait::WaitConfig;
    use crate::domain::{ChatKind, ChatRef, GatewayError, MediaKind, Message, Sender};
    use crate::ports::{RawBatch, TgGateway};
    use crate::resource::ResourceManager;
    use chrono::TimeZone;
    use std::time::Duration;
    use tempfile::TempDir;

    struct FakeGateway;

    #[async_trait::async_trait]
    impl TgGateway for FakeGateway {
        async fn resolve_entity(&self, input: &str) -> Result<ChatRef, GatewayError> {
            if input == "private" {
                return Err(GatewayError::Other(CoreError::ChannelPrivate));
            }
            Ok(ChatRef {
                canonical_id: 42,
                kind: ChatKind::Channel,
                username: Some(input.to_string()),
                title: "Example".into(),
                description: None,
                member_count: None,
                verified: None,
            })
        }

        async fn get_messages(
            &self,
            _chat_id: i64,
            min_id: i32,
            _max_id: i32,
            _offset_date: Option<i64>,
            limit: i32,
        ) -> Result<RawBatch, GatewayError> {
            let messages: Vec<Message> = (min_id + 1..min_id + 1 + limit.min(5))
                .map(|id| Message {
                    id,
                    date: Utc.timestamp_opt(1_700_000_000 + id as i64, 0).unwrap(),
                    text: format!("msg {id}"),
                    sender: Sender {
                        id: 1,
                        username: None,
                        display: None,
                        is_bot: None,
                        verified: None,
                    },
                    views: None,
                    forwards: None,
                    replies: None,
                    reactions: None,
                    pinned: false,
                    silent: false,
                    post: false,
                    noforwards: false,
                    media_type: MediaKind::Text,
                    has_media: false,
                    reply_to_id: None,
                    topic_id: None,
                    edit_date: None,
                })
                .rev()
                .collect();
            Ok(RawBatch {
                messages,
                provider_has_more: false,
            })
        }
    }

    async fn facade() -> (ToolFacade, TempDir) {
        let gateway = Arc::new(FakeGateway);
        let resolver = Arc::new(ChatResolver::new(gateway.clone(), WaitConfig::default(), false));
        let dir = TempDir::new().unwrap();
        let rm = Arc::new(ResourceManager::new(dir.path().to_path_buf(), Duration::from_secs(3600)));
        let fetcher = Arc::new(HistoryFetcher::new(
            gateway,
            rm,
            WaitConfig::default(),
            Default::default(),
        ));
        (ToolFacade::new(resolver, fetcher), dir)
    }

    #[tokio::test]
    async fn resolve_chat_rejects_empty_input() {
        let (facade, _dir) = facade().await;
        let err = facade.resolve_chat("   ").await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn resolve_chat_propagates_channel_private() {
        let (facade, _dir) = facade().await;
        let err = facade.resolve_chat("private").await.unwrap_err();
        assert!(matches!(err, CoreError::ChannelPrivate));
    }

    #[tokio::test]
    async fn fetch_history_rejects_non_utc_dates() {
        let (facade, _dir) = facade().await;
        let params = FetchHistoryParams {
            chat: "@example".into(),
            from_date: Some("2024-01-01T00:00:00+02:00".into()),
            page_size: Some(10),
            ..Default::default()
        };
        let err = facade.fetch_history(params).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn fetch_history_accepts_zulu_dates_and_builds_a_page() {
        let (facade, _dir) = facade().await;
        let params = FetchHistoryParams {
            chat: "@example".into(),
            from_date: Some("2020-01-01T00:00:00Z".into()),
            to_date: Some("2030-01-01T00:00:00Z".into()),
            page_size: Some(5),
            ..Default::default()
        };
        let page = facade.fetch_history(params).await.unwrap();
        assert_eq!(page.messages.len(), 5);
    }

    #[test]
    fn summarize_page_mentions_export_uri() {
        let page = Page {
            messages: vec![],
            page_info: crate::domain::PageInfo {
                has_more: false,
                cursor: None,
                total_fetched: 1200,
            },
            export: Some(crate::domain::ExportInfo {
                uri: "artifact://abc".into(),
                format: "ndjson".into(),
            }),
        };
        assert!(ToolFacade::summarize_page(&page).contains("artifact://abc"));
    }
}
