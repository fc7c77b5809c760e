//! History Fetcher (spec.md §4.E, "the hardest subsystem"). Iterates a
//! chat's message history over a UTC window, honoring cursor, page size,
//! filter and search, presenting strictly ascending `id` order per page.
//!
//! Grounded on `usecases/sync_service.rs::sync_chat`, which already
//! distrusts the provider's bound enforcement (re-checks `min_id`/`max_id`
//! client-side) and paces calls through a rate limiter. This crate keeps
//! that posture but replaces "sync into a local store" with "emit one Page
//! and stop" — no per-cursor state survives the call (spec.md §3 Ownership).
//!
//! **Scan policy** (spec.md §4.E.2 requires picking one of two equivalent
//! strategies and documenting it): this implementation always uses
//! reverse-scan with manual reversal — each internal provider read asks for
//! messages above a floor id, newest-first (the provider's native order),
//! and the accepted batch is reversed to ascending before emission. This is
//! the cheaper of the two against `messages.getHistory`-shaped APIs, which
//! anchor "backward from here," not "forward from there." The window's
//! `direction` field is carried through the cursor for client bookkeeping
//! but does not change the scan: invariant 2 mandates ascending emission
//! regardless of the nominal traversal direction.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::core::cursor::{self, CursorState};
use crate::core::filter;
use crate::core::wait::{self, WaitConfig};
use crate::domain::{
    CoreError, Direction, ExportInfo, GatewayError, Message, MessageWindow, Page, PageInfo,
};
use crate::ports::TgGateway;
use crate::resource::ResourceManager;

/// Tunables beyond the Wait Controller's own config (spec.md §6).
#[derive(Debug, Clone, Copy)]
pub struct FetcherConfig {
    pub max_page_size: u32,
    pub export_threshold: usize,
    pub inner_read_multiplier: u32,
    pub request_timeout_seconds: u64,
    /// Hard cap on internal provider reads per call, bounding worst-case
    /// effort when a filter rejects most candidates (spec.md §4.E.5's
    /// "MUST cap the effort per call" — resolved in DESIGN.md as: keep
    /// reading internally, batch after batch, until a match accumulates or
    /// this cap is hit, rather than returning an empty page immediately).
    pub max_inner_batches: u32,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_page_size: 100,
            export_threshold: 500,
            inner_read_multiplier: 2,
            request_timeout_seconds: 30,
            max_inner_batches: 50,
        }
    }
}

pub struct HistoryFetcher {
    gateway: Arc<dyn TgGateway>,
    resource_manager: Arc<ResourceManager>,
    wait_config: WaitConfig,
    config: FetcherConfig,
}

impl HistoryFetcher {
    pub fn new(
        gateway: Arc<dyn TgGateway>,
        resource_manager: Arc<ResourceManager>,
        wait_config: WaitConfig,
        config: FetcherConfig,
    ) -> Self {
        Self {
            gateway,
            resource_manager,
            wait_config,
            config,
        }
    }

    pub async fn fetch(&self, window: &MessageWindow, cursor: Option<&str>) -> Result<Page, CoreError> {
        validate_window(window, self.config.max_page_size)?;

        let page_size = window.page_size as usize;

        match cursor {
            None => self.fetch_first_page(window, page_size).await,
            Some(opaque) => {
                let state = cursor::decode(opaque, window)?;
                self.fetch_next_page(window, page_size, state).await
            }
        }
    }

    /// First call of a traversal: probe up to `export_threshold + 1` matches
    /// (bounded by `max_inner_batches`, same as any other page build) so we
    /// can tell, cheaply, whether this window is "large". If it is, the
    /// probe result is discarded and the *entire* window is rescanned
    /// without a batch or result cap, so the export artifact holds every
    /// matching message, not just the probe-sized prefix (spec.md §4.F, §8
    /// scenario 5: "the NDJSON file contains all 1,200 messages").
    async fn fetch_first_page(&self, window: &MessageWindow, page_size: usize) -> Result<Page, CoreError> {
        let cap = self.config.export_threshold + 1;
        let probe = self
            .scan_matches(window, 0, None, cap, Some(self.config.max_inner_batches))
            .await?;

        if probe.len() > self.config.export_threshold {
            let full = self.scan_matches(window, 0, None, usize::MAX, None).await?;
            let artifact = self.resource_manager.create(&full, window).await?;
            let total_fetched = full.len();
            let inline = full.into_iter().take(page_size).collect::<Vec<_>>();
            return Ok(Page {
                messages: inline,
                page_info: PageInfo {
                    has_more: false,
                    cursor: None,
                    total_fetched,
                },
                export: Some(ExportInfo {
                    uri: artifact.uri,
                    format: "ndjson".to_string(),
                }),
            });
        }

        Ok(self.build_page(window, probe, page_size, 0))
    }

    async fn fetch_next_page(
        &self,
        window: &MessageWindow,
        page_size: usize,
        state: CursorState,
    ) -> Result<Page, CoreError> {
        let cap = page_size;
        let matched = self
            .scan_matches(
                window,
                state.offset_id,
                state.offset_date,
                cap + 1,
                Some(self.config.max_inner_batches),
            )
            .await
            .map_err(|e| attach_resumable_cursor(e, || cursor::encode(&state)))?;
        Ok(self.build_page(window, matched, page_size, state.fetched_count))
    }

    /// Trim `matched` (already capped at `page_size + 1` in the caller, or
    /// at `export_threshold + 1` on the first page) to a `page_size`-bounded
    /// Page with a cursor when more remain.
    fn build_page(
        &self,
        window: &MessageWindow,
        matched: Vec<Message>,
        page_size: usize,
        fetched_before: usize,
    ) -> Page {
        let has_more = matched.len() > page_size;
        let mut messages = matched;
        messages.truncate(page_size);

        let fetched_count = fetched_before + messages.len();
        let cursor_token = if has_more {
            let last = messages.last().expect("has_more implies a non-empty page");
            let state = CursorState {
                offset_id: last.id,
                offset_date: Some(last.date.timestamp()),
                direction: window.direction,
                fetched_count,
                window_hash: cursor::window_hash(window),
            };
            Some(cursor::encode(&state))
        } else {
            None
        };

        Page {
            messages,
            page_info: PageInfo {
                has_more,
                cursor: cursor_token,
                total_fetched: fetched_count,
            },
            export: None,
        }
    }

    /// Scan ascending from `floor_id` (exclusive) until `cap` matches
    /// accumulate or the window is exhausted (provider exhaustion, the
    /// `from_utc` boundary crossed, or `max_batches` reached).
    ///
    /// `floor_id` stays fixed across every inner batch read — it is the
    /// caller's cursor/window lower bound, passed as MTProto's `min_id`.
    /// What narrows between batches is `ceiling`, passed as `max_id`: the
    /// provider always answers "the newest messages above `min_id`," so
    /// walking further back means excluding everything at or above the
    /// lowest id already seen, not raising `min_id` (which would re-ask for
    /// the same newest slice forever and never make progress toward the
    /// floor).
    ///
    /// `max_batches` bounds effort when building one page (`Some(max_inner_batches)`,
    /// spec.md §4.E.5's "MUST cap the effort per call"); pass `None` to scan
    /// to true exhaustion regardless of batch count — used when materializing
    /// an export artifact, which must hold every matching message in the
    /// window (spec.md §4.F, §8 scenario 5), not just a capped prefix.
    async fn scan_matches(
        &self,
        window: &MessageWindow,
        floor_id: i32,
        initial_offset_date: Option<i64>,
        cap: usize,
        max_batches: Option<u32>,
    ) -> Result<Vec<Message>, CoreError> {
        let mut accepted: Vec<Message> = Vec::new();
        let mut seen: HashSet<i32> = HashSet::new();
        let mut ceiling: i32 = 0;
        let mut offset_date = initial_offset_date.or_else(|| window.to_utc.map(|d| d.timestamp()));
        let batch_limit =
            (window.page_size * self.config.inner_read_multiplier.max(1)).clamp(1, 200) as i32;

        let mut batches_run: u32 = 0;
        loop {
            if accepted.len() >= cap {
                break;
            }
            if let Some(limit) = max_batches {
                if batches_run >= limit {
                    break;
                }
            }
            batches_run += 1;

            let gateway = Arc::clone(&self.gateway);
            let timeout = Duration::from_secs(self.config.request_timeout_seconds);
            let od = offset_date;
            let batch = wait::with_retry(&self.wait_config, move || {
                let gateway = Arc::clone(&gateway);
                async move {
                    match tokio::time::timeout(
                        timeout,
                        gateway.get_messages(window_chat_id(window), floor_id, ceiling, od, batch_limit),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(GatewayError::Transient("provider call timed out".into())),
                    }
                }
            })
            .await?;

            offset_date = None;

            if batch.messages.is_empty() {
                break;
            }

            let mut crossed_from_utc = false;

            for message in &batch.messages {
                if let Some(to_utc) = window.to_utc {
                    if message.date > to_utc {
                        continue;
                    }
                }
                if let Some(from_utc) = window.from_utc {
                    if message.date < from_utc {
                        crossed_from_utc = true;
                        break;
                    }
                }
                if !seen.insert(message.id) {
                    continue;
                }
                if let Some(ref record) = window.filter {
                    if !filter::matches(message, record) {
                        continue;
                    }
                }
                if let Some(ref search) = window.search {
                    if !filter::matches_search(message, search) {
                        continue;
                    }
                }
                accepted.push(message.clone());
                if accepted.len() >= cap {
                    break;
                }
            }

            // Messages arrive newest-first; the lowest id in this batch
            // becomes the exclusive ceiling for the next read, so the next
            // batch walks further back instead of re-reading the same slice.
            let lowest = batch.messages.iter().map(|m| m.id).min();
            match lowest {
                Some(lowest) if lowest > floor_id => ceiling = lowest,
                _ => break,
            }

            if crossed_from_utc || !batch.provider_has_more {
                break;
            }
        }

        accepted.reverse();
        accepted.truncate(cap);
        Ok(accepted)
    }
}

fn window_chat_id(window: &MessageWindow) -> i64 {
    window.chat.canonical_id
}

/// On a `RateLimited` error with no cursor yet attached, fill in a resumable
/// one (spec.md §4.E.6: "attaches a resumable cursor reflecting the last
/// successfully emitted page (or the input cursor if nothing was emitted)").
/// `fetch_next_page` has an input cursor to fall back to; `fetch_first_page`
/// has none, so its errors pass through unchanged.
fn attach_resumable_cursor(err: CoreError, make_cursor: impl FnOnce() -> String) -> CoreError {
    match err {
        CoreError::RateLimited {
            retry_after_seconds,
            resumable_cursor: None,
        } => CoreError::RateLimited {
            retry_after_seconds,
            resumable_cursor: Some(make_cursor()),
        },
        other => other,
    }
}

fn validate_window(window: &MessageWindow, max_page_size: u32) -> Result<(), CoreError> {
    if window.page_size < 1 || window.page_size > max_page_size {
        return Err(CoreError::Validation(format!(
            "page_size must be in [1, {max_page_size}], got {}",
            window.page_size
        )));
    }
    if let (Some(from), Some(to)) = (window.from_utc, window.to_utc) {
        if from > to {
            return Err(CoreError::Validation(
                "from_utc must be <= to_utc".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatKind, ChatRef, MediaKind, Sender};
    use crate::ports::RawBatch;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    fn sample_chat() -> ChatRef {
        ChatRef {
            canonical_id: 999,
            kind: ChatKind::Channel,
            username: Some("example_public".into()),
            title: "Example Public".into(),
            description: None,
            member_count: None,
            verified: None,
        }
    }

    fn make_message(id: i32, ts: i64) -> Message {
        Message {
            id,
            date: Utc.timestamp_opt(ts, 0).unwrap(),
            text: format!("message {id}"),
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
        }
    }

    /// A gateway serving a fixed in-memory corpus, newest-first, honoring
    /// `min_id` as an exclusive floor — mirrors the real provider contract
    /// without any network I/O.
    struct FixedCorpusGateway {
        messages: StdMutex<Vec<Message>>,
    }

    impl FixedCorpusGateway {
        fn new(count: i32) -> Self {
            let messages = (1..=count).map(|id| make_message(id, 1_700_000_000 + id as i64)).collect();
            Self {
                messages: StdMutex::new(messages),
            }
        }
    }

    #[async_trait::async_trait]
    impl TgGateway for FixedCorpusGateway {
        async fn resolve_entity(&self, _input: &str) -> Result<ChatRef, GatewayError> {
            Ok(sample_chat())
        }

        async fn get_messages(
            &self,
            _chat_id: i64,
            min_id: i32,
            max_id: i32,
            _offset_date: Option<i64>,
            limit: i32,
        ) -> Result<RawBatch, GatewayError> {
            let all = self.messages.lock().unwrap();
            let mut candidates: Vec<Message> = all
                .iter()
                .filter(|m| m.id > min_id && (max_id == 0 || m.id < max_id))
                .cloned()
                .collect();
            candidates.sort_by_key(|m| std::cmp::Reverse(m.id));
            let provider_has_more = candidates.len() > limit as usize;
            candidates.truncate(limit as usize);
            Ok(RawBatch {
                messages: candidates,
                provider_has_more,
            })
        }
    }

    fn sample_window(page_size: u32) -> MessageWindow {
        MessageWindow {
            chat: sample_chat(),
            from_utc: None,
            to_utc: None,
            direction: Direction::Desc,
            page_size,
            search: None,
            filter: None,
        }
    }

    async fn resource_manager() -> (Arc<ResourceManager>, TempDir) {
        let dir = TempDir::new().unwrap();
        let rm = Arc::new(ResourceManager::new(
            dir.path().to_path_buf(),
            Duration::from_secs(3600),
        ));
        (rm, dir)
    }

    #[tokio::test]
    async fn first_page_ascending_and_bounded() {
        let gateway = Arc::new(FixedCorpusGateway::new(150));
        let (rm, _dir) = resource_manager().await;
        let fetcher = HistoryFetcher::new(gateway, rm, WaitConfig::default(), FetcherConfig::default());
        let window = sample_window(100);

        let page = fetcher.fetch(&window, None).await.unwrap();
        assert_eq!(page.messages.len(), 100);
        assert!(page.page_info.has_more);
        let ids: Vec<i32> = page.messages.iter().map(|m| m.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        // Corpus has ids 1..=150, newest-first internally; ascending
        // presentation of the first page starts at the oldest message.
        assert_eq!(page.messages.first().unwrap().id, 1);
        assert_eq!(page.messages.last().unwrap().id, 100);
    }

    #[tokio::test]
    async fn two_pages_then_done() {
        let gateway = Arc::new(FixedCorpusGateway::new(150));
        let (rm, _dir) = resource_manager().await;
        let fetcher = HistoryFetcher::new(gateway, rm, WaitConfig::default(), FetcherConfig::default());
        let window = sample_window(100);

        let first = fetcher.fetch(&window, None).await.unwrap();
        assert_eq!(first.messages.len(), 100);
        assert!(first.page_info.has_more);
        let ids: Vec<i32> = first.messages.iter().map(|m| m.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));

        let cursor = first.page_info.cursor.clone().unwrap();
        let second = fetcher.fetch(&window, Some(&cursor)).await.unwrap();
        assert_eq!(second.messages.len(), 50);
        assert!(!second.page_info.has_more);
        assert!(second.page_info.cursor.is_none());

        let mut all_ids: Vec<i32> = first.messages.iter().chain(second.messages.iter()).map(|m| m.id).collect();
        let mut expected: Vec<i32> = (1..=150).collect();
        all_ids.sort();
        expected.sort();
        assert_eq!(all_ids, expected);
    }

    #[tokio::test]
    async fn large_window_triggers_export() {
        let gateway = Arc::new(FixedCorpusGateway::new(1200));
        let (rm, _dir) = resource_manager().await;
        let config = FetcherConfig {
            export_threshold: 500,
            ..FetcherConfig::default()
        };
        let fetcher = HistoryFetcher::new(gateway, Arc::clone(&rm), WaitConfig::default(), config);
        let window = sample_window(100);

        let page = fetcher.fetch(&window, None).await.unwrap();
        assert_eq!(page.messages.len(), 100);
        assert!(!page.page_info.has_more);
        assert_eq!(page.page_info.total_fetched, 1200);
        let export = page.export.expect("large window must export");

        // The artifact must hold every message in the window, not just the
        // probe-sized prefix used to detect "this window is large".
        let lines = rm.read_lines(&export.uri).await.unwrap();
        assert_eq!(lines.len(), 1200);
        let exported_ids: std::collections::HashSet<i32> = lines
            .iter()
            .map(|line| serde_json::from_str::<Message>(line).unwrap().id)
            .collect();
        let expected_ids: std::collections::HashSet<i32> = (1..=1200).collect();
        assert_eq!(exported_ids, expected_ids);
    }

    #[tokio::test]
    async fn rejects_bad_page_size() {
        let gateway = Arc::new(FixedCorpusGateway::new(10));
        let (rm, _dir) = resource_manager().await;
        let fetcher = HistoryFetcher::new(gateway, rm, WaitConfig::default(), FetcherConfig::default());
        let window = sample_window(101);

        let result = fetcher.fetch(&window, None).await;
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn rejects_inverted_window() {
        let gateway = Arc::new(FixedCorpusGateway::new(10));
        let (rm, _dir) = resource_manager().await;
        let fetcher = HistoryFetcher::new(gateway, rm, WaitConfig::default(), FetcherConfig::default());
        let mut window = sample_window(10);
        window.from_utc = Some(Utc.timestamp_opt(2_000, 0).unwrap());
        window.to_utc = Some(Utc.timestamp_opt(1_000, 0).unwrap());

        let result = fetcher.fetch(&window, None).await;
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }
}
