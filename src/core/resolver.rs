//! Chat Resolver (spec.md §4.D). Normalizes caller-supplied chat references
//! (@username, t.me URL, bare username, signed numeric id) and resolves them
//! to a canonical `ChatRef` through the Wait Controller, with an optional
//! bounded LRU cache in front.
//!
//! Grounded on the teacher's `resolve_input_peer`/`mapper::chat_type_from_peer`
//! (`adapters/telegram/client.rs`, `mapper.rs`), which already strips `@` and
//! `https://t.me/` prefixes before calling `client.resolve_username`. The
//! LRU cache is new: `lru` (not `moka`, which appears in the retrieval pack's
//! manifests but with no evidenced call sites) matches the crate used for
//! bounded in-memory caches elsewhere in the pack's `other_examples/`.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;

use crate::core::wait::{self, WaitConfig};
use crate::domain::{ChatRef, CoreError};
use crate::ports::TgGateway;

const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Resolves chat references, optionally caching by normalized input.
pub struct ChatResolver {
    gateway: Arc<dyn TgGateway>,
    wait_config: WaitConfig,
    cache: Option<Mutex<LruCache<String, ChatRef>>>,
}

impl ChatResolver {
    pub fn new(gateway: Arc<dyn TgGateway>, wait_config: WaitConfig, cache_enabled: bool) -> Self {
        let cache = cache_enabled.then(|| {
            Mutex::new(LruCache::new(
                NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).expect("nonzero capacity"),
            ))
        });
        Self {
            gateway,
            wait_config,
            cache,
        }
    }

    /// Resolve `input` to a canonical `ChatRef`, consulting the cache first
    /// (if enabled) and populating it on a successful lookup.
    pub async fn resolve(&self, input: &str) -> Result<ChatRef, CoreError> {
        let key = normalize(input);

        if let Some(cache) = &self.cache {
            let mut guard = cache.lock().await;
            if let Some(hit) = guard.get(&key) {
                return Ok(hit.clone());
            }
        }

        let gateway = Arc::clone(&self.gateway);
        let key_for_call = key.clone();
        let chat = wait::with_retry(&self.wait_config, move || {
            let gateway = Arc::clone(&gateway);
            let key = key_for_call.clone();
            async move { gateway.resolve_entity(&key).await }
        })
        .await?;

        if let Some(cache) = &self.cache {
            let mut guard = cache.lock().await;
            guard.put(key, chat.clone());
        }

        Ok(chat)
    }
}

/// Strip decoration from a caller-supplied chat reference, leaving either a
/// bare username, a signed numeric id, or the original string when it
/// matches neither recognized shape (the gateway is given the final say on
/// whether it resolves).
fn normalize(input: &str) -> String {
    let trimmed = input.trim();

    if let Some(rest) = trimmed
        .strip_prefix("https://t.me/")
        .or_else(|| trimmed.strip_prefix("http://t.me/"))
        .or_else(|| trimmed.strip_prefix("t.me/"))
    {
        return rest.trim_start_matches('@').to_string();
    }

    trimmed.trim_start_matches('@').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatKind, GatewayError};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FakeGateway {
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl TgGateway for FakeGateway {
        async fn resolve_entity(&self, input: &str) -> Result<ChatRef, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ChatRef {
                canonical_id: 1,
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
            _min_id: i32,
            _max_id: i32,
            _offset_date: Option<i64>,
            _limit: i32,
        ) -> Result<crate::ports::RawBatch, GatewayError> {
            unimplemented!()
        }
    }

    #[test]
    fn normalize_strips_known_prefixes() {
        assert_eq!(normalize("@example"), "example");
        assert_eq!(normalize("https://t.me/example"), "example");
        assert_eq!(normalize("t.me/example"), "example");
        assert_eq!(normalize("  example  "), "example");
        assert_eq!(normalize("-1001234567890"), "-1001234567890");
    }

    #[tokio::test]
    async fn cache_avoids_repeat_gateway_calls() {
        let gateway = Arc::new(FakeGateway {
            calls: AtomicU32::new(0),
        });
        let resolver = ChatResolver::new(gateway.clone(), WaitConfig::default(), true);

        resolver.resolve("@example").await.unwrap();
        resolver.resolve("@example").await.unwrap();
        resolver.resolve("https://t.me/example").await.unwrap();

        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disabled_cache_calls_gateway_every_time() {
        let gateway = Arc::new(FakeGateway {
            calls: AtomicU32::new(0),
        });
        let resolver = ChatResolver::new(gateway.clone(), WaitConfig::default(), false);

        resolver.resolve("@example").await.unwrap();
        resolver.resolve("@example").await.unwrap();

        assert_eq!(gateway.calls.load(Ordering::SeqCst), 2);
    }
}
