//! Implements TgGateway using grammers Client.
//!
//! Grounded on the teacher's FloodWait-aware `GetHistory` call, generalized:
//! this adapter no longer sleeps on FloodWait itself — it classifies the
//! error into `GatewayError` and lets the Wait Controller (`core::wait`)
//! decide whether to sleep, bounded-retry, or surface a typed rate limit.
//! The peer cache is kept verbatim (it's what avoids hammering
//! `iter_dialogs`/entity lookups on every call).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use grammers_client::tl;
use grammers_client::Client;
use grammers_client::InvocationError;
use tokio::sync::Mutex;

use crate::adapters::telegram::mapper;
use crate::domain::{ChatKind, ChatRef, GatewayError};
use crate::ports::{RawBatch, TgGateway};

/// Telegram gateway adapter. Wraps grammers Client (shared with the auth
/// adapter via the same underlying session).
pub struct GrammersTgGateway {
    client: Arc<Mutex<Client>>,
    peer_cache: Mutex<HashMap<i64, tl::enums::InputPeer>>,
}

impl GrammersTgGateway {
    pub fn new(client: Arc<Mutex<Client>>) -> Self {
        Self {
            client,
            peer_cache: Mutex::new(HashMap::new()),
        }
    }

    async fn resolve_input_peer(&self, chat_id: i64) -> Result<tl::enums::InputPeer, GatewayError> {
        {
            let cache = self.peer_cache.lock().await;
            if let Some(peer) = cache.get(&chat_id) {
                return Ok(peer.clone());
            }
        }
        let peer = {
            let guard = self.client.lock().await;
            let mut dialogs = guard.iter_dialogs();
            let mut found = None;
            while let Some(dialog) = dialogs.next().await.map_err(classify_invocation_error)? {
                let p = dialog.peer();
                if p.id().bot_api_dialog_id() == chat_id {
                    found = Some(p.clone());
                    break;
                }
            }
            found.ok_or_else(|| {
                GatewayError::Other(crate::domain::CoreError::ChatNotFound)
            })?
        };
        let peer_ref = peer.to_ref().await.ok_or_else(|| {
            GatewayError::Transient("peer not present in local session cache".into())
        })?;
        let input_peer: tl::enums::InputPeer = peer_ref.into();
        self.peer_cache
            .lock()
            .await
            .insert(chat_id, input_peer.clone());
        Ok(input_peer)
    }
}

#[async_trait]
impl TgGateway for GrammersTgGateway {
    async fn resolve_entity(&self, input: &str) -> Result<ChatRef, GatewayError> {
        if let Ok(canonical_id) = input.parse::<i64>() {
            let peer = self.lookup_by_id(canonical_id).await?;
            return self.project_peer(peer);
        }

        mapper::validate_username(input).map_err(GatewayError::Other)?;

        let resolved = {
            let guard = self.client.lock().await;
            guard
                .resolve_username(input)
                .await
                .map_err(classify_invocation_error)?
        };

        let peer = resolved.ok_or(GatewayError::Other(crate::domain::CoreError::ChatNotFound))?;
        self.project_peer(peer)
    }

    async fn get_messages(
        &self,
        chat_id: i64,
        min_id: i32,
        max_id: i32,
        offset_date: Option<i64>,
        limit: i32,
    ) -> Result<RawBatch, GatewayError> {
        use tl::enums::messages::Messages;

        let input_peer = self.resolve_input_peer(chat_id).await?;

        let req = tl::functions::messages::GetHistory {
            peer: input_peer,
            offset_id: 0,
            offset_date: offset_date.unwrap_or(0) as i32,
            add_offset: 0,
            limit,
            max_id,
            min_id,
            hash: 0,
        };

        let guard = self.client.lock().await;
        let raw = guard.invoke(&req).await.map_err(classify_invocation_error)?;
        drop(guard);

        let (messages, users, _chats) = match raw {
            Messages::Messages(m) => (m.messages, m.users, m.chats),
            Messages::Slice(m) => (m.messages, m.users, m.chats),
            Messages::ChannelMessages(m) => (m.messages, m.users, m.chats),
            Messages::NotModified(_) => {
                return Ok(RawBatch {
                    messages: vec![],
                    provider_has_more: false,
                })
            }
        };

        let users_by_id: HashMap<i64, tl::enums::User> = users
            .into_iter()
            .map(|u| (user_id(&u), u))
            .collect();

        let provider_has_more = messages.len() as i32 >= limit;
        let mapped = messages
            .iter()
            .filter_map(|m| mapper::message_to_domain(m, &users_by_id))
            .collect();

        Ok(RawBatch {
            messages: mapped,
            provider_has_more,
        })
    }
}

impl GrammersTgGateway {
    async fn lookup_by_id(&self, canonical_id: i64) -> Result<grammers_client::peer::Peer, GatewayError> {
        let guard = self.client.lock().await;
        let mut dialogs = guard.iter_dialogs();
        while let Some(dialog) = dialogs.next().await.map_err(classify_invocation_error)? {
            let peer = dialog.peer();
            if peer.id().bot_api_dialog_id() == canonical_id {
                return Ok(peer.clone());
            }
        }
        Err(GatewayError::Other(crate::domain::CoreError::ChatNotFound))
    }

    fn project_peer(&self, peer: grammers_client::peer::Peer) -> Result<ChatRef, GatewayError> {
        if !mapper::peer_is_public(&peer) {
            return Err(GatewayError::Other(crate::domain::CoreError::ChannelPrivate));
        }

        let kind = mapper::chat_kind_from_peer(&peer);
        let canonical_id = peer.id().bot_api_dialog_id();
        let title = peer
            .name()
            .map(String::from)
            .unwrap_or_else(|| canonical_id.to_string());

        Ok(ChatRef {
            canonical_id,
            kind,
            username: peer.username().map(String::from),
            title,
            description: None,
            member_count: None,
            verified: None,
        })
    }
}

fn user_id(user: &tl::enums::User) -> i64 {
    match user {
        tl::enums::User::User(u) => u.id as i64,
        tl::enums::User::Empty(u) => u.user_id as i64,
    }
}

/// Classify a raw MTProto error into the Wait Controller's vocabulary.
/// FloodWait becomes `RateLimited` (never slept here); everything else is
/// `Transient` so bounded backoff applies before giving up as `Unavailable`.
fn classify_invocation_error(e: InvocationError) -> GatewayError {
    match e {
        InvocationError::Rpc(rpc) if rpc.code == 420 => GatewayError::RateLimited {
            retry_after_seconds: rpc.value.unwrap_or(60) as u64,
        },
        InvocationError::Rpc(rpc) if rpc.name == "USERNAME_NOT_OCCUPIED" || rpc.name == "USERNAME_INVALID" => {
            GatewayError::Other(crate::domain::CoreError::UsernameInvalid(rpc.name))
        }
        InvocationError::Rpc(rpc) if rpc.name == "CHANNEL_PRIVATE" => {
            GatewayError::Other(crate::domain::CoreError::ChannelPrivate)
        }
        other => GatewayError::Transient(other.to_string()),
    }
}
