//! Maps grammers (MTProto) types to domain entities.
//!
//! Grounded on the teacher's `chat_type_from_peer`/`message_to_domain`, kept
//! in shape but re-targeted: `ChatType` → `ChatKind` (public-only, per
//! spec.md §4.D), and `Message` gains the engagement counters, flags, and
//! total `MediaKind` classification spec.md §3 requires.

use std::collections::HashMap;

use grammers_client::peer::Peer;
use grammers_client::tl;

use crate::core::filter::{classify_media, MediaFacets};
use crate::domain::{ChatKind, CoreError, Message, Sender};

/// Username grammar from spec.md §4.D: letters, digits, underscore, 4-32
/// chars. Applied after `@`/URL-prefix stripping in the Chat Resolver.
pub fn validate_username(username: &str) -> Result<(), CoreError> {
    let len = username.chars().count();
    if !(4..=32).contains(&len) {
        return Err(CoreError::UsernameInvalid(format!(
            "username must be 4-32 characters, got {len}"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(CoreError::UsernameInvalid(
            "username may only contain letters, digits, and underscore".into(),
        ));
    }
    Ok(())
}

/// Public-only chat kind from a resolved peer. Private groups and
/// invite-only channels (no username) are rejected by the caller before
/// this is ever reached.
pub fn chat_kind_from_peer(peer: &Peer) -> ChatKind {
    match peer {
        Peer::User(_) => ChatKind::User,
        Peer::Group(_) => ChatKind::Group,
        Peer::Channel(_) => ChatKind::Channel,
    }
}

/// True iff `peer` is publicly resolvable (has a username, or for channels,
/// is a public broadcast/megagroup). Private entities without a username
/// fail chat resolution with `CHANNEL_PRIVATE`.
pub fn peer_is_public(peer: &Peer) -> bool {
    peer.username().is_some()
}

/// Map a raw grammers message into the external `Message` shape. `users`
/// resolves sender ids to display metadata from the same `GetHistory`
/// response (messages and users arrive together, never looked up
/// separately — avoids an extra round trip per message).
pub fn message_to_domain(
    msg: &tl::enums::Message,
    users: &HashMap<i64, tl::enums::User>,
) -> Option<Message> {
    let tl::enums::Message::Message(m) = msg else {
        return None;
    };

    let sender_id = m.from_id.as_ref().and_then(|f| match f {
        tl::enums::Peer::User(u) => Some(u.user_id as i64),
        _ => None,
    });

    let sender = build_sender(sender_id, users);

    let date = chrono::DateTime::from_timestamp(m.date as i64, 0).unwrap_or_else(chrono::Utc::now);
    let edit_date = m
        .edit_date
        .and_then(|d| chrono::DateTime::from_timestamp(d as i64, 0));

    let reply_to_id = m.reply_to.as_ref().and_then(|r| match r {
        tl::enums::MessageReplyHeader::Header(h) => h.reply_to_msg_id,
        _ => None,
    });
    let topic_id = m.reply_to.as_ref().and_then(|r| match r {
        tl::enums::MessageReplyHeader::Header(h) => h.reply_to_top_id,
        _ => None,
    });

    let facets = media_facets(m.media.as_ref());
    let has_media = m.media.is_some();
    let media_type = classify_media(&facets);

    let views = m.views.map(|v| v as i64);
    let forwards = m.forwards.map(|v| v as i64);
    let replies = m.replies.as_ref().and_then(|r| match r {
        tl::enums::MessageReplies::Replies(r) => Some(r.replies as i64),
    });
    let reactions = m.reactions.as_ref().map(reaction_total);

    Some(Message {
        id: m.id,
        date,
        text: m.message.clone(),
        sender,
        views,
        forwards,
        replies,
        reactions,
        pinned: m.pinned,
        silent: m.silent,
        post: m.post,
        noforwards: m.noforwards,
        media_type,
        has_media,
        reply_to_id,
        topic_id,
        edit_date,
    })
}

fn build_sender(sender_id: Option<i64>, users: &HashMap<i64, tl::enums::User>) -> Sender {
    let Some(id) = sender_id else {
        return Sender {
            id: 0,
            username: None,
            display: None,
            is_bot: None,
            verified: None,
        };
    };

    match users.get(&id) {
        Some(tl::enums::User::User(u)) => Sender {
            id,
            username: u.username.clone(),
            display: Some(
                [u.first_name.clone(), u.last_name.clone()]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" "),
            )
            .filter(|s| !s.is_empty()),
            is_bot: Some(u.bot),
            verified: Some(u.verified),
        },
        _ => Sender {
            id,
            username: None,
            display: None,
            is_bot: None,
            verified: None,
        },
    }
}

fn reaction_total(reactions: &tl::enums::MessageReactions) -> i64 {
    match reactions {
        tl::enums::MessageReactions::Reactions(r) => r
            .results
            .iter()
            .map(|count| match count {
                tl::enums::ReactionCount::Count(c) => c.count as i64,
            })
            .sum(),
    }
}

fn media_facets(media: Option<&tl::enums::MessageMedia>) -> MediaFacets {
    let mut facets = MediaFacets::none();
    let Some(media) = media else {
        return facets;
    };

    match media {
        tl::enums::MessageMedia::Photo(_) => facets.photo = true,
        tl::enums::MessageMedia::Document(d) => classify_document(d, &mut facets),
        tl::enums::MessageMedia::Poll(_) => facets.poll = true,
        tl::enums::MessageMedia::WebPage(_) => facets.link = true,
        _ => {}
    }
    facets
}

fn classify_document(doc: &tl::types::MessageMediaDocument, facets: &mut MediaFacets) {
    let Some(tl::enums::Document::Document(document)) = doc.document.as_ref() else {
        return;
    };

    let is_sticker = document
        .attributes
        .iter()
        .any(|a| matches!(a, tl::enums::DocumentAttribute::Sticker(_)));
    let is_voice = document.attributes.iter().any(|a| {
        matches!(
            a,
            tl::enums::DocumentAttribute::Audio(tl::types::DocumentAttributeAudio {
                voice: true,
                ..
            })
        )
    });
    let is_video = document
        .attributes
        .iter()
        .any(|a| matches!(a, tl::enums::DocumentAttribute::Video(_)));
    let is_audio = document.mime_type.starts_with("audio/");

    if is_sticker {
        facets.sticker = true;
    } else if is_voice {
        facets.voice = true;
    } else if is_video || document.mime_type.starts_with("video/") {
        facets.video = true;
    } else if is_audio {
        facets.audio = true;
    } else {
        facets.document = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_username_enforces_length() {
        assert!(validate_username("abc").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
        assert!(validate_username("example_public").is_ok());
    }

    #[test]
    fn validate_username_rejects_bad_characters() {
        assert!(validate_username("bad-name").is_err());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("good_name1").is_ok());
    }
}
