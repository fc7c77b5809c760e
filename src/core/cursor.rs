//! Cursor Codec (spec.md §4.A). Opaque encode/decode of pagination state.
//!
//! Grounded on the `MessageCursor` pattern used for paginated DB queries in
//! the retrieval pack (vibe-kanban's `conversation_message.rs`): compact
//! JSON, URL-safe base64 without padding. The `window_hash` field is this
//! crate's addition — a short digest so the decoder can tell "this cursor
//! was issued for a different query" apart from "malformed token".

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{CoreError, Direction, MessageWindow};

/// Pagination state carried opaquely between server and caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorState {
    pub offset_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_date: Option<i64>,
    pub direction: Direction,
    pub fetched_count: usize,
    /// Hex-encoded digest of the window parameters this cursor was issued for.
    pub window_hash: String,
}

/// Compute the window fingerprint embedded in a cursor. Two calls with the
/// same logical window (same chat, bounds, direction, page size, search,
/// filter) always hash identically; invariant 4 in spec.md §8 depends on
/// this being sensitive to every field that changes observable semantics.
pub fn window_hash(window: &MessageWindow) -> String {
    let mut hasher = Sha256::new();
    hasher.update(window.chat.canonical_id.to_le_bytes());
    hasher.update([match window.direction {
        Direction::Asc => 0u8,
        Direction::Desc => 1u8,
    }]);
    hasher.update(window.page_size.to_le_bytes());
    if let Some(from) = window.from_utc {
        hasher.update(from.timestamp().to_le_bytes());
    }
    if let Some(to) = window.to_utc {
        hasher.update(to.timestamp().to_le_bytes());
    }
    if let Some(ref s) = window.search {
        hasher.update(s.as_bytes());
    }
    if let Some(ref f) = window.filter {
        // serde_json::to_vec on a plain data struct cannot fail.
        if let Ok(bytes) = serde_json::to_vec(f) {
            hasher.update(bytes);
        }
    }
    let digest = hasher.finalize();
    hex_encode(&digest[..16])
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{:02x}", b);
    }
    s
}

/// Encode cursor state as an opaque string. Pure, infallible.
pub fn encode(state: &CursorState) -> String {
    let json = serde_json::to_string(state).expect("CursorState serialization cannot fail");
    URL_SAFE_NO_PAD.encode(json.as_bytes())
}

/// Decode an opaque cursor string, verifying it was issued for `window`.
pub fn decode(opaque: &str, window: &MessageWindow) -> Result<CursorState, CoreError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(opaque)
        .map_err(|e| CoreError::Validation(format!("malformed cursor (base64): {e}")))?;
    let json = String::from_utf8(bytes)
        .map_err(|e| CoreError::Validation(format!("malformed cursor (utf8): {e}")))?;
    let state: CursorState = serde_json::from_str(&json)
        .map_err(|e| CoreError::Validation(format!("malformed cursor (json): {e}")))?;

    let expected = window_hash(window);
    if state.window_hash != expected {
        return Err(CoreError::Validation(
            "cursor was issued for a different window".into(),
        ));
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatKind, ChatRef};

    fn sample_window(page_size: u32) -> MessageWindow {
        MessageWindow {
            chat: ChatRef {
                canonical_id: 123456789,
                kind: ChatKind::Channel,
                username: Some("example_public".into()),
                title: "Example Public".into(),
                description: None,
                member_count: None,
                verified: None,
            },
            from_utc: None,
            to_utc: None,
            direction: Direction::Desc,
            page_size,
            search: None,
            filter: None,
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let window = sample_window(100);
        let state = CursorState {
            offset_id: 1100,
            offset_date: Some(1_700_000_000),
            direction: Direction::Desc,
            fetched_count: 100,
            window_hash: window_hash(&window),
        };
        let opaque = encode(&state);
        let decoded = decode(&opaque, &window).expect("decode must succeed");
        assert_eq!(decoded, state);
    }

    #[test]
    fn decode_rejects_garbage() {
        let window = sample_window(100);
        assert!(decode("not-valid-base64!!", &window).is_err());
        assert!(decode(&URL_SAFE_NO_PAD.encode(b"not json"), &window).is_err());
    }

    #[test]
    fn decode_rejects_window_mismatch() {
        let window_a = sample_window(100);
        let window_b = sample_window(50);
        let state = CursorState {
            offset_id: 1100,
            offset_date: None,
            direction: Direction::Desc,
            fetched_count: 100,
            window_hash: window_hash(&window_a),
        };
        let opaque = encode(&state);
        match decode(&opaque, &window_b) {
            Err(CoreError::Validation(_)) => {}
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn window_hash_is_stable_and_sensitive() {
        let a = sample_window(100);
        let mut b = sample_window(100);
        b.page_size = 50;
        assert_eq!(window_hash(&a), window_hash(&sample_window(100)));
        assert_ne!(window_hash(&a), window_hash(&b));
    }
}
