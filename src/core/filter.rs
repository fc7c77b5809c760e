//! Filter Engine (spec.md §4.B). Pure, total classification + predicate
//! matching. No I/O, no dependencies beyond domain types — deliberately the
//! simplest component in the core (3% + 7% of budget combined with Cursor
//! Codec) so it is trivial to test exhaustively.

use crate::domain::{FilterRecord, MediaKind, Message};

/// Deterministic, total classification of a message's media facet.
///
/// `has_photo`/`has_video`/... model "this message carries this facet";
/// exactly the first present facet in `MediaKind`'s declared order wins
/// (spec.md §4.B: "the first present in the ordered list {photo, video,
/// document, audio, voice, sticker, poll, link, text} wins").
pub struct MediaFacets {
    pub photo: bool,
    pub video: bool,
    pub document: bool,
    pub audio: bool,
    pub voice: bool,
    pub sticker: bool,
    pub poll: bool,
    pub link: bool,
}

impl MediaFacets {
    pub fn none() -> Self {
        Self {
            photo: false,
            video: false,
            document: false,
            audio: false,
            voice: false,
            sticker: false,
            poll: false,
            link: false,
        }
    }
}

/// Total classification: every `MediaFacets` maps to exactly one `MediaKind`.
pub fn classify_media(facets: &MediaFacets) -> MediaKind {
    if facets.photo {
        MediaKind::Photo
    } else if facets.video {
        MediaKind::Video
    } else if facets.document {
        MediaKind::Document
    } else if facets.audio {
        MediaKind::Audio
    } else if facets.voice {
        MediaKind::Voice
    } else if facets.sticker {
        MediaKind::Sticker
    } else if facets.poll {
        MediaKind::Poll
    } else if facets.link {
        MediaKind::Link
    } else {
        MediaKind::Text
    }
}

/// Evaluate a `FilterRecord` against a projected `Message`. All present
/// constraints AND-combine; an absent field imposes no constraint.
pub fn matches(message: &Message, filter: &FilterRecord) -> bool {
    if let Some(ref kinds) = filter.media_types {
        if !kinds.contains(&message.media_type) {
            return false;
        }
    }
    if let Some(expected) = filter.has_media {
        if message.has_media != expected {
            return false;
        }
    }
    if let Some(ref users) = filter.from_users {
        if !users.contains(&message.sender.id) {
            return false;
        }
    }
    if let Some(min_views) = filter.min_views {
        if message.views.unwrap_or(0) < min_views {
            return false;
        }
    }
    if let Some(max_views) = filter.max_views {
        if message.views.unwrap_or(0) > max_views {
            return false;
        }
    }
    true
}

/// Case-insensitive substring search used when `search` is applied
/// post-hoc rather than server-side (spec.md §4.B, Open Question 1 —
/// resolved in DESIGN.md: this crate always applies search client-side).
pub fn matches_search(message: &Message, search: &str) -> bool {
    message
        .text
        .to_lowercase()
        .contains(&search.to_lowercase())
}
