//! Key codec for the KV store.
//!
//! JetStream KV keys are limited to `[-/_=.a-zA-Z0-9]` and treat `.` as a
//! token separator, so logical paths such as `registrant/<uid>` or
//! `index/email/<address>/<uid>` cannot be stored verbatim. Every
//! `/`-delimited segment is base64-encoded and the segments are joined
//! with `.`:
//!
//! ```text
//! registrant/abc-123  ->  cmVnaXN0cmFudA==.YWJjLTEyMw==
//! ```
//!
//! Decoding reverses the transform and always yields an absolute path
//! (`/registrant/abc-123`).
//!
//! Segments are written with the URL-safe alphabet (`-` and `_` in place of
//! `+` and `/`). Decoding accepts either alphabet, but lookups compare
//! encoded keys, so a key written by a standard-alphabet encoder whose
//! segment encodes to a `+` or `/` is not found by [`entity_key_encoded`]
//! or [`index_key_encoded`]. When the standard encoding contains neither
//! character the two alphabets produce the same text.
//!
//! ## Key Layout
//!
//! - `/{entity_type}/{uid}` - entity document (JSON)
//! - `/index/{index_type}/{value}/{uid}` - index marker (zero-length value)

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;

/// Separator between logical path segments.
pub const PATH_SEPARATOR: char = '/';

/// Separator between encoded segments in a store key.
pub const ENCODED_SEPARATOR: char = '.';

/// Single-token wildcard. Passed through unencoded.
pub const WILDCARD_TOKEN: &str = "*";

/// Trailing multi-token wildcard. Passed through unencoded.
pub const WILDCARD_TAIL: &str = ">";

/// First segment of every index key.
pub const INDEX_ROOT: &str = "index";

/// Entity type labels. Each is the first segment of its entity keys.
pub mod entity_types {
    pub const MEETING: &str = "meeting";
    pub const REGISTRANT: &str = "registrant";
    pub const PAST_MEETING: &str = "past_meeting";
    pub const RECORDING: &str = "recording";
    pub const TRANSCRIPT: &str = "transcript";
    pub const SUMMARY: &str = "summary";
    pub const RSVP: &str = "rsvp";
    pub const ATTACHMENT: &str = "attachment";

    /// All entity types, in registration order.
    pub const ALL: [&str; 8] = [
        MEETING,
        REGISTRANT,
        PAST_MEETING,
        RECORDING,
        TRANSCRIPT,
        SUMMARY,
        RSVP,
        ATTACHMENT,
    ];
}

/// Key codec errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Encode a logical path into a store key.
///
/// A single leading `/` is ignored. Wildcard tokens (`*`, `>`) are kept
/// literal so the result stays usable as a subscription filter.
pub fn encode_key(path: &str) -> Result<String, KeyError> {
    let trimmed = path.strip_prefix(PATH_SEPARATOR).unwrap_or(path);
    if trimmed.is_empty() {
        return Err(KeyError::InvalidKey("key path cannot be empty".to_string()));
    }

    let segments: Vec<String> = trimmed.split(PATH_SEPARATOR).map(encode_segment).collect();
    Ok(segments.join(&ENCODED_SEPARATOR.to_string()))
}

/// Decode a store key back into an absolute logical path.
pub fn decode_key(encoded: &str) -> Result<String, KeyError> {
    if encoded.is_empty() {
        return Err(KeyError::InvalidKey("encoded key cannot be empty".to_string()));
    }

    let mut path = String::with_capacity(encoded.len());
    for segment in encoded.split(ENCODED_SEPARATOR) {
        path.push(PATH_SEPARATOR);
        path.push_str(&decode_segment(segment)?);
    }
    Ok(path)
}

// URL-safe alphabet: `+` is not a legal JetStream key character.
fn encode_segment(segment: &str) -> String {
    match segment {
        WILDCARD_TOKEN | WILDCARD_TAIL => segment.to_string(),
        _ => URL_SAFE.encode(segment),
    }
}

fn decode_segment(segment: &str) -> Result<String, KeyError> {
    let bytes = URL_SAFE
        .decode(segment)
        .or_else(|_| STANDARD.decode(segment))
        .map_err(|e| KeyError::InvalidKey(format!("segment {:?} is not base64: {}", segment, e)))?;

    String::from_utf8(bytes)
        .map_err(|_| KeyError::InvalidKey(format!("segment {:?} is not valid UTF-8", segment)))
}

/// Logical path of an entity document.
///
/// Schema: `{entity_type}/{uid}`
#[inline]
pub fn entity_key(entity_type: &str, uid: &str) -> String {
    format!("{}/{}", entity_type, uid)
}

/// Store key of an entity document.
pub fn entity_key_encoded(entity_type: &str, uid: &str) -> Result<String, KeyError> {
    encode_key(&entity_key(entity_type, uid))
}

/// Logical path of an index marker.
///
/// Schema: `index/{index_type}/{index_value}/{entity_uid}`
#[inline]
pub fn index_key(index_type: &str, index_value: &str, entity_uid: &str) -> String {
    format!("{}/{}/{}/{}", INDEX_ROOT, index_type, index_value, entity_uid)
}

/// Store key of an index marker.
pub fn index_key_encoded(
    index_type: &str,
    index_value: &str,
    entity_uid: &str,
) -> Result<String, KeyError> {
    encode_key(&index_key(index_type, index_value, entity_uid))
}

/// Decoded-path prefix shared by all documents of an entity type.
///
/// Schema: `/{entity_type}/`
#[inline]
pub fn entity_prefix(entity_type: &str) -> String {
    format!("{}{}{}", PATH_SEPARATOR, entity_type, PATH_SEPARATOR)
}

/// Decoded-path prefix shared by all markers for one index value.
///
/// Schema: `/index/{index_type}/{index_value}/`
#[inline]
pub fn index_prefix(index_type: &str, index_value: &str) -> String {
    format!("/{}/{}/{}/", INDEX_ROOT, index_type, index_value)
}

/// Components of a decoded index path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexPath<'a> {
    pub index_type: &'a str,
    pub index_value: &'a str,
    pub entity_uid: &'a str,
}

/// Split a decoded path of the form `/index/{type}/{value}/{uid}`.
///
/// The value is everything between the type and the last segment, so
/// values containing `/` survive. Returns `None` for entity paths and
/// malformed index paths.
pub fn parse_index_path(decoded: &str) -> Option<IndexPath<'_>> {
    let rest = decoded
        .strip_prefix(PATH_SEPARATOR)?
        .strip_prefix(INDEX_ROOT)?
        .strip_prefix(PATH_SEPARATOR)?;

    let (index_type, rest) = rest.split_once(PATH_SEPARATOR)?;
    let (index_value, entity_uid) = rest.rsplit_once(PATH_SEPARATOR)?;
    if index_type.is_empty() || index_value.is_empty() || entity_uid.is_empty() {
        return None;
    }

    Some(IndexPath {
        index_type,
        index_value,
        entity_uid,
    })
}
