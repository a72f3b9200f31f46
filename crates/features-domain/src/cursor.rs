//! Opaque pagination cursors.
//!
//! A cursor carries a position in a collection (the feature id to resume
//! from plus the navigation direction) and a checksum of all query
//! parameters with a filtering effect on the result set. The checksum
//! lets us detect that a client changed bbox/crs/limit mid-pagination,
//! which would silently produce pages from a different, unrelated
//! ordering. It is change detection, not security, so a fast
//! non-cryptographic hash suffices.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Position marker within a paginated result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorPosition {
    /// Initial request, no position yet.
    #[default]
    Start,
    /// Resume forward, after the given feature id.
    Next(i64),
    /// Resume backward, before the given feature id.
    Previous(i64),
}

/// URL-safe encoded form of a cursor, round-tripped by clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCursor(String);

const NEXT_TAG: u8 = 1;
const PREVIOUS_TAG: u8 = 2;

/// tag (1) + feature id (8) + checksum (4)
const TOKEN_LEN: usize = 13;

impl EncodedCursor {
    pub fn new(value: impl Into<String>) -> Self {
        EncodedCursor(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode and validate against the checksum computed from the current
    /// request's filtering parameters. A missing, malformed or stale
    /// cursor resets pagination to the first page: the position minted
    /// under different filters must never be trusted.
    pub fn decode(&self, filters_checksum: u32) -> CursorPosition {
        if self.0.is_empty() {
            return CursorPosition::Start;
        }
        let bytes = match URL_SAFE_NO_PAD.decode(&self.0) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("malformed cursor token, restarting pagination: {}", e);
                return CursorPosition::Start;
            }
        };
        if bytes.len() != TOKEN_LEN {
            tracing::debug!("cursor token has unexpected length, restarting pagination");
            return CursorPosition::Start;
        }

        let tag = bytes[0];
        let mut id_bytes = [0u8; 8];
        id_bytes.copy_from_slice(&bytes[1..9]);
        let id = i64::from_be_bytes(id_bytes);
        let mut checksum_bytes = [0u8; 4];
        checksum_bytes.copy_from_slice(&bytes[9..13]);
        let checksum = u32::from_be_bytes(checksum_bytes);

        if checksum != filters_checksum {
            tracing::debug!("cursor checksum mismatch, restarting pagination");
            return CursorPosition::Start;
        }

        match tag {
            NEXT_TAG => CursorPosition::Next(id),
            PREVIOUS_TAG => CursorPosition::Previous(id),
            _ => CursorPosition::Start,
        }
    }

    fn encode(tag: u8, id: i64, filters_checksum: u32) -> Self {
        let mut bytes = Vec::with_capacity(TOKEN_LEN);
        bytes.push(tag);
        bytes.extend_from_slice(&id.to_be_bytes());
        bytes.extend_from_slice(&filters_checksum.to_be_bytes());
        EncodedCursor(URL_SAFE_NO_PAD.encode(bytes))
    }
}

/// Cursors to the previous and next page, minted by a datasource after
/// executing a query. An absent side means the client reached that edge
/// of the result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursors {
    pub prev: Option<EncodedCursor>,
    pub next: Option<EncodedCursor>,
}

impl Cursors {
    /// Build cursors from the page boundaries: `prev_before` is the first
    /// id on the page (navigate to ids before it), `next_after` the last
    /// (navigate to ids after it).
    pub fn new(prev_before: Option<i64>, next_after: Option<i64>, filters_checksum: u32) -> Self {
        Cursors {
            prev: prev_before.map(|id| EncodedCursor::encode(PREVIOUS_TAG, id, filters_checksum)),
            next: next_after.map(|id| EncodedCursor::encode(NEXT_TAG, id, filters_checksum)),
        }
    }
}
