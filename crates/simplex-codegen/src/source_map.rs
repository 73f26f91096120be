//! Span table: compiled-form position → Simplex source span.
//!
//! Each entry records one fragment of the compiled listing, in emission
//! order: its length and the span of the node that emitted it. Entries cover
//! the listing contiguously, so a position inside the listing is resolved by
//! accumulating lengths until the running total reaches it.

use serde::{Deserialize, Serialize};
use simplex_types::Span;

/// Ordered fragment table for one compiled expression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanTable {
    pub entries: Vec<SpanEntry>,
}

/// One listing fragment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpanEntry {
    /// Fragment length in characters.
    pub len: usize,
    /// Span of the node that emitted the fragment.
    pub span: Span,
}

impl SpanTable {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a fragment.
    pub fn push(&mut self, len: usize, span: Span) {
        self.entries.push(SpanEntry { len, span });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total length of the listing the table covers.
    pub fn listing_len(&self) -> usize {
        self.entries.iter().map(|e| e.len).sum()
    }

    /// Resolve a 1-based listing position to the span of the fragment
    /// containing it. `None` past the end of the listing.
    pub fn locate(&self, position: usize) -> Option<Span> {
        let mut offset = 0;
        for entry in &self.entries {
            offset += entry.len;
            if offset >= position {
                return Some(entry.span);
            }
        }
        None
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Deserialize from JSON bytes.
    pub fn from_json(data: &[u8]) -> Option<Self> {
        serde_json::from_slice(data).ok()
    }
}
