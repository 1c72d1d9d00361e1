//! Typed occurrence events.
//!
//! Events carry everything the aggregator needs, and their derived total
//! order is what makes the single-pass aggregation work: for one
//! (term, field) group, every marker sorts before every real posting, so
//! document frequencies and occurrence totals are known before the first
//! posting has to be written. Markers are explicit variants rather than
//! out-of-range sentinel integers, so they can never collide with real
//! document ids or positions.

use serde::Serialize;

/// Which index an event belongs to.
///
/// The alignment index orders before all real fields, keeping the original
/// layout where alignment groups are aggregated first on each partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum IndexRef {
    /// The reserved term/predicate alignment index (vertical mode only).
    Alignment,
    /// A real field, by position in the field set.
    Field(u32),
}

impl std::fmt::Display for IndexRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexRef::Alignment => write!(f, "alignment"),
            IndexRef::Field(i) => write!(f, "field {i}"),
        }
    }
}

/// One occurrence event for a (term, field) pair.
///
/// The variant order is load-bearing: `Presence < Alignment < Posting`,
/// then by field values. The derived `Ord` implements exactly that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Occurrence {
    /// Per-document statistics marker: the term occurred `count` times in
    /// document `doc`, the last time at `last_position`. Emitted exactly
    /// once per distinct (term, field, document).
    Presence {
        doc: u32,
        count: u32,
        last_position: u32,
    },
    /// Predicate-membership marker for the alignment index: the term
    /// occurred under the predicate with the given resolved id.
    Alignment { predicate: u32 },
    /// A real occurrence of the term at `position` in `doc`.
    Posting { doc: u32, position: u32 },
}

impl Occurrence {
    /// Whether this event is a marker (sorts before all postings).
    pub fn is_marker(&self) -> bool {
        !matches!(self, Occurrence::Posting { .. })
    }
}
