//! Diagnostic counters.
//!
//! Locally recoverable conditions (parse failures, unresolved predicates,
//! capacity overflows) are absorbed and surfaced only here; anything else
//! propagates as a hard error terminating the partition.

use serde::Serialize;

/// Counters for one partition's run. All conditions counted here are
/// non-fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneratorCounters {
    /// Documents processed (including empty and failed ones).
    pub documents: u64,
    /// Documents skipped because upstream parsing failed.
    pub failed_parsing: u64,
    /// Total occurrences emitted for indexing.
    pub indexed_occurrences: u64,
    /// Fields whose predicate id could not be resolved for alignment.
    pub unresolved_predicates: u64,
    /// Terms whose posting list exceeded the document cap.
    pub posting_list_overflows: u64,
    /// Terms with at least one document exceeding the position cap.
    pub position_list_overflows: u64,
}

impl GeneratorCounters {
    /// Merge another partition's counters into this one.
    pub fn merge(&mut self, other: &GeneratorCounters) {
        self.documents += other.documents;
        self.failed_parsing += other.failed_parsing;
        self.indexed_occurrences += other.indexed_occurrences;
        self.unresolved_predicates += other.unresolved_predicates;
        self.posting_list_overflows += other.posting_list_overflows;
        self.position_list_overflows += other.position_list_overflows;
    }
}
