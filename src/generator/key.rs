//! Composite key and ordering protocol.
//!
//! The external sort/shuffle substrate must honor three functions:
//!
//! - **partition**: by term hash only, so all fields' data for one term
//!   (including alignment data) lands on one worker and that worker can
//!   build a complete alignment record without cross-worker coordination;
//! - **sort**: the full composite order (term, index, occurrence), which
//!   places markers ahead of postings within each group;
//! - **group**: equality on (term, index) only, so one aggregator call
//!   receives one completely ordered group as a single forward iterator.

use std::cmp::Ordering;

use ahash::RandomState;

use crate::generator::event::{IndexRef, Occurrence};

// Fixed seeds: partition assignment must be reproducible across runs and
// workers.
const PARTITION_SEEDS: (u64, u64, u64, u64) = (
    0x6c75_6e61_7269_6101,
    0x9e37_79b9_7f4a_7c15,
    0x517c_c1b7_2722_0a95,
    0x2545_f491_4f6c_dd1d,
);

/// Composite key: the occurrence rides in the key so the substrate sorts
/// values for us; grouping then ignores it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermKey {
    pub term: String,
    pub index: IndexRef,
    pub occurrence: Occurrence,
}

impl TermKey {
    pub fn new(term: String, index: IndexRef, occurrence: Occurrence) -> Self {
        TermKey {
            term,
            index,
            occurrence,
        }
    }

    /// Partition function: hash of the term alone.
    pub fn partition(&self, num_partitions: usize) -> usize {
        debug_assert!(num_partitions > 0);
        let state = RandomState::with_seeds(
            PARTITION_SEEDS.0,
            PARTITION_SEEDS.1,
            PARTITION_SEEDS.2,
            PARTITION_SEEDS.3,
        );
        (state.hash_one(self.term.as_str()) % num_partitions as u64) as usize
    }

    /// Group function: true iff both keys belong to the same
    /// (term, index) group.
    pub fn same_group(&self, other: &TermKey) -> bool {
        self.index == other.index && self.term == other.term
    }
}

impl Ord for TermKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.term
            .cmp(&other.term)
            .then_with(|| self.index.cmp(&other.index))
            .then_with(|| self.occurrence.cmp(&other.occurrence))
    }
}

impl PartialOrd for TermKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(term: &str, index: IndexRef, occurrence: Occurrence) -> TermKey {
        TermKey::new(term.to_string(), index, occurrence)
    }

    #[test]
    fn test_sort_order() {
        let mut keys = vec![
            key(
                "b",
                IndexRef::Field(0),
                Occurrence::Posting { doc: 0, position: 0 },
            ),
            key(
                "a",
                IndexRef::Field(1),
                Occurrence::Posting { doc: 0, position: 0 },
            ),
            key(
                "a",
                IndexRef::Field(0),
                Occurrence::Posting { doc: 1, position: 0 },
            ),
            key(
                "a",
                IndexRef::Field(0),
                Occurrence::Presence {
                    doc: 9,
                    count: 1,
                    last_position: 0,
                },
            ),
        ];
        keys.sort();

        // Term ascending, then field, then markers before postings.
        assert_eq!(keys[0].term, "a");
        assert!(keys[0].occurrence.is_marker());
        assert_eq!(
            keys[1].occurrence,
            Occurrence::Posting { doc: 1, position: 0 }
        );
        assert_eq!(keys[2].index, IndexRef::Field(1));
        assert_eq!(keys[3].term, "b");
    }

    #[test]
    fn test_grouping_ignores_occurrence() {
        let a = key(
            "t",
            IndexRef::Field(0),
            Occurrence::Presence {
                doc: 0,
                count: 1,
                last_position: 0,
            },
        );
        let b = key(
            "t",
            IndexRef::Field(0),
            Occurrence::Posting { doc: 5, position: 2 },
        );
        let c = key(
            "t",
            IndexRef::Field(1),
            Occurrence::Posting { doc: 5, position: 2 },
        );
        assert!(a.same_group(&b));
        assert!(!a.same_group(&c));
    }

    #[test]
    fn test_partition_ignores_field() {
        let a = key(
            "t",
            IndexRef::Field(0),
            Occurrence::Posting { doc: 0, position: 0 },
        );
        let b = key(
            "t",
            IndexRef::Alignment,
            Occurrence::Alignment { predicate: 3 },
        );
        for n in [1, 2, 7, 64] {
            assert_eq!(a.partition(n), b.partition(n));
            assert!(a.partition(n) < n);
        }
    }

    #[test]
    fn test_partition_is_deterministic() {
        let a = key(
            "some term",
            IndexRef::Field(0),
            Occurrence::Posting { doc: 0, position: 0 },
        );
        assert_eq!(a.partition(16), a.partition(16));
    }
}
