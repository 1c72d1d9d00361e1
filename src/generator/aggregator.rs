//! Streaming group aggregation.
//!
//! One call consumes one sorted (term, index) group in a single forward
//! pass. Because statistics markers order before real postings, the term
//! record is complete before the first posting is written, and nothing
//! beyond the current document's position list is buffered.

use log::debug;

use crate::config::GeneratorConfig;
use crate::error::{LunariaError, Result};
use crate::generator::counters::GeneratorCounters;
use crate::generator::event::{IndexRef, Occurrence};
use crate::generator::registry::IndexRegistry;
use crate::index::writer::{DocPosting, TermRecord};

/// Folds one sorted occurrence group at a time into a term record and its
/// posting list, enforcing the capacity caps.
pub struct PostingAggregator {
    max_posting_list_size: usize,
    max_position_list_size: usize,
}

impl PostingAggregator {
    pub fn new(config: &GeneratorConfig) -> Self {
        PostingAggregator {
            max_posting_list_size: config.max_posting_list_size,
            max_position_list_size: config.max_position_list_size,
        }
    }

    /// Aggregate the events of one (term, index) group into `registry`.
    ///
    /// `occurrences` must be the group's events in ascending event order;
    /// consecutive duplicates (replayed input) are ignored. An empty group
    /// is a no-op.
    pub fn aggregate<I>(
        &self,
        term: &str,
        index: IndexRef,
        occurrences: I,
        registry: &mut IndexRegistry,
        counters: &mut GeneratorCounters,
    ) -> Result<()>
    where
        I: IntoIterator<Item = Occurrence>,
    {
        let deduped = Dedup {
            inner: occurrences.into_iter(),
            prev: None,
        };
        match index {
            IndexRef::Alignment => self.aggregate_alignment(term, deduped, registry, counters),
            IndexRef::Field(_) => self.aggregate_field(term, index, deduped, registry, counters),
        }
    }

    /// Alignment groups hold one `Alignment` marker per predicate the term
    /// occurs under; the predicate ids become the document list of a
    /// frequency-only index.
    fn aggregate_alignment<I>(
        &self,
        term: &str,
        occurrences: I,
        registry: &mut IndexRegistry,
        counters: &mut GeneratorCounters,
    ) -> Result<()>
    where
        I: Iterator<Item = Occurrence>,
    {
        let mut predicates = Vec::new();
        for event in occurrences {
            match event {
                Occurrence::Alignment { predicate } => predicates.push(predicate),
                other => {
                    return Err(LunariaError::index(format!(
                        "term '{term}': {other:?} in alignment group"
                    )));
                }
            }
        }
        if predicates.is_empty() {
            return Ok(());
        }

        let frequency = predicates.len().min(self.max_posting_list_size);
        if predicates.len() > self.max_posting_list_size {
            debug!("term '{term}': alignment list capped at {frequency}");
            counters.posting_list_overflows += 1;
        }
        registry.write_term_record(
            IndexRef::Alignment,
            &TermRecord {
                term: term.to_string(),
                frequency: frequency as u64,
                occurrence_count: 0,
                sum_of_last_positions: 0,
            },
        )?;
        for &predicate in &predicates[..frequency] {
            registry.write_doc_posting(
                IndexRef::Alignment,
                &DocPosting {
                    doc: predicate,
                    positions: Vec::new(),
                },
            )?;
        }
        Ok(())
    }

    fn aggregate_field<I>(
        &self,
        term: &str,
        index: IndexRef,
        occurrences: I,
        registry: &mut IndexRegistry,
        counters: &mut GeneratorCounters,
    ) -> Result<()>
    where
        I: Iterator<Item = Occurrence>,
    {
        // Marker phase tallies.
        let mut marker_docs = 0usize;
        let mut occurrence_count = 0u64;
        let mut sum_of_last_positions = 0u64;

        // Posting phase state.
        let mut frequency = 0u64;
        let mut record_written = false;
        let mut written_docs = 0u64;
        let mut current: Option<DocPosting> = None;
        let mut positions_truncated = false;

        for event in occurrences {
            match event {
                Occurrence::Presence {
                    count,
                    last_position,
                    ..
                } => {
                    if record_written {
                        return Err(LunariaError::index(format!(
                            "term '{term}': statistics marker after postings"
                        )));
                    }
                    // Statistics track only the documents that will actually
                    // be written once the cap is applied.
                    if marker_docs < self.max_posting_list_size {
                        occurrence_count += u64::from(count);
                        sum_of_last_positions += u64::from(last_position);
                    }
                    marker_docs += 1;
                }
                Occurrence::Alignment { .. } => {
                    return Err(LunariaError::index(format!(
                        "term '{term}': alignment marker in field group"
                    )));
                }
                Occurrence::Posting { doc, position } => {
                    if !record_written {
                        if marker_docs == 0 {
                            return Err(LunariaError::index(format!(
                                "term '{term}': posting without statistics marker"
                            )));
                        }
                        let capped = marker_docs.min(self.max_posting_list_size);
                        if marker_docs > capped {
                            debug!("term '{term}': posting list capped at {capped}");
                            counters.posting_list_overflows += 1;
                        }
                        frequency = capped as u64;
                        registry.write_term_record(
                            index,
                            &TermRecord {
                                term: term.to_string(),
                                frequency,
                                occurrence_count,
                                sum_of_last_positions,
                            },
                        )?;
                        record_written = true;
                    }

                    match &mut current {
                        Some(posting) if posting.doc == doc => {
                            if posting.positions.len() < self.max_position_list_size {
                                posting.positions.push(position);
                            } else if !positions_truncated {
                                debug!("term '{term}': position list capped");
                                counters.position_list_overflows += 1;
                                positions_truncated = true;
                            }
                        }
                        _ => {
                            if let Some(posting) = current.take() {
                                registry.write_doc_posting(index, &posting)?;
                                written_docs += 1;
                            }
                            // Documents beyond the cap are drained without
                            // being written.
                            if written_docs < frequency {
                                current = Some(DocPosting {
                                    doc,
                                    positions: vec![position],
                                });
                            }
                        }
                    }
                }
            }
        }

        if let Some(posting) = current.take() {
            registry.write_doc_posting(index, &posting)?;
            written_docs += 1;
        }
        if marker_docs > 0 && !record_written {
            return Err(LunariaError::index(format!(
                "term '{term}': statistics markers without postings"
            )));
        }
        if record_written && written_docs != frequency {
            return Err(LunariaError::index(format!(
                "term '{term}': {written_docs} documents written, marker count {frequency}"
            )));
        }
        Ok(())
    }
}

/// Skips consecutive duplicate events. Replayed shuffle input shows up as
/// adjacent equal items after sorting.
struct Dedup<I: Iterator<Item = Occurrence>> {
    inner: I,
    prev: Option<Occurrence>,
}

impl<I: Iterator<Item = Occurrence>> Iterator for Dedup<I> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        for event in self.inner.by_ref() {
            if self.prev != Some(event) {
                self.prev = Some(event);
                return Some(event);
            }
        }
        None
    }
}
