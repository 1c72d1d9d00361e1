//! Per-document occurrence emission.

use ahash::AHashMap;
use log::debug;

use crate::config::{FieldSpec, IndexingMethod};
use crate::document::Document;
use crate::error::{LunariaError, Result};
use crate::generator::counters::GeneratorCounters;
use crate::generator::event::{IndexRef, Occurrence};
use crate::generator::key::TermKey;
use crate::hash::ResourceHash;

/// Where emitted events go. In production this is the substrate's shuffle
/// input; tests collect into a vector.
pub trait EventSink {
    fn emit(&mut self, key: TermKey) -> Result<()>;
}

impl EventSink for Vec<TermKey> {
    fn emit(&mut self, key: TermKey) -> Result<()> {
        self.push(key);
        Ok(())
    }
}

/// Turns one document at a time into occurrence events.
///
/// For every token of every indexed field one `Posting` event is emitted;
/// at field end, exactly one `Presence` marker per distinct term carries the
/// in-document statistics. In vertical mode each distinct term additionally
/// yields an `Alignment` marker carrying the field's resolved predicate id.
pub struct OccurrenceEmitter<'a> {
    fields: &'a [FieldSpec],
    method: IndexingMethod,
    /// Resolved predicate id per field (vertical mode). `None` means the
    /// predicate is not in the resource hash; alignment is skipped for that
    /// field.
    alignment_ids: Vec<Option<u32>>,
}

impl<'a> OccurrenceEmitter<'a> {
    pub fn new(
        fields: &'a [FieldSpec],
        method: IndexingMethod,
        hash: Option<&ResourceHash>,
    ) -> Result<Self> {
        let alignment_ids = match method {
            IndexingMethod::Horizontal => Vec::new(),
            IndexingMethod::Vertical => {
                let hash = hash.ok_or_else(|| {
                    LunariaError::config("vertical indexing requires a resource hash")
                })?;
                fields
                    .iter()
                    .map(|field| {
                        let id = hash.get(&field.resource).map(|id| id as u32);
                        if id.is_none() {
                            debug!("predicate {} not in resource hash", field.resource);
                        }
                        id
                    })
                    .collect()
            }
        };
        Ok(OccurrenceEmitter {
            fields,
            method,
            alignment_ids,
        })
    }

    /// Emit all events for one document.
    ///
    /// Documents that failed upstream parsing are counted and skipped;
    /// empty documents still count as processed.
    pub fn emit_document<S: EventSink>(
        &self,
        doc: &Document,
        sink: &mut S,
        counters: &mut GeneratorCounters,
    ) -> Result<()> {
        if doc.is_parse_failure() {
            debug!("skipping document that failed parsing");
            counters.failed_parsing += 1;
            return Ok(());
        }

        // Reused across fields; term -> (occurrence count, last position).
        let mut term_stats: AHashMap<&str, (u32, u32)> = AHashMap::new();

        for (field, spec) in self.fields.iter().enumerate() {
            if !spec.indexed {
                continue;
            }
            let index = IndexRef::Field(field as u32);

            for (position, term) in doc.tokens(field).iter().enumerate() {
                let position = position as u32;
                sink.emit(TermKey::new(
                    term.clone(),
                    index,
                    Occurrence::Posting {
                        doc: doc.id(),
                        position,
                    },
                ))?;
                counters.indexed_occurrences += 1;

                let stats = term_stats.entry(term.as_str()).or_insert((0, 0));
                stats.0 += 1;
                stats.1 = position;
            }

            let alignment_id = match self.method {
                IndexingMethod::Vertical => self.alignment_ids[field],
                IndexingMethod::Horizontal => None,
            };
            if self.method == IndexingMethod::Vertical
                && alignment_id.is_none()
                && !term_stats.is_empty()
            {
                counters.unresolved_predicates += 1;
            }

            for (term, (count, last_position)) in term_stats.drain() {
                sink.emit(TermKey::new(
                    term.to_string(),
                    index,
                    Occurrence::Presence {
                        doc: doc.id(),
                        count,
                        last_position,
                    },
                ))?;
                if let Some(predicate) = alignment_id {
                    sink.emit(TermKey::new(
                        term.to_string(),
                        IndexRef::Alignment,
                        Occurrence::Alignment { predicate },
                    ))?;
                }
            }
        }

        counters.documents += 1;
        Ok(())
    }
}
