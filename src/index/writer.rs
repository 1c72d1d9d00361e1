//! Append-only compressed index writer.
//!
//! The writer is driven by the aggregator's output order: one
//! [`TermRecord`] per term in strictly increasing term order, followed by
//! that term's [`DocPosting`] records in strictly increasing document order.
//! Postings of the current term are buffered as encoded blocks of
//! `skip_quantum` documents so the skip table (whose entry lengths are only
//! known once the blocks are encoded) can be emitted in front of them; no
//! more than one term is ever buffered.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::error::{LunariaError, Result};
use crate::index::bits::{BitBuffer, BitWriter};

/// Per-term statistics record. Precedes the term's postings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermRecord {
    pub term: String,
    /// Document frequency, already capped by the aggregator.
    pub frequency: u64,
    /// Total number of occurrences over all documents.
    pub occurrence_count: u64,
    /// Sum of each document's last occurrence position. Statistics only.
    pub sum_of_last_positions: u64,
}

/// One document's postings for the current term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocPosting {
    pub doc: u32,
    /// Ascending, de-duplicated positions. Ignored by writers of
    /// frequency-only indexes.
    pub positions: Vec<u32>,
}

/// Codings used by the posting bitstream, recorded in the properties file.
const FREQUENCIES_CODING: &str = "GAMMA";
const POINTERS_CODING: &str = "DELTA";
const COUNTS_CODING: &str = "GAMMA";
const POSITIONS_CODING: &str = "DELTA";

/// State of the term currently being assembled.
struct PendingTerm {
    frequency: u64,
    /// Sealed blocks: (first document id, encoded bits).
    blocks: Vec<(u32, BitBuffer)>,
    open: BitWriter<Vec<u8>>,
    open_first_doc: u32,
    open_docs: u32,
    prev_doc: Option<u32>,
    written_docs: u64,
    position_bits: u64,
}

impl PendingTerm {
    fn new(frequency: u64) -> Self {
        PendingTerm {
            frequency,
            blocks: Vec::new(),
            open: BitWriter::new(Vec::new()),
            open_first_doc: 0,
            open_docs: 0,
            prev_doc: None,
            written_docs: 0,
            position_bits: 0,
        }
    }
}

/// Writer for one field's index file set.
pub struct IndexWriter {
    name: String,
    dir: PathBuf,
    num_documents: u64,
    has_positions: bool,
    skip_quantum: u32,
    skip_height: u32,

    index_out: BitWriter<BufWriter<File>>,
    offsets_out: BitWriter<BufWriter<File>>,
    posnumbits_out: Option<BitWriter<BufWriter<File>>>,
    terms_out: BufWriter<File>,

    pending: Option<PendingTerm>,
    last_term: Option<String>,
    last_offset: u64,

    term_count: u64,
    posting_count: u64,
    occurrence_count: u64,
    max_count: u64,
    stats_occurrences: u64,
    stats_sum_of_last_positions: u64,
}

impl IndexWriter {
    /// Open all output channels for the field `name` under `dir`.
    pub fn open<P: AsRef<Path>>(
        dir: P,
        name: &str,
        num_documents: u64,
        has_positions: bool,
        skip_quantum: u32,
        skip_height: u32,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        if skip_quantum == 0 {
            return Err(LunariaError::config("skip quantum must be positive"));
        }

        debug!("opening index for field {name}");
        let create = |extension: &str| -> Result<BufWriter<File>> {
            let path = dir.join(format!("{name}.{extension}"));
            Ok(BufWriter::new(File::create(path)?))
        };

        let posnumbits_out = if has_positions {
            Some(BitWriter::new(create("posnumbits")?))
        } else {
            None
        };

        Ok(IndexWriter {
            name: name.to_string(),
            num_documents,
            has_positions,
            skip_quantum,
            skip_height,
            index_out: BitWriter::new(create("index")?),
            offsets_out: BitWriter::new(create("offsets")?),
            posnumbits_out,
            terms_out: create("terms")?,
            dir,
            pending: None,
            last_term: None,
            last_offset: 0,
            term_count: 0,
            posting_count: 0,
            occurrence_count: 0,
            max_count: 0,
            stats_occurrences: 0,
            stats_sum_of_last_positions: 0,
        })
    }

    /// The field name of this index.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this index stores positions.
    pub fn has_positions(&self) -> bool {
        self.has_positions
    }

    /// Begin a new term. Terms must arrive in strictly increasing order;
    /// the upstream ordering protocol guarantees this, so a violation is a
    /// protocol error, not something to re-sort.
    pub fn write_term_record(&mut self, record: &TermRecord) -> Result<()> {
        if let Some(last) = &self.last_term {
            if record.term.as_str() <= last.as_str() {
                return Err(LunariaError::index(format!(
                    "index {}: term '{}' not after '{}'",
                    self.name, record.term, last
                )));
            }
        }
        self.flush_pending()?;

        self.terms_out.write_all(record.term.as_bytes())?;
        self.terms_out.write_all(b"\n")?;
        self.last_term = Some(record.term.clone());
        self.term_count += 1;
        self.stats_occurrences += record.occurrence_count;
        self.stats_sum_of_last_positions += record.sum_of_last_positions;

        self.pending = Some(PendingTerm::new(record.frequency));
        Ok(())
    }

    /// Append one document's postings to the current term.
    pub fn write_doc_posting(&mut self, posting: &DocPosting) -> Result<()> {
        let has_positions = self.has_positions;
        let quantum = self.skip_quantum;
        let pending = self.pending.as_mut().ok_or_else(|| {
            LunariaError::index("document posting written before any term record")
        })?;

        let gap = match pending.prev_doc {
            None => {
                pending.open_first_doc = posting.doc;
                u64::from(posting.doc)
            }
            Some(prev) if posting.doc > prev => u64::from(posting.doc - prev - 1),
            Some(prev) => {
                return Err(LunariaError::index(format!(
                    "document {} not after {}",
                    posting.doc, prev
                )));
            }
        };

        if pending.open_docs == quantum {
            let sealed = std::mem::replace(&mut pending.open, BitWriter::new(Vec::new()));
            pending
                .blocks
                .push((pending.open_first_doc, sealed.into_buffer()?));
            pending.open_first_doc = posting.doc;
            pending.open_docs = 0;
        }

        pending.open.write_delta(gap)?;
        if has_positions {
            let before = pending.open.written_bits();
            pending.open.write_gamma(posting.positions.len() as u64)?;
            let mut prev_position = None;
            for &position in &posting.positions {
                match prev_position {
                    None => pending.open.write_delta(u64::from(position))?,
                    Some(prev) if position > prev => {
                        pending.open.write_delta(u64::from(position - prev - 1))?
                    }
                    Some(prev) => {
                        return Err(LunariaError::index(format!(
                            "position {position} not after {prev}"
                        )));
                    }
                }
                prev_position = Some(position);
            }
            pending.position_bits += pending.open.written_bits() - before;

            let count = posting.positions.len() as u64;
            self.occurrence_count += count;
            self.max_count = self.max_count.max(count);
        }

        pending.prev_doc = Some(posting.doc);
        pending.open_docs += 1;
        pending.written_docs += 1;
        self.posting_count += 1;
        Ok(())
    }

    /// Emit the buffered term to the posting bitstream.
    fn flush_pending(&mut self) -> Result<()> {
        let Some(mut pending) = self.pending.take() else {
            return Ok(());
        };

        if pending.open_docs > 0 {
            let sealed = std::mem::replace(&mut pending.open, BitWriter::new(Vec::new()));
            pending
                .blocks
                .push((pending.open_first_doc, sealed.into_buffer()?));
        }

        if pending.frequency > 0 && pending.written_docs != pending.frequency {
            return Err(LunariaError::index(format!(
                "index {}: term frequency {} but {} document records",
                self.name, pending.frequency, pending.written_docs
            )));
        }

        let start = self.index_out.written_bits();
        self.offsets_out.write_gamma(start - self.last_offset)?;
        self.last_offset = start;

        self.index_out.write_gamma(pending.frequency)?;

        let blocks = &pending.blocks;
        if blocks.len() > 1 {
            // Skip table: one entry per `stride` blocks, at most 2^height
            // entries. Each entry carries the gap to the first document of
            // its block run and the bit length of the preceding run.
            let stride = std::cmp::max(1, blocks.len().div_ceil(1usize << self.skip_height));
            let mut prev_doc = blocks[0].0;
            let mut prev_block = 0usize;
            let mut block = stride;
            while block < blocks.len() {
                let run_bits: u64 = blocks[prev_block..block]
                    .iter()
                    .map(|(_, buffer)| buffer.len_bits())
                    .sum();
                self.index_out
                    .write_delta(u64::from(blocks[block].0 - prev_doc - 1))?;
                self.index_out.write_delta(run_bits)?;
                prev_doc = blocks[block].0;
                prev_block = block;
                block += stride;
            }
        }

        for (_, buffer) in blocks {
            self.index_out.append(buffer)?;
        }

        if let Some(posnumbits) = &mut self.posnumbits_out {
            posnumbits.write_gamma(pending.position_bits)?;
        }
        Ok(())
    }

    /// Finalize all channels: flush the last term, write the closing offset
    /// and the properties metadata.
    pub fn close(mut self) -> Result<()> {
        self.flush_pending()?;

        let total = self.index_out.written_bits();
        self.offsets_out.write_gamma(total - self.last_offset)?;
        self.write_properties()?;

        let (inner, _) = self.index_out.finish()?;
        inner.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        let (inner, _) = self.offsets_out.finish()?;
        inner.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        if let Some(posnumbits) = self.posnumbits_out {
            let (inner, _) = posnumbits.finish()?;
            inner.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        }
        self.terms_out.flush()?;

        if self.has_positions && self.occurrence_count != self.stats_occurrences {
            warn!(
                "index {}: wrote {} occurrences but term records claim {}",
                self.name, self.occurrence_count, self.stats_occurrences
            );
        }

        info!(
            "closed index {} with {} terms, {} postings, {} occurrences",
            self.name, self.term_count, self.posting_count, self.occurrence_count
        );
        Ok(())
    }

    fn write_properties(&self) -> Result<()> {
        let path = self.dir.join(format!("{}.properties", self.name));
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "field={}", self.name)?;
        writeln!(out, "documents={}", self.num_documents)?;
        writeln!(out, "terms={}", self.term_count)?;
        writeln!(out, "postings={}", self.posting_count)?;
        writeln!(out, "occurrences={}", self.occurrence_count)?;
        writeln!(out, "maxcount={}", self.max_count)?;
        writeln!(out, "sumoflastpositions={}", self.stats_sum_of_last_positions)?;
        writeln!(out, "termprocessor=lowercase")?;
        writeln!(out, "skipquantum={}", self.skip_quantum)?;
        writeln!(out, "skipheight={}", self.skip_height)?;
        writeln!(out, "coding.frequencies={FREQUENCIES_CODING}")?;
        writeln!(out, "coding.pointers={POINTERS_CODING}")?;
        if self.has_positions {
            writeln!(out, "coding.counts={COUNTS_CODING}")?;
            writeln!(out, "coding.positions={POSITIONS_CODING}")?;
        }
        out.flush()?;
        Ok(())
    }
}
