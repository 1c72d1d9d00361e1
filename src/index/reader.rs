//! Sequential index decoder.
//!
//! Decodes one field's file set back into per-term posting lists. Used by
//! the verification tests and the inspection tooling; query-time search is
//! out of scope, so the reader favors simplicity: the whole index is decoded
//! front to back, validating offsets as it goes.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use ahash::AHashMap;

use crate::error::{LunariaError, Result};
use crate::index::bits::BitReader;
use crate::index::writer::DocPosting;

/// Decoded postings of one term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermPostings {
    pub frequency: u64,
    pub documents: Vec<DocPosting>,
}

/// Parsed `.properties` metadata.
#[derive(Debug, Clone)]
pub struct IndexProperties {
    pub field: String,
    pub documents: u64,
    pub terms: u64,
    pub postings: u64,
    pub occurrences: u64,
    pub skip_quantum: u32,
    pub skip_height: u32,
    pub has_positions: bool,
}

/// In-memory decoded index for one field.
pub struct IndexReader {
    properties: IndexProperties,
    terms: Vec<String>,
    postings: Vec<TermPostings>,
}

impl IndexReader {
    /// Open and fully decode the index `name` under `dir`.
    pub fn open<P: AsRef<Path>>(dir: P, name: &str) -> Result<Self> {
        let dir = dir.as_ref();
        let properties = read_properties(&dir.join(format!("{name}.properties")))?;

        let terms_file = BufReader::new(File::open(dir.join(format!("{name}.terms")))?);
        let terms = terms_file.lines().collect::<std::io::Result<Vec<_>>>()?;
        if terms.len() as u64 != properties.terms {
            return Err(LunariaError::index(format!(
                "index {name}: terms file has {} entries, properties say {}",
                terms.len(),
                properties.terms
            )));
        }

        let offsets = read_offsets(&dir.join(format!("{name}.offsets")), terms.len())?;

        let index_file = BufReader::new(File::open(dir.join(format!("{name}.index")))?);
        let mut bits = BitReader::new(index_file);
        let mut postings = Vec::with_capacity(terms.len());
        for (rank, term) in terms.iter().enumerate() {
            if bits.consumed_bits() != offsets[rank] {
                return Err(LunariaError::index(format!(
                    "index {name}: term '{term}' starts at bit {} but offsets say {}",
                    bits.consumed_bits(),
                    offsets[rank]
                )));
            }
            postings.push(read_term(&mut bits, &properties)?);
        }
        if bits.consumed_bits() != offsets[terms.len()] {
            return Err(LunariaError::index(format!(
                "index {name}: bitstream ends at bit {} but offsets say {}",
                bits.consumed_bits(),
                offsets[terms.len()]
            )));
        }

        Ok(IndexReader {
            properties,
            terms,
            postings,
        })
    }

    pub fn properties(&self) -> &IndexProperties {
        &self.properties
    }

    /// All terms, in dictionary order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Postings by term rank.
    pub fn postings_at(&self, rank: usize) -> &TermPostings {
        &self.postings[rank]
    }

    /// Postings for a term, if present.
    pub fn postings(&self, term: &str) -> Option<&TermPostings> {
        let rank = self.terms.binary_search_by(|t| t.as_str().cmp(term)).ok()?;
        Some(&self.postings[rank])
    }
}

fn read_properties(path: &Path) -> Result<IndexProperties> {
    let mut entries = AHashMap::new();
    let file = BufReader::new(File::open(path)?);
    for line in file.lines() {
        let line = line?;
        if let Some((key, value)) = line.split_once('=') {
            entries.insert(key.to_string(), value.to_string());
        }
    }
    let get = |key: &str| -> Result<String> {
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| LunariaError::index(format!("properties missing '{key}'")))
    };
    let parse = |key: &str| -> Result<u64> {
        get(key)?
            .parse::<u64>()
            .map_err(|e| LunariaError::index(format!("properties '{key}': {e}")))
    };
    Ok(IndexProperties {
        field: get("field")?,
        documents: parse("documents")?,
        terms: parse("terms")?,
        postings: parse("postings")?,
        occurrences: parse("occurrences")?,
        skip_quantum: parse("skipquantum")? as u32,
        skip_height: parse("skipheight")? as u32,
        has_positions: entries.contains_key("coding.positions"),
    })
}

/// Decode the offsets stream into absolute bit offsets (terms + 1 entries).
fn read_offsets(path: &Path, term_count: usize) -> Result<Vec<u64>> {
    let file = BufReader::new(File::open(path)?);
    let mut bits = BitReader::new(file);
    let mut offsets = Vec::with_capacity(term_count + 1);
    let mut offset = 0u64;
    for _ in 0..=term_count {
        offset += bits.read_gamma()?;
        offsets.push(offset);
    }
    Ok(offsets)
}

fn read_term<R: Read>(bits: &mut BitReader<R>, properties: &IndexProperties) -> Result<TermPostings> {
    let frequency = bits.read_gamma()?;

    // Skip table shape mirrors the writer exactly.
    let quantum = u64::from(properties.skip_quantum);
    let blocks = frequency.div_ceil(quantum) as usize;
    if blocks > 1 {
        let stride = std::cmp::max(1, blocks.div_ceil(1usize << properties.skip_height));
        let mut block = stride;
        while block < blocks {
            bits.read_delta()?; // document gap
            bits.read_delta()?; // run bit length
            block += stride;
        }
    }

    let mut documents = Vec::with_capacity(frequency as usize);
    let mut prev_doc: Option<u32> = None;
    for _ in 0..frequency {
        let gap = bits.read_delta()? as u32;
        let doc = match prev_doc {
            None => gap,
            Some(prev) => prev + gap + 1,
        };
        prev_doc = Some(doc);

        let mut positions = Vec::new();
        if properties.has_positions {
            let count = bits.read_gamma()?;
            let mut prev_position: Option<u32> = None;
            for _ in 0..count {
                let gap = bits.read_delta()? as u32;
                let position = match prev_position {
                    None => gap,
                    Some(prev) => prev + gap + 1,
                };
                prev_position = Some(position);
                positions.push(position);
            }
        }
        documents.push(DocPosting { doc, positions });
    }

    Ok(TermPostings {
        frequency,
        documents,
    })
}
