//! On-disk compressed index format.
//!
//! One index per field, under a worker partition's output directory. Each
//! index `N` is a set of append-only channels:
//!
//! - `N.index`: entropy-coded posting bitstream with per-term skip tables
//! - `N.terms`: newline-delimited sorted term dictionary (UTF-8)
//! - `N.offsets`: gamma-coded bit offsets of term starts in `N.index`
//! - `N.posnumbits`: per-term position-component bit counts (positional
//!   indexes only)
//! - `N.properties`: text key/value metadata
//!
//! # Module Structure
//!
//! - `bits`: bit-level streams and unary/gamma/delta codes
//! - `writer`: append-only index writer driven by the aggregator
//! - `reader`: sequential decoder for verification and inspection

pub mod bits;
pub mod reader;
pub mod writer;

pub use reader::{IndexReader, TermPostings};
pub use writer::{DocPosting, IndexWriter, TermRecord};
