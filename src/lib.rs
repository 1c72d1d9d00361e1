//! # Lunaria
//!
//! A compressed positional inverted index builder for RDF data.
//!
//! Lunaria turns collections of field-tagged term occurrences (produced from
//! parsed RDF documents) into MG4J-style compressed positional indexes, one
//! per field. The construction is a single forward pass over externally
//! sorted occurrence data: a composite ordering protocol guarantees that all
//! statistics for a term arrive before its postings, so document frequencies
//! are known without buffering whole posting lists in memory.
//!
//! ## Features
//!
//! - Pure Rust implementation
//! - Streaming single-pass posting aggregation
//! - Gamma/delta entropy-coded posting bitstreams with skip tables
//! - Horizontal (flat token stream) and vertical (field-per-predicate)
//!   indexing strategies, including the vertical alignment index
//! - Deterministic term-hash partitioning for parallel workers

// Core modules
mod config;
mod document;
mod error;
pub mod generator;
pub mod hash;
pub mod index;

// Re-exports for the public API
pub use config::{FieldSpec, GeneratorConfig, IndexingMethod, encode_field_name};
pub use document::{Document, DocumentSource, FAILED_PARSE_SUBJECT, TsvDocumentSource};
pub use error::{LunariaError, Result};
pub use generator::counters::GeneratorCounters;
pub use generator::pipeline::IndexGenerator;
pub use hash::ResourceHash;
pub use index::writer::{DocPosting, IndexWriter, TermRecord};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
