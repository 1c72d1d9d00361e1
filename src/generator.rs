//! Distributed index construction pipeline.
//!
//! The pipeline is a single forward pass over externally sorted occurrence
//! data: the emitter turns each document into typed occurrence events, the
//! ordering protocol ([`key`]) fixes how the sort/shuffle substrate must
//! order and group them, the aggregator folds one sorted group at a time
//! into term statistics and per-document position lists, and the registry
//! routes the results into per-field index writers.
//!
//! # Module Structure
//!
//! - `event`: typed occurrence events and their total order
//! - `key`: composite key, partition/sort/group functions
//! - `emitter`: per-document occurrence emission
//! - `aggregator`: streaming group aggregation
//! - `registry`: per-partition writer ownership
//! - `pipeline`: in-process substrate stand-in driving a whole run
//! - `counters`: diagnostic counters

pub mod aggregator;
pub mod counters;
pub mod emitter;
pub mod event;
pub mod key;
pub mod pipeline;
pub mod registry;

pub use aggregator::PostingAggregator;
pub use counters::GeneratorCounters;
pub use emitter::OccurrenceEmitter;
pub use event::{IndexRef, Occurrence};
pub use key::TermKey;
pub use pipeline::IndexGenerator;
pub use registry::IndexRegistry;
