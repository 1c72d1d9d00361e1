//! In-process pipeline driving a whole index generation run.
//!
//! Stands in for the distributed sort/shuffle substrate: events are routed
//! to in-memory partitions by the partition function, each partition is
//! sorted and scanned for (term, index) groups, and the groups are fed to
//! the aggregator. Partitions are independent after routing and run in
//! parallel.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::{FieldSpec, GeneratorConfig};
use crate::document::DocumentSource;
use crate::error::{LunariaError, Result};
use crate::generator::aggregator::PostingAggregator;
use crate::generator::counters::GeneratorCounters;
use crate::generator::emitter::{EventSink, OccurrenceEmitter};
use crate::generator::key::TermKey;
use crate::generator::registry::IndexRegistry;
use crate::hash::ResourceHash;

/// Name of the per-run metadata file.
const METADATA_FILE: &str = "metadata.json";

/// Routes each event to its partition.
struct PartitionSink<'a> {
    partitions: &'a mut [Vec<TermKey>],
}

impl EventSink for PartitionSink<'_> {
    fn emit(&mut self, key: TermKey) -> Result<()> {
        let partition = key.partition(self.partitions.len());
        self.partitions[partition].push(key);
        Ok(())
    }
}

#[derive(Serialize)]
struct RunMetadata<'a> {
    config: &'a GeneratorConfig,
    counters: &'a GeneratorCounters,
}

/// One full index generation run.
pub struct IndexGenerator {
    config: GeneratorConfig,
    fields: Vec<FieldSpec>,
}

impl IndexGenerator {
    pub fn new(config: GeneratorConfig, fields: Vec<FieldSpec>) -> Result<Self> {
        if config.partitions == 0 {
            return Err(LunariaError::config("partition count must be positive"));
        }
        if fields.is_empty() {
            return Err(LunariaError::config("field set is empty"));
        }
        Ok(IndexGenerator { config, fields })
    }

    /// Generate all indexes for the documents of `source` under
    /// `output_dir`, one subdirectory per partition.
    ///
    /// Returns the merged counters of the run. The output is a pure
    /// function of the input collection and the configuration, so re-runs
    /// produce identical bytes.
    pub fn run<S, P>(
        &self,
        mut source: S,
        hash: Option<&ResourceHash>,
        output_dir: P,
    ) -> Result<GeneratorCounters>
    where
        S: DocumentSource,
        P: AsRef<Path>,
    {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)?;

        let emitter = OccurrenceEmitter::new(&self.fields, self.config.method, hash)?;
        let mut partitions: Vec<Vec<TermKey>> = vec![Vec::new(); self.config.partitions];
        let mut counters = GeneratorCounters::default();

        let mut sink = PartitionSink {
            partitions: &mut partitions,
        };
        while let Some(document) = source.next_document()? {
            emitter.emit_document(&document, &mut sink, &mut counters)?;
        }
        info!(
            "emitted {} occurrences from {} documents into {} partitions",
            counters.indexed_occurrences,
            counters.documents,
            self.config.partitions
        );

        let partition_counters = partitions
            .into_par_iter()
            .enumerate()
            .map(|(partition, events)| self.run_partition(partition, events, output_dir))
            .collect::<Result<Vec<_>>>()?;
        for partition in &partition_counters {
            counters.merge(partition);
        }

        self.write_metadata(&output_dir.join(METADATA_FILE), &counters)?;
        info!("index generation finished under {}", output_dir.display());
        Ok(counters)
    }

    /// Sort one partition's events and aggregate its (term, index) groups.
    fn run_partition(
        &self,
        partition: usize,
        mut events: Vec<TermKey>,
        output_dir: &Path,
    ) -> Result<GeneratorCounters> {
        let dir = partition_dir(output_dir, partition);
        let mut registry = IndexRegistry::open(&dir, &self.config, &self.fields)?;
        let mut counters = GeneratorCounters::default();
        let aggregator = PostingAggregator::new(&self.config);

        events.sort_unstable();

        let mut start = 0;
        while start < events.len() {
            let mut end = start + 1;
            while end < events.len() && events[end].same_group(&events[start]) {
                end += 1;
            }
            let head = &events[start];
            aggregator.aggregate(
                &head.term,
                head.index,
                events[start..end].iter().map(|key| key.occurrence),
                &mut registry,
                &mut counters,
            )?;
            start = end;
        }

        registry.close()?;
        self.write_metadata(&dir.join(METADATA_FILE), &counters)?;
        info!("partition {partition} aggregated {} events", events.len());
        Ok(counters)
    }

    fn write_metadata(&self, path: &Path, counters: &GeneratorCounters) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(
            &mut out,
            &RunMetadata {
                config: &self.config,
                counters,
            },
        )?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}

/// Output directory of one partition.
pub fn partition_dir(output_dir: &Path, partition: usize) -> PathBuf {
    output_dir.join(format!("partition-{partition:05}"))
}
