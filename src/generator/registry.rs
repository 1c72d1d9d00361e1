//! Per-partition writer ownership.

use ahash::AHashMap;
use log::info;
use std::path::{Path, PathBuf};

use crate::config::{ALIGNMENT_INDEX_NAME, FieldSpec, GeneratorConfig, IndexingMethod};
use crate::error::{LunariaError, Result};
use crate::generator::event::IndexRef;
use crate::index::writer::{DocPosting, IndexWriter, TermRecord};

/// Owns one [`IndexWriter`] per index a partition produces and routes
/// aggregator output to the right one.
///
/// In vertical mode this includes the frequency-only alignment index;
/// unindexed fields get no writer, so an event addressed to one is a
/// protocol error upstream.
pub struct IndexRegistry {
    dir: PathBuf,
    writers: AHashMap<IndexRef, IndexWriter>,
}

impl IndexRegistry {
    /// Open writers for every index of `fields` under `dir`.
    pub fn open<P: AsRef<Path>>(
        dir: P,
        config: &GeneratorConfig,
        fields: &[FieldSpec],
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let mut writers = AHashMap::new();

        if config.method == IndexingMethod::Vertical {
            writers.insert(
                IndexRef::Alignment,
                IndexWriter::open(
                    &dir,
                    ALIGNMENT_INDEX_NAME,
                    config.num_documents,
                    false,
                    config.skip_quantum,
                    config.skip_height,
                )?,
            );
        }

        for (field, spec) in fields.iter().enumerate() {
            if !spec.indexed {
                continue;
            }
            writers.insert(
                IndexRef::Field(field as u32),
                IndexWriter::open(
                    &dir,
                    &spec.name,
                    config.num_documents,
                    true,
                    config.skip_quantum,
                    config.skip_height,
                )?,
            );
        }

        info!(
            "opened {} index writers under {}",
            writers.len(),
            dir.display()
        );
        Ok(IndexRegistry { dir, writers })
    }

    /// Directory this registry writes under.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of indexes this registry writes.
    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    fn writer(&mut self, index: IndexRef) -> Result<&mut IndexWriter> {
        self.writers
            .get_mut(&index)
            .ok_or_else(|| LunariaError::index(format!("no writer for {index}")))
    }

    pub fn write_term_record(&mut self, index: IndexRef, record: &TermRecord) -> Result<()> {
        self.writer(index)?.write_term_record(record)
    }

    pub fn write_doc_posting(&mut self, index: IndexRef, posting: &DocPosting) -> Result<()> {
        self.writer(index)?.write_doc_posting(posting)
    }

    /// Close every writer. Deterministic order so log output and failure
    /// attribution are stable across runs.
    pub fn close(self) -> Result<()> {
        let mut writers: Vec<_> = self.writers.into_iter().collect();
        writers.sort_by_key(|(index, _)| *index);
        for (_, writer) in writers {
            writer.close()?;
        }
        Ok(())
    }
}
