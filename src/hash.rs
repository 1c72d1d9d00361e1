//! Read-only resource → id hash table.
//!
//! The table is a precomputed artifact mapping every RDF resource URI (and
//! literal) in the collection to a dense integer id. It is built offline as
//! an FST map, memory-mapped here, and never mutated: one instance can be
//! shared by all worker partitions.

use std::fs::File;
use std::path::Path;

use fst::Map;
use memmap2::Mmap;

use crate::error::Result;

/// Memory-mapped resource id lookup table.
pub struct ResourceHash {
    map: Map<Mmap>,
}

impl std::fmt::Debug for ResourceHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHash")
            .field("len", &self.map.len())
            .finish()
    }
}

impl ResourceHash {
    /// Open a resource hash file.
    ///
    /// The mapping is read-only; the file must not be modified while open.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mmap = unsafe { Mmap::map(&file)? };
        let map = Map::new(mmap)?;
        Ok(ResourceHash { map })
    }

    /// Look up the id of a resource. Returns `None` if the resource is not
    /// in the table.
    pub fn get(&self, resource: &str) -> Option<u64> {
        self.map.get(resource.as_bytes())
    }

    /// Number of resources in the table.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
