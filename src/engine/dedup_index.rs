use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

use crate::constants::{BYTES_PER_MB, INDEX_ENTRY_OVERHEAD_BYTES};
use crate::engine::classifier::strip_terminator;
use crate::engine::error::{Resource, SiftError};

/// Exact set of every record the master file holds. Records are compared byte for byte
/// and are never removed.
#[derive(Debug, Default)]
pub struct DedupIndex {
    records: HashSet<Box<[u8]>>,
    key_bytes: u64,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every non-empty line of `master_path`. A master file that does not exist yet
    /// gives an empty index; one that exists but cannot be read is an error.
    pub fn seed_from_file(
        master_path: &Path,
        io_buffer_size: usize,
        memory_limit_bytes: u64,
    ) -> Result<Self, SiftError> {
        let file = match File::open(master_path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(
                    "Master file {} does not exist yet, starting with an empty index",
                    master_path.display()
                );
                return Ok(Self::new());
            }
            Err(e) => return Err(SiftError::resource(Resource::MasterFile, master_path, e)),
        };

        if let Ok(metadata) = file.metadata() {
            if metadata.len() > memory_limit_bytes {
                warn!(
                    "Master file is {:.1} MB, above the {:.1} MB index budget; \
                     the in-memory dedup index may exhaust RAM",
                    metadata.len() as f64 / BYTES_PER_MB as f64,
                    memory_limit_bytes as f64 / BYTES_PER_MB as f64
                );
            }
        }

        let mut reader = BufReader::with_capacity(io_buffer_size, file);
        let mut index = Self::new();
        let mut line = Vec::new();

        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .map_err(|e| SiftError::resource(Resource::MasterFile, master_path, e))?;
            if read == 0 {
                break;
            }

            let record = strip_terminator(&line);
            if !record.is_empty() {
                index.insert(record);
            }
        }

        debug!("Seeded dedup index with {} records from {}", index.len(), master_path.display());
        Ok(index)
    }

    pub fn contains(&self, record: &[u8]) -> bool {
        self.records.contains(record)
    }

    /// Returns `true` if the record was not present before.
    pub fn insert(&mut self, record: &[u8]) -> bool {
        if self.records.contains(record) {
            return false;
        }
        self.key_bytes += record.len() as u64;
        self.records.insert(record.into())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn estimated_size_bytes(&self) -> u64 {
        self.key_bytes + self.records.len() as u64 * INDEX_ENTRY_OVERHEAD_BYTES
    }
}
