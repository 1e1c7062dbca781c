use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::constants::LINE_TERMINATOR;
use crate::engine::error::{Resource, SiftError};

/// Append-only handle on the master file.
///
/// Every record is written together with its `\n` and pushed to the OS before `append`
/// returns, so a record is on disk before the worker counts it.
pub struct MasterWriter {
    path: PathBuf,
    file: File,
    sync_each_record: bool,
    records_appended: u64,
    line: Vec<u8>,
}

impl MasterWriter {
    pub fn open(path: &Path, sync_each_record: bool) -> Result<Self, SiftError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)
            .map_err(|e| SiftError::resource(Resource::MasterFile, path, e))?;

        if Self::needs_separator(&mut file)
            .map_err(|e| SiftError::resource(Resource::MasterFile, path, e))?
        {
            file.write_all(&[LINE_TERMINATOR])
                .map_err(|e| SiftError::resource(Resource::MasterFile, path, e))?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            sync_each_record,
            records_appended: 0,
            line: Vec::new(),
        })
    }

    /// A non-empty master file whose last byte is not a newline would fuse its last
    /// record with the first appended one.
    fn needs_separator(file: &mut File) -> io::Result<bool> {
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(false);
        }

        let mut last = [0u8; 1];
        file.seek(SeekFrom::Start(len - 1))?;
        file.read_exact(&mut last)?;
        Ok(last[0] != LINE_TERMINATOR)
    }

    pub fn append(&mut self, record: &[u8]) -> Result<(), SiftError> {
        self.line.clear();
        self.line.extend_from_slice(record);
        self.line.push(LINE_TERMINATOR);

        // One write per record keeps a stopped or crashed run from leaving half a line.
        self.file
            .write_all(&self.line)
            .and_then(|_| self.file.flush())
            .map_err(|e| SiftError::resource(Resource::MasterFile, &self.path, e))?;

        if self.sync_each_record {
            self.file
                .sync_data()
                .map_err(|e| SiftError::resource(Resource::MasterFile, &self.path, e))?;
        }

        self.records_appended += 1;
        Ok(())
    }

    /// Flushes and syncs the file, then releases the handle.
    pub fn finish(mut self) -> Result<u64, SiftError> {
        self.file
            .flush()
            .and_then(|_| self.file.sync_all())
            .map_err(|e| SiftError::resource(Resource::MasterFile, &self.path, e))?;
        Ok(self.records_appended)
    }
}
