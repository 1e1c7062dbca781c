use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::*;
use crate::engine::classifier::RejectReason;
use crate::engine::error::{Resource, SiftError};

#[derive(Debug, Clone)]
struct RejectedLine {
    line_number: u64,
    raw: Vec<u8>,
}

/// Holds rejected lines grouped by reason until the run ends, then writes one log file
/// per reason into a fresh folder named after the run's start time.
#[derive(Debug)]
pub struct RejectionSink {
    buckets: BTreeMap<RejectReason, Vec<RejectedLine>>,
    run_started: DateTime<Local>,
    write_empty_logs: bool,
    annotate_line_numbers: bool,
}

impl RejectionSink {
    pub fn new(
        run_started: DateTime<Local>,
        write_empty_logs: bool,
        annotate_line_numbers: bool,
    ) -> Self {
        Self {
            buckets: BTreeMap::new(),
            run_started,
            write_empty_logs,
            annotate_line_numbers,
        }
    }

    /// `raw_line` is stored as read, minus its line terminator.
    pub fn record(&mut self, reason: RejectReason, line_number: u64, raw_line: &[u8]) {
        self.buckets.entry(reason).or_default().push(RejectedLine {
            line_number,
            raw: raw_line.to_vec(),
        });
    }

    pub fn count(&self, reason: RejectReason) -> usize {
        self.buckets.get(&reason).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(Vec::is_empty)
    }

    /// Writes the buffered lines under `logs_root` and clears the buffers.
    ///
    /// Returns the run folder, or `None` when there was nothing to write and empty logs
    /// are not requested.
    pub fn flush(&mut self, logs_root: &Path) -> Result<Option<PathBuf>, SiftError> {
        if self.is_empty() && !self.write_empty_logs {
            debug!("No rejected lines, skipping rejection logs");
            return Ok(None);
        }

        let run_dir = self
            .create_run_directory(logs_root)
            .map_err(|e| SiftError::resource(Resource::RejectionLogs, logs_root, e))?;

        for reason in RejectReason::ALL {
            let lines = self.buckets.get(&reason).map(Vec::as_slice).unwrap_or(&[]);
            if lines.is_empty() && !self.write_empty_logs {
                continue;
            }

            let log_path = run_dir
                .join(reason.label())
                .with_extension(REJECTION_LOG_EXTENSION);
            self.write_log(&log_path, lines)
                .map_err(|e| SiftError::resource(Resource::RejectionLogs, &log_path, e))?;
            debug!("Wrote {} {} rejections to {}", lines.len(), reason, log_path.display());
        }

        self.buckets.clear();
        Ok(Some(run_dir))
    }

    fn write_log(&self, log_path: &Path, lines: &[RejectedLine]) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(log_path)?);
        for line in lines {
            if self.annotate_line_numbers {
                write!(writer, "Line {}: ", line.line_number)?;
            }
            writer.write_all(&line.raw)?;
            writer.write_all(&[LINE_TERMINATOR])?;
        }
        writer.flush()
    }

    /// Creates `<logs_root>/<start time>`, adding `-1`, `-2`, ... if that folder is taken.
    fn create_run_directory(&self, logs_root: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(logs_root)?;
        let stem = self.run_started.format(RUN_DIRECTORY_FORMAT).to_string();

        for suffix in 0..MAX_RUN_DIRECTORY_SUFFIX {
            let name = if suffix == 0 { stem.clone() } else { format!("{}-{}", stem, suffix) };
            let candidate = logs_root.join(name);
            match fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free run folder for {} under {}", stem, logs_root.display()),
        ))
    }
}
