use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::*;
use crate::engine::FieldSplit;

/// Tunables for a single sift run. Paths of the target and master file are not part of
/// the configuration; they are handed to `Controller::start` for each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiftConfig {
    /// Directory under which each run creates its timestamped rejection-log folder.
    pub logs_root: PathBuf,
    pub field_split: FieldSplit,
    /// Write a log file for every known reason, even those with no rejections.
    pub write_empty_logs: bool,
    /// Prefix each rejected line with `Line N: ` in the rejection logs.
    pub annotate_line_numbers: bool,
    /// Scan the target once up front so snapshots can carry a total.
    pub count_total_lines: bool,
    pub progress_interval_lines: u64,
    pub io_buffer_size_kb: usize,
    /// `sync_data` the master file after every accepted record instead of only at the end.
    pub sync_each_record: bool,
    pub memory_usage_percent: f64,
    pub verbose: bool,
}

impl Default for SiftConfig {
    fn default() -> Self {
        Self {
            logs_root: PathBuf::from(DEFAULT_LOGS_ROOT),
            field_split: FieldSplit::Strict,
            write_empty_logs: false,
            annotate_line_numbers: false,
            count_total_lines: true,
            progress_interval_lines: DEFAULT_PROGRESS_INTERVAL_LINES,
            io_buffer_size_kb: DEFAULT_IO_BUFFER_SIZE_KB,
            sync_each_record: false,
            memory_usage_percent: DEFAULT_MEMORY_USAGE_PERCENT,
            verbose: false,
        }
    }
}
