pub const DEFAULT_LOGS_ROOT: &str = "Logs";
pub const DEFAULT_PROGRESS_INTERVAL_LINES: u64 = 100;
pub const DEFAULT_IO_BUFFER_SIZE_KB: usize = 64;
pub const DEFAULT_MEMORY_USAGE_PERCENT: f64 = 60.0;

pub const MIN_PROGRESS_INTERVAL_LINES: u64 = 1;
pub const MAX_PROGRESS_INTERVAL_LINES: u64 = 1_000_000;
pub const MIN_IO_BUFFER_SIZE_KB: usize = 4;
pub const MAX_IO_BUFFER_SIZE_KB: usize = 65_536;
pub const MIN_MEMORY_USAGE_PERCENT: f64 = 10.0;
pub const MAX_MEMORY_USAGE_PERCENT: f64 = 90.0;

pub const BYTES_PER_KB: usize = 1024;
pub const BYTES_PER_MB: usize = 1_048_576;
pub const PERCENT_100: f64 = 100.0;

pub const FIELD_SEPARATOR: u8 = b':';
pub const RECORD_FIELDS: usize = 3;
pub const LINE_TERMINATOR: u8 = b'\n';
pub const CARRIAGE_RETURN: u8 = b'\r';

/// Rough per-entry overhead of the in-memory index on top of the key bytes.
pub const INDEX_ENTRY_OVERHEAD_BYTES: u64 = 48;

pub const RUN_DIRECTORY_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
pub const REJECTION_LOG_EXTENSION: &str = "txt";
pub const MAX_RUN_DIRECTORY_SUFFIX: u32 = 1000;

pub const WORKER_THREAD_NAME: &str = "ulp-sift-worker";
pub const CLI_PROGRESS_INTERVAL_MS: u64 = 1000;
