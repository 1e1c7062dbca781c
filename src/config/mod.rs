pub mod model;


use anyhow::Result;
use std::path::Path;
use tokio::fs;

use crate::constants::*;

// Re-export main types
pub use self::model::SiftConfig;

impl SiftConfig {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: SiftConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.logs_root.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("Logs root must not be empty"));
        }

        if self.progress_interval_lines < MIN_PROGRESS_INTERVAL_LINES
            || self.progress_interval_lines > MAX_PROGRESS_INTERVAL_LINES
        {
            return Err(anyhow::anyhow!(
                "Progress interval must be between {} and {} lines",
                MIN_PROGRESS_INTERVAL_LINES,
                MAX_PROGRESS_INTERVAL_LINES
            ));
        }

        if self.io_buffer_size_kb < MIN_IO_BUFFER_SIZE_KB
            || self.io_buffer_size_kb > MAX_IO_BUFFER_SIZE_KB
        {
            return Err(anyhow::anyhow!(
                "IO buffer size must be between {} and {} KB",
                MIN_IO_BUFFER_SIZE_KB,
                MAX_IO_BUFFER_SIZE_KB
            ));
        }

        let memory_range = MIN_MEMORY_USAGE_PERCENT..=MAX_MEMORY_USAGE_PERCENT;
        if !memory_range.contains(&self.memory_usage_percent) {
            return Err(anyhow::anyhow!(
                "Memory usage percent must be between {} and {}",
                MIN_MEMORY_USAGE_PERCENT,
                MAX_MEMORY_USAGE_PERCENT
            ));
        }

        Ok(())
    }

    pub fn io_buffer_size_bytes(&self) -> usize {
        self.io_buffer_size_kb * BYTES_PER_KB
    }

    /// Share of total RAM the dedup index may occupy before a run warns about it.
    pub fn memory_limit_bytes(&self) -> u64 {
        use sysinfo::System;
        let mut system = System::new();
        system.refresh_memory();

        let total_memory = system.total_memory() as f64;
        (total_memory * self.memory_usage_percent / PERCENT_100) as u64
    }
}
