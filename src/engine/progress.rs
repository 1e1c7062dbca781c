use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::constants::PERCENT_100;
use crate::engine::classifier::RejectReason;
use crate::engine::error::FailureCause;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Idle,
    Running,
    Paused,
    Stopped,
    Completed,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Stopped | PipelineState::Completed | PipelineState::Failed
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Running => "running",
            PipelineState::Paused => "paused",
            PipelineState::Stopped => "stopped",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of a run. Counters are always line-aligned:
/// `valid_count + rejected_count == processed_lines`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// `None` until the pre-count finishes, or for the whole run if it is disabled.
    pub total_lines: Option<u64>,
    pub processed_lines: u64,
    pub valid_count: u64,
    pub rejected_count: u64,
    pub rejected_by_reason: BTreeMap<RejectReason, u64>,
    pub state: PipelineState,
    pub failure: Option<FailureCause>,
    /// Folder the rejection logs were flushed into, once the run is over.
    pub log_directory: Option<PathBuf>,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            total_lines: None,
            processed_lines: 0,
            valid_count: 0,
            rejected_count: 0,
            rejected_by_reason: BTreeMap::new(),
            state: PipelineState::Idle,
            failure: None,
            log_directory: None,
        }
    }
}

impl ProgressSnapshot {
    pub fn rejected(&self, reason: RejectReason) -> u64 {
        self.rejected_by_reason.get(&reason).copied().unwrap_or(0)
    }

    pub fn percent_complete(&self) -> Option<f64> {
        match self.total_lines {
            Some(0) => Some(PERCENT_100),
            Some(total) => Some(self.processed_lines as f64 / total as f64 * PERCENT_100),
            None => None,
        }
    }

    pub(crate) fn record_valid(&mut self) {
        self.processed_lines += 1;
        self.valid_count += 1;
    }

    pub(crate) fn record_rejected(&mut self, reason: RejectReason) {
        self.processed_lines += 1;
        self.rejected_count += 1;
        *self.rejected_by_reason.entry(reason).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_stay_balanced() {
        let mut snapshot = ProgressSnapshot::default();
        snapshot.record_valid();
        snapshot.record_rejected(RejectReason::EmptyLine);
        snapshot.record_rejected(RejectReason::Duplicate);
        snapshot.record_rejected(RejectReason::Duplicate);

        assert_eq!(snapshot.processed_lines, 4);
        assert_eq!(snapshot.valid_count + snapshot.rejected_count, snapshot.processed_lines);
        assert_eq!(snapshot.rejected(RejectReason::Duplicate), 2);
        assert_eq!(snapshot.rejected(RejectReason::NotEnoughParts), 0);
    }

    #[test]
    fn test_percent_complete() {
        let mut snapshot = ProgressSnapshot::default();
        assert_eq!(snapshot.percent_complete(), None);

        snapshot.total_lines = Some(0);
        assert_eq!(snapshot.percent_complete(), Some(100.0));

        snapshot.total_lines = Some(4);
        snapshot.record_valid();
        assert_eq!(snapshot.percent_complete(), Some(25.0));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!PipelineState::Idle.is_terminal());
        assert!(!PipelineState::Running.is_terminal());
        assert!(!PipelineState::Paused.is_terminal());
        assert!(PipelineState::Stopped.is_terminal());
        assert!(PipelineState::Completed.is_terminal());
        assert!(PipelineState::Failed.is_terminal());
    }
}
