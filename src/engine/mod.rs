pub mod classifier;
pub mod controller;
pub mod dedup_index;
pub mod error;
pub mod master_writer;
pub mod progress;
pub mod rejection_sink;


pub use classifier::{classify, FieldSplit, RejectReason, Verdict};
pub use controller::Controller;
pub use dedup_index::DedupIndex;
pub use error::{FailureCause, Operation, Resource, SiftError};
pub use master_writer::MasterWriter;
pub use progress::{PipelineState, ProgressSnapshot};
pub use rejection_sink::RejectionSink;

use std::path::Path;

use crate::config::SiftConfig;

/// Runs one target file against one master file to the end and returns the final snapshot.
pub async fn sift_file(
    target: &Path,
    master: &Path,
    config: SiftConfig,
) -> Result<ProgressSnapshot, SiftError> {
    let controller = Controller::new(config)?;
    controller.start(target, master)?;
    Ok(controller.wait().await)
}
