use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::engine::progress::PipelineState;

/// Controller operations a caller can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Start,
    Pause,
    Resume,
    Stop,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Start => "start",
            Operation::Pause => "pause",
            Operation::Resume => "resume",
            Operation::Stop => "stop",
        };
        f.write_str(name)
    }
}

/// Files and directories a run depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resource {
    TargetFile,
    MasterFile,
    RejectionLogs,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::TargetFile => "target file",
            Resource::MasterFile => "master file",
            Resource::RejectionLogs => "rejection logs",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum SiftError {
    #[error("cannot {operation} while the pipeline is {state}")]
    InvalidTransition {
        operation: Operation,
        state: PipelineState,
    },

    #[error("cannot {operation}: a stop is already pending")]
    StopPending { operation: Operation },

    #[error("{resource} error at {}: {source}", .path.display())]
    Resource {
        resource: Resource,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("worker thread could not be spawned: {0}")]
    Spawn(#[source] io::Error),

    #[error("worker thread panicked: {0}")]
    WorkerPanic(String),
}

impl SiftError {
    pub fn resource(resource: Resource, path: &Path, source: io::Error) -> Self {
        SiftError::Resource {
            resource,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Cloneable description of what ended a run in `Failed`, carried by the final snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCause {
    /// `None` when the failure was not tied to a file, such as a worker panic.
    pub resource: Option<Resource>,
    pub path: Option<PathBuf>,
    pub kind: Option<String>,
    pub message: String,
}

impl From<&SiftError> for FailureCause {
    fn from(error: &SiftError) -> Self {
        match error {
            SiftError::Resource { resource, path, source } => FailureCause {
                resource: Some(*resource),
                path: Some(path.clone()),
                kind: Some(format!("{:?}", source.kind())),
                message: error.to_string(),
            },
            other => FailureCause {
                resource: None,
                path: None,
                kind: None,
                message: other.to_string(),
            },
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
