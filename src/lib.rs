// Streaming validation and dedup engine
pub mod engine;

pub mod config;

// Constants shared by the engine and the CLI
pub mod constants;

pub mod utils;

// Re-export main types for convenience
pub use config::SiftConfig;
pub use engine::{
    sift_file, Controller, FieldSplit, PipelineState, ProgressSnapshot, RejectReason, SiftError,
};
