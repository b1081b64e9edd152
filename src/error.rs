use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop an executor before any step runs
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Action name could not be dispatched to a capability
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("unknown action '{0}'")]
    Unknown(String),
    #[error("action '{action}' is not supported by backend '{backend}'")]
    Unsupported { action: String, backend: String },
}

/// Step parameters that cannot be turned into a capability call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    /// Required value without a safe default
    #[error("{0} not provided")]
    Missing(&'static str),
    #[error("parameter '{key}' must be {expected}")]
    InvalidType { key: String, expected: &'static str },
    #[error("parameter '{key}' is out of range: {reason}")]
    OutOfRange { key: String, reason: String },
    #[error("unexpected parameter '{0}'")]
    Unexpected(String),
}

/// Malformed time range
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentError {
    #[error("segment must look like HH:MM:SS-HH:MM:SS, got '{0}'")]
    Format(String),
    #[error("segment end {end} is not after start {start}")]
    Empty { start: String, end: String },
}
