//! Structured error types for segcov
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Could not create log directory {path}: {source}")]
    LogDirCreateFailed { path: PathBuf, source: std::io::Error },

    #[error("Log directory path {0} exists but is not a directory")]
    LogDirNotDirectory(PathBuf),

    #[error("Could not open lookup file {path}: {source}")]
    LookupOpenFailed { path: PathBuf, source: std::io::Error },

    #[error("Could not open output file {path}: {source}")]
    TraceOpenFailed { path: PathBuf, source: std::io::Error },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Failed to read host events: {0}")]
    ReadFailed(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Could not read lookup file {path}: {source}")]
    LookupReadFailed { path: PathBuf, source: std::io::Error },

    #[error("Malformed lookup entry at line {line_no}: {line:?}")]
    MalformedLookupEntry { line_no: usize, line: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
