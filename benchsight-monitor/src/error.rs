//! Error types for resource monitoring.

use std::path::PathBuf;

use thiserror::Error;

use crate::decode::ValueType;
use crate::supervisor::MonitorState;

/// Result type alias using [`MonitorError`].
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors raised by field specs, sample decoding and the monitor lifecycle.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// A field spec entry does not follow `name:type:index[:count]`.
    #[error(
        "Invalid format of field specification ({0}). Must be name:type:index, name:type:index: or name:type:index:count"
    )]
    InvalidFieldSpec(String),

    /// The same field name appears twice in one spec.
    #[error("Found duplicate timeseries field ({0})")]
    DuplicateField(String),

    /// Unknown value type tag.
    #[error("Invalid field type ({0}). Must be one of (str, int, float, bool)")]
    UnknownType(String),

    /// A token cannot be converted to the field type.
    #[error("Cannot convert '{token}' to {kind}")]
    Decode { token: String, kind: ValueType },

    /// A sample line has fewer tokens than the field spec needs.
    #[error("Sample line has {len} tokens but field '{field}' needs index {index}: '{line}'")]
    SampleTooShort {
        field: String,
        index: usize,
        len: usize,
        line: String,
    },

    /// Monitor settings are invalid.
    #[error("Invalid monitor settings: {0}")]
    Settings(String),

    /// Operation not allowed in the current lifecycle state.
    #[error("Cannot {operation} a resource monitor in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: MonitorState,
    },

    /// The monitor was started outside a Tokio runtime.
    #[error("Resource monitor must be started from within a Tokio runtime")]
    NoRuntime,

    /// The launcher could not be started.
    #[error("Failed to start resource monitor '{}': {source}", .launcher.display())]
    Spawn {
        launcher: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the launcher output or waiting for it failed.
    #[error("Failed to read resource monitor output: {0}")]
    Stream(#[source] std::io::Error),

    /// The pid marker file could not be written.
    #[error("Pid file '{}' error: {source}", .path.display())]
    PidFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The worker task panicked or was cancelled.
    #[error("Monitor worker failed: {0}")]
    Worker(String),
}
