//! Error types for the stream module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while controlling the broadcast.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The broadcast process could not be launched.
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The broadcast process exited without being asked to.
    #[error("Broadcast process exited unexpectedly (code {code:?})")]
    ProcessExited { code: Option<i32> },

    /// No broadcast process is currently tracked.
    #[error("Broadcast process is not running")]
    NotRunning,

    /// A broadcast process is already tracked.
    #[error("Broadcast process is already running")]
    AlreadyRunning,

    /// The playlist file is malformed.
    #[error("Playlist {path} is invalid: {reason}")]
    Playlist { path: PathBuf, reason: String },

    /// Duration probe failed.
    #[error("Duration probe failed: {0}")]
    Probe(String),

    /// Invalid ingest URL or stream key.
    #[error("Invalid ingest URL: {0}")]
    InvalidUrl(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
