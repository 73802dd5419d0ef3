//! Error types for the collaborator services.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by the external collaborators.
///
/// Every variant is transient from the orchestrator's point of view: the item
/// being processed is dropped and nothing is retried.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The service answered without usable content.
    #[error("{0} returned an empty response")]
    EmptyResponse(&'static str),

    /// A generation job reported failure.
    #[error("Generation job {id} {status}: {detail}")]
    JobFailed {
        id: String,
        status: String,
        detail: String,
    },

    /// A generation job did not finish in time.
    #[error("Timed out after {0:?} waiting for job to complete")]
    Timeout(Duration),

    /// A configured URL could not be used.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
