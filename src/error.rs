// src/error.rs

use thiserror::Error;

/// Failure taxonomy for the generation pipeline.
///
/// Normalization has no arm here on purpose: malformed model output
/// degrades to a single-entry result instead of failing.
#[derive(Debug, Error)]
pub enum Error {
    /// A requested file could not be fetched or decoded.
    #[error("could not retrieve {path}: {reason}")]
    Retrieval { path: String, reason: String },

    /// The model provider answered with a non-success status.
    #[error("provider error {status}: {message}")]
    Provider { status: u16, message: String },

    /// The request never produced a provider response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A required field was missing or malformed; rejected before any
    /// network call.
    #[error("{0}")]
    Validation(String),

    /// Artifact or configuration persistence failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Error::Provider {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => Error::Transport(e.to_string()),
        }
    }
}
