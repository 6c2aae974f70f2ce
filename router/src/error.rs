//! Upstream call failures, shared by the AG-UI and A2A clients.

use thiserror::Error;

/// A failed call to a backend agent. The retry policy classifies these into
/// transient (retry) and permanent (fail fast).
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// The agent answered with an HTTP error status. `preview` holds at most
    /// the first 200 characters of the response body.
    #[error("agent returned HTTP {status}: {preview}")]
    Http { status: u16, preview: String },
    /// The request or the body read exceeded the per-request deadline.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Connect errors, resets, closed channels and other transport failures.
    #[error("request failed: {0}")]
    Transport(String),
    /// The agent spoke, but not in a shape we could parse.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl UpstreamError {
    /// The HTTP status, when this failure carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Maps a reqwest failure into the timeout/transport split.
    pub fn from_reqwest(error: reqwest::Error) -> UpstreamError {
        if error.is_timeout() {
            UpstreamError::Timeout(error.to_string())
        } else {
            UpstreamError::Transport(error.to_string())
        }
    }
}
