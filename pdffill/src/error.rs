use std::path::PathBuf;
use thiserror::Error;

/// Result type for fill operations.
pub type Result<T> = std::result::Result<T, FillError>;

/// Longest slice of an error response body kept for diagnostics.
pub(crate) const MAX_ERROR_BODY_LEN: usize = 512;

/// Errors that can occur while filling a template and saving the result.
#[derive(Debug, Error)]
pub enum FillError {
    /// The fill request could not be built (e.g. empty template id)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Transport-level failure: connect, DNS, TLS, timeout
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Fill request rejected with status {status}: {body}")]
    Service { status: u16, body: String },

    /// Reading the payload file or writing the output document failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Payload file could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Shutdown was requested while the call was in flight
    #[error("Fill request canceled before a response was received")]
    Canceled,

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FillError {
    /// The HTTP status reported by the service, if the failure came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            FillError::Service { status, .. } => Some(*status),
            FillError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Build a service error from a raw response body, keeping a bounded, lossily decoded excerpt.
    pub(crate) fn service(status: u16, body: &[u8]) -> Self {
        let truncated = body.len() > MAX_ERROR_BODY_LEN;
        let end = body.len().min(MAX_ERROR_BODY_LEN);
        let mut excerpt = String::from_utf8_lossy(&body[..end]).trim().to_string();
        if truncated {
            excerpt.push_str("...");
        }
        FillError::Service { status, body: excerpt }
    }
}
