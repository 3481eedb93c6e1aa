//! Error types for visit analysis.

use thiserror::Error;

/// Failures surfaced by the analysis service.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The requested window is not a positive whole number of days.
    #[error("invalid window: {0}")]
    InvalidWindow(String),

    /// No visits exist for the requested IP in the window.
    #[error("no visits recorded for ip {0}")]
    IpNotFound(String),

    /// The visit store failed to answer.
    #[error("visit store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl AnalysisError {
    /// True when the caller supplied bad input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AnalysisError::InvalidWindow(_) | AnalysisError::IpNotFound(_))
    }
}
