//! Error taxonomy for the detection kernel.
//!
//! Only `ReadFailure` is transient: the orchestrator recovers it with a
//! close/reopen cycle and the loop continues. Every other kind propagates to
//! the process boundary and terminates the daemon with a diagnostic.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    /// The capture device could not be acquired (invalid id, busy,
    /// disconnected). Fatal unless an operator intervenes.
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A single frame read failed. The orchestrator closes and reopens the
    /// session, bounded by its recovery policy.
    #[error("frame read failed: {0}")]
    ReadFailure(String),

    /// A malformed frame entered the analysis pipeline. Continuing would
    /// risk nonsensical decisions, so this is fatal.
    #[error("analysis pipeline error: {0}")]
    Pipeline(String),

    /// Invalid startup parameters. Raised before the loop starts.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl DetectorError {
    /// Whether the orchestrator may recover from this error without
    /// surfacing it past the loop boundary.
    pub fn is_transient(&self) -> bool {
        matches!(self, DetectorError::ReadFailure(_))
    }
}

pub type Result<T> = std::result::Result<T, DetectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_read_failures_are_transient() {
        assert!(DetectorError::ReadFailure("x".into()).is_transient());
        assert!(!DetectorError::DeviceUnavailable("x".into()).is_transient());
        assert!(!DetectorError::Pipeline("x".into()).is_transient());
        assert!(!DetectorError::Configuration("x".into()).is_transient());
    }
}
