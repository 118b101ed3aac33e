//! Error types for gnss-link.

use thiserror::Error;

/// Main error type for all gnss-link operations.
#[derive(Debug, Error)]
pub enum GnssError {
    /// I/O error on the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No byte arrived within the configured read timeout.
    #[error("Read timed out")]
    Timeout,

    /// The transport has terminated (EOF or broken pipe).
    #[error("Transport closed")]
    Closed,

    /// No recognized frame start within the resync scan bound.
    #[error("Frame synchronization lost")]
    FrameSync,

    /// Sentence delimiter (`*` or CRLF) not found within bounds.
    #[error("Sentence delimiter not found")]
    DelimiterNotFound,

    /// Frame-level checksum did not match the trailing checksum bytes.
    #[error("Checksum mismatch: expected {expected:#06x}, computed {computed:#06x}")]
    ChecksumMismatch { expected: u16, computed: u16 },

    /// A sentence field was structurally invalid (wrong count, bad chars).
    #[error("Malformed field: {0}")]
    MalformedField(String),

    /// The frame was valid but its payload does not match the shape
    /// registered for its id.
    #[error("Payload decode error: {0}")]
    PayloadDecode(String),
}

impl GnssError {
    /// Whether this error should terminate a read loop.
    ///
    /// Transport-level errors are terminal: retrying a `read_byte` on a
    /// closed or silent link cannot make progress. Framing and registry
    /// errors are not: the next `step()` resynchronizes past the bad frame.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GnssError::Io(_) | GnssError::Timeout | GnssError::Closed
        )
    }
}

/// Result type alias using GnssError.
pub type Result<T> = std::result::Result<T, GnssError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_classification() {
        assert!(GnssError::Timeout.is_terminal());
        assert!(GnssError::Closed.is_terminal());
        assert!(GnssError::Io(std::io::Error::other("boom")).is_terminal());

        assert!(!GnssError::FrameSync.is_terminal());
        assert!(!GnssError::DelimiterNotFound.is_terminal());
        assert!(
            !GnssError::ChecksumMismatch {
                expected: 0x1234,
                computed: 0x4321
            }
            .is_terminal()
        );
        assert!(!GnssError::MalformedField("x".into()).is_terminal());
        assert!(!GnssError::PayloadDecode("x".into()).is_terminal());
    }
}
