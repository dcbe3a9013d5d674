//! Common error types used throughout segforge.
//!
//! Per-segment problems are never reported through this type; they are
//! recorded on the segment itself (see [`crate::SegmentState`]). This error
//! covers the failures that stop a stage outright.

/// Common error type for segforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A directory or file the stage depends on was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("segments/");
        assert_eq!(err.to_string(), "Not found: segments/");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }
}
