//! Error types for density-volume-server.

use thiserror::Error;

/// Result type alias using VolumeError.
pub type VolumeResult<T> = Result<T, VolumeError>;

/// Primary error type for volume query operations.
///
/// Every failure is local to the query or file it concerns; nothing here
/// is process-fatal. The transport layer maps these onto status codes.
#[derive(Debug, Error)]
pub enum VolumeError {
    // === File errors ===
    /// The file is malformed or uses an unsupported format version.
    /// The file should be marked unusable; retrying will not help.
    #[error("invalid volume format: {0}")]
    Format(String),

    /// The requested source file does not exist.
    #[error("volume file not found: {0}")]
    NotFound(String),

    // === Read errors ===
    /// A positioned read failed. The file itself is not assumed corrupt;
    /// retrying the same query is safe.
    #[error("I/O error: {0}")]
    Io(String),

    /// A read returned fewer bytes than the block index declared.
    #[error("truncated block data: {0}")]
    TruncatedData(String),

    // === Query errors ===
    /// The query itself is invalid (bad forced level, degenerate request
    /// beyond normal clipping). Reported before any I/O is performed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    // === Output errors ===
    /// Writing the encoded response to the consumer failed.
    #[error("failed to write response: {0}")]
    Encode(String),
}

impl VolumeError {
    /// Create a Format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create an InvalidQuery error.
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    /// Create a TruncatedData error.
    pub fn truncated(msg: impl Into<String>) -> Self {
        Self::TruncatedData(msg.into())
    }

    /// Whether re-issuing the same query is expected to succeed.
    ///
    /// Transient read failures are retryable; format and query errors
    /// are not.
    pub fn is_retry_safe(&self) -> bool {
        matches!(self, Self::Io(_) | Self::TruncatedData(_) | Self::Encode(_))
    }

    /// Whether the source file should be marked unusable.
    pub fn invalidates_file(&self) -> bool {
        matches!(self, Self::Format(_) | Self::NotFound(_))
    }
}

impl From<std::io::Error> for VolumeError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            std::io::ErrorKind::UnexpectedEof => Self::TruncatedData(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for VolumeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(VolumeError::Io("disk hiccup".into()).is_retry_safe());
        assert!(VolumeError::truncated("short read").is_retry_safe());
        assert!(!VolumeError::format("bad magic").is_retry_safe());
        assert!(!VolumeError::invalid_query("level 9").is_retry_safe());
    }

    #[test]
    fn test_file_invalidation() {
        assert!(VolumeError::format("bad magic").invalidates_file());
        assert!(VolumeError::NotFound("x.mdv".into()).invalidates_file());
        assert!(!VolumeError::Io("transient".into()).invalidates_file());
    }

    #[test]
    fn test_io_error_mapping() {
        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(
            VolumeError::from(eof),
            VolumeError::TruncatedData(_)
        ));

        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(VolumeError::from(missing), VolumeError::NotFound(_)));
    }
}
