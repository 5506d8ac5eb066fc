//! # Error Handling
//!
//! Error types for wagerlog operations.
//!
//! Errors fall into three groups:
//!
//! 1. **Record decoding** (`BufferTooSmall`, `Truncated`): fatal to one record
//!    only. The scanner treats them as end-of-stream for the current position.
//! 2. **Block codec** (`Compression`, `Decompression`): a decompression failure
//!    ends the decode loop of the current file only.
//! 3. **Writer and filesystem** (`Segment`, `Io`, ...): terminal for the writer
//!    instance that hit them and surfaced to the caller.

use thiserror::Error;

/// Result type alias for wagerlog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Primary error type for wagerlog
#[derive(Error, Debug)]
pub enum Error {
    // Record codec errors
    #[error("Buffer too small: {len} bytes, need at least {required}")]
    BufferTooSmall { len: usize, required: usize },

    #[error("Record truncated: payload declares {declared} bytes, {available} available")]
    Truncated { declared: usize, available: usize },

    // Block codec errors
    #[error("Block compression failed: {message}")]
    Compression { message: String },

    #[error("Block decompression failed: {message}")]
    Decompression { message: String },

    // Segment errors
    #[error("Segment error: {message}")]
    Segment { message: String, source: Option<Box<dyn std::error::Error + Send + Sync>> },

    #[error("Block index error: {message}")]
    BlockIndex { message: String },

    #[error("Segment writer already closed: {path}")]
    SegmentClosed { path: String },

    // Integrity errors
    #[error("Chain validation failed at position {position}: {reason}")]
    ChainValidation { position: u64, reason: String },

    #[error("Tampering detected at position {position}: expected hash {expected}, computed {computed}")]
    TamperingDetected { position: u64, expected: String, computed: String },

    // System errors
    #[error("IO error: {message}")]
    Io { message: String, source: std::io::Error },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::BufferTooSmall { .. } => true,
            Error::Truncated { .. } => true,
            Error::Decompression { .. } => true,
            Error::Compression { .. } => false,
            Error::BlockIndex { .. } => false,
            Error::Io { .. } => false,
            Error::Segment { .. } => false,
            Error::SegmentClosed { .. } => false,
            Error::ChainValidation { .. } => false,
            Error::TamperingDetected { .. } => false,
            _ => true,
        }
    }

    /// Get error code for monitoring
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::BufferTooSmall { .. } => "BUFFER_TOO_SMALL",
            Error::Truncated { .. } => "TRUNCATED",
            Error::Compression { .. } => "COMPRESSION_ERROR",
            Error::Decompression { .. } => "DECOMPRESSION_ERROR",
            Error::Segment { .. } => "SEGMENT_ERROR",
            Error::BlockIndex { .. } => "BLOCK_INDEX_ERROR",
            Error::SegmentClosed { .. } => "SEGMENT_CLOSED",
            Error::ChainValidation { .. } => "CHAIN_VALIDATION_FAILED",
            Error::TamperingDetected { .. } => "TAMPERING_DETECTED",
            Error::Io { .. } => "IO_ERROR",
            Error::Configuration { .. } => "CONFIG_ERROR",
            Error::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

/// Extension trait for adding context to results
pub trait ResultExt<T> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for std::io::Result<T> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| Error::Io {
            message: format!("{}: {}", f(), e),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_context_keeps_source() {
        let result: std::io::Result<()> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = result.with_context(|| "opening segment".to_string()).unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
        assert!(err.to_string().contains("opening segment"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_writer_side_failures_are_fatal() {
        let compression = Error::Compression { message: "ctx".to_string() };
        let index = Error::BlockIndex { message: "short".to_string() };
        assert!(!compression.is_recoverable());
        assert!(!index.is_recoverable());
    }

    #[test]
    fn test_record_errors_are_recoverable() {
        let err = Error::Truncated { declared: 10, available: 3 };
        assert!(err.is_recoverable());
        assert_eq!(err.error_code(), "TRUNCATED");
    }
}
