//! Error types for the scan and cheat engine.
//!
//! This module defines all error types used throughout the engine,
//! providing detailed error information for debugging and user feedback.

use thiserror::Error;

use crate::types::SearchPass;

/// Primary error type for the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is too small to contain a candidate header.
    #[error("File too small: expected at least {expected} bytes, got {actual}")]
    FileTooSmall { expected: usize, actual: usize },

    /// Invalid magic bytes at the start of a candidate file.
    #[error("Invalid magic bytes: expected {expected}, got {actual}")]
    InvalidMagic { expected: String, actual: String },

    /// Invalid terminator bytes at the end of a candidate header.
    #[error("Invalid header terminator: expected {expected}, got {actual}")]
    InvalidTerminator { expected: String, actual: String },

    /// Search mode discriminant outside the declared enum range.
    #[error("Search mode out of range: {value}")]
    ModeOutOfRange { value: u32 },

    /// Search type discriminant outside the declared enum range.
    #[error("Search type out of range: {value}")]
    TypeOutOfRange { value: u32 },

    /// Search text length exceeds the embedded text buffer.
    #[error("Search text length out of range: {len} (buffer is {capacity} bytes)")]
    TextLenOutOfRange { len: u32, capacity: usize },

    /// File size does not match the header's declared payload.
    #[error("File size mismatch: header implies {expected} bytes, file has {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// Candidate payload is not a whole number of records.
    #[error("Candidate payload truncated: {data_size} bytes is not a multiple of {record_size}")]
    PayloadMisaligned { data_size: u64, record_size: u64 },

    /// Mode/type combination not implemented for the requested pass.
    #[error("Search mode {mode} with type {ty} not supported for the {pass} pass")]
    Unsupported {
        mode: String,
        ty: String,
        pass: SearchPass,
    },

    /// The process memory service denied a required operation.
    #[error("Process error: {message}")]
    Process { message: String },

    /// Malformed cheat text input.
    #[error("Cheat syntax error at byte {offset}: {message}")]
    CheatSyntax { offset: usize, message: String },

    /// Capacity overflow signaling programmer or input error.
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// No candidate file found where one was required.
    #[error("No candidate files found under {roots:?}")]
    NoCandidates { roots: Vec<String> },

    /// No cheat file could be fetched from any configured source.
    #[error("No cheat source yielded a file for title {title_id:016X}")]
    NoSource { title_id: u64 },
}

impl EngineError {
    /// Build a `Process` error from a diagnostic message.
    pub fn process(message: impl Into<String>) -> Self {
        EngineError::Process {
            message: message.into(),
        }
    }

    /// Build an `Internal` error from a diagnostic message.
    pub fn internal(message: impl Into<String>) -> Self {
        EngineError::Internal {
            message: message.into(),
        }
    }

    /// True for errors produced by header validation rather than I/O.
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            EngineError::FileTooSmall { .. }
                | EngineError::InvalidMagic { .. }
                | EngineError::InvalidTerminator { .. }
                | EngineError::ModeOutOfRange { .. }
                | EngineError::TypeOutOfRange { .. }
                | EngineError::TextLenOutOfRange { .. }
                | EngineError::SizeMismatch { .. }
                | EngineError::PayloadMisaligned { .. }
        )
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::FileTooSmall {
            expected: 416,
            actual: 12,
        };
        assert!(err.to_string().contains("416"));
        assert!(err.to_string().contains("12"));
    }

    #[test]
    fn test_size_mismatch_display() {
        let err = EngineError::SizeMismatch {
            expected: 448,
            actual: 432,
        };
        let msg = err.to_string();
        assert!(msg.contains("448"));
        assert!(msg.contains("432"));
    }

    #[test]
    fn test_is_format() {
        let err = EngineError::InvalidMagic {
            expected: "BREEZE00E".into(),
            actual: "BREEZE00F".into(),
        };
        assert!(err.is_format());
        assert!(!EngineError::process("denied").is_format());
    }
}
