// Typed errors with thiserror. Only configuration errors reach the caller;
// frame-level problems are absorbed by the detector tick.

use thiserror::Error;

/// Detector error types.
#[derive(Error, Debug, PartialEq)]
pub enum DetectorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Frame buffer size mismatch: expected {expected} bytes, got {actual}")]
    FrameSize { expected: usize, actual: usize },

    #[error("Frame of {width}x{height} pixels does not fit in memory")]
    FrameTooLarge { width: u32, height: u32 },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for DetectorError {
    fn from(err: serde_json::Error) -> Self {
        DetectorError::Serialization(err.to_string())
    }
}
