//! ASR-related type definitions
//!
//! Common types used throughout the transcription pipeline.

use thiserror::Error;

/// Result of a single whole-utterance transcription pass.
#[derive(Debug, Clone)]
pub struct AsrResult {
    pub text: String,
    pub language: String,
}

/// ASR processing errors.
#[derive(Debug, Error)]
pub enum AsrError {
    #[error("model not found at path: {path}")]
    ModelNotFound { path: String },

    #[error("model loading failed: {message}")]
    ModelLoadFailed { message: String },

    #[error("transcription failed: {message}")]
    TranscriptionFailed { message: String },

    #[error("invalid audio format: {message}")]
    InvalidAudioFormat { message: String },

    #[error("processing timeout after {seconds}s")]
    ProcessingTimeout { seconds: u64 },
}
