//! Error types for the transcription engine.

use thiserror::Error;

/// Errors surfaced by the transcription engine.
///
/// `UnsupportedFormat` is attributable to the caller's input (the uploaded
/// bytes could not be decoded as audio); `Inference` means the input decoded
/// fine but the model failed while processing it.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The audio container or codec could not be decoded.
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// ONNX session creation or inference failure.
    #[error("inference error: {0}")]
    Inference(String),

    /// I/O error (file read/write).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
