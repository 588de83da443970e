//! Note-transcription engine for pitchbox, backed by the Basic Pitch
//! (ICASSP 2022) ONNX model.
//!
//! # Architecture
//!
//! ```text
//! audio file → symphonia decode → rubato resample to 22.05kHz mono f32
//! → overlapping model windows → icassp_2022_nmp.onnx → onset/frame posteriors
//! → note decoding (thresholds, min length, frequency bounds) → NoteEvent list
//! → Standard MIDI File bytes
//! ```
//!
//! The server depends on the [`Transcriber`] trait, not on the ONNX backend,
//! so handlers can be exercised with a stub engine in tests.

pub mod audio;
pub mod engine;
pub mod error;
pub mod midi;
pub mod notes;
pub mod types;

pub use engine::PitchModel;
pub use error::ModelError;
pub use types::{DetectionParams, NoteEvent, Transcriber, TranscriptionResult};
