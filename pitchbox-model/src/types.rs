//! Core types for the transcription engine.

use std::path::Path;

use crate::error::ModelError;

/// Detection thresholds for note decoding, resolved once per request.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionParams {
    /// Confidence cutoff above which a detected note start is accepted, in [0, 1].
    pub onset_threshold: f32,
    /// Confidence cutoff above which a sustained-note frame is accepted, in [0, 1].
    pub frame_threshold: f32,
    /// Minimum note length in milliseconds; shorter detections are dropped.
    pub min_note_length_ms: f32,
    /// Lowest frequency to report, in Hz. `None` leaves the low end unbounded.
    pub min_frequency_hz: Option<f32>,
    /// Highest frequency to report, in Hz. `None` leaves the high end unbounded.
    pub max_frequency_hz: Option<f32>,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            onset_threshold: 0.5,
            frame_threshold: 0.3,
            min_note_length_ms: 58.0,
            min_frequency_hz: None,
            max_frequency_hz: None,
        }
    }
}

/// A single detected note.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEvent {
    /// Onset time in seconds from the start of the clip.
    pub start_seconds: f32,
    /// Sustained duration in seconds.
    pub duration_seconds: f32,
    /// MIDI pitch number (21 = A0 .. 108 = C8).
    pub pitch_midi: u8,
    /// Mean frame confidence over the note span, in (0, 1].
    pub amplitude: f32,
}

/// The artifact produced from one transcription: a complete Standard MIDI
/// File as an in-memory byte buffer. Zero detected notes still yield a
/// valid, playable (empty) file.
#[derive(Debug, Clone)]
pub struct TranscriptionResult {
    /// Serialized Standard MIDI File.
    pub midi_bytes: Vec<u8>,
}

/// Interface the HTTP handlers invoke the model through.
///
/// Implementations must be safe to share across requests: the engine is
/// loaded once at startup and only ever read afterwards. Calls are
/// synchronous and CPU-bound; callers run them on blocking threads.
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio file at `audio_path` into note events.
    ///
    /// Deterministic: identical audio bytes and parameters produce an
    /// identical event list.
    fn transcribe(
        &self,
        audio_path: &Path,
        params: &DetectionParams,
    ) -> Result<Vec<NoteEvent>, ModelError>;
}
