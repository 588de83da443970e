//! ONNX session management and the windowed inference pipeline.
//!
//! The Basic Pitch model consumes fixed-length windows of 22.05kHz mono
//! audio and emits onset/frame posteriorgrams per window. Adjacent windows
//! overlap; half the overlap is trimmed from each side before the windows
//! are stitched back into one posteriorgram covering the whole clip.

use std::path::Path;
use std::sync::Mutex;

use ndarray::{s, Array2};
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info};

use crate::audio;
use crate::error::ModelError;
use crate::notes;
use crate::types::{DetectionParams, NoteEvent, Transcriber};

/// FFT hop of the model's feature frontend, in samples.
pub(crate) const FFT_HOP: usize = 256;
/// Samples per model window (2s at 22.05kHz, minus one hop).
pub(crate) const AUDIO_N_SAMPLES: usize = 2 * audio::TARGET_SAMPLE_RATE as usize - FFT_HOP;
/// Posterior frames per second (integer division, as the model defines it).
pub(crate) const ANNOT_FPS: usize = audio::TARGET_SAMPLE_RATE as usize / FFT_HOP;
/// Posterior frames per model window.
pub(crate) const ANNOT_N_FRAMES: usize = ANNOT_FPS * 2;
/// Overlap between adjacent windows, in posterior frames.
const N_OVERLAPPING_FRAMES: usize = 30;
const OVERLAP_LEN: usize = N_OVERLAPPING_FRAMES * FFT_HOP;
const HOP_SIZE: usize = AUDIO_N_SAMPLES - OVERLAP_LEN;
/// Pitch bins covered by the model output (A0..C8).
pub(crate) const N_PITCH_BINS: usize = 88;
/// MIDI number of the lowest pitch bin.
pub(crate) const MIDI_OFFSET: usize = 21;

// Graph output names from the TensorFlow export.
const FRAMES_OUTPUT: &str = "StatefulPartitionedCall:1";
const ONSETS_OUTPUT: &str = "StatefulPartitionedCall:2";

/// Intra-op thread count for the ONNX session.
const INTRA_THREADS: usize = 4;

/// The Basic Pitch transcription model.
///
/// The session sits behind a `Mutex` since `Session::run` requires
/// `&mut self`; inference is therefore serialized across requests while
/// decoding and staging stay concurrent. Load once at startup and share
/// behind an `Arc`.
pub struct PitchModel {
    session: Mutex<Session>,
}

impl PitchModel {
    /// Load the ONNX model from `model_path`.
    ///
    /// CPU-intensive; call once at process startup.
    pub fn load(model_path: &Path) -> Result<Self, ModelError> {
        info!("loading pitch model from {}", model_path.display());
        let session = Session::builder()
            .map_err(|e| ModelError::Inference(format!("session builder: {e}")))?
            .with_intra_threads(INTRA_THREADS)
            .map_err(|e| ModelError::Inference(format!("set threads: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| ModelError::Inference(format!("load model: {e}")))?;
        info!("pitch model ready");
        Ok(Self {
            session: Mutex::new(session),
        })
    }

    /// Run the model over all windows and stitch the posteriorgrams.
    ///
    /// Returns `(frames, onsets)`, each `(n_frames, 88)`.
    fn run_model(&self, samples: &[f32]) -> Result<(Array2<f32>, Array2<f32>), ModelError> {
        let windows = window_samples(samples);
        debug!("running inference over {} windows", windows.len());

        let mut frame_parts: Vec<Array2<f32>> = Vec::with_capacity(windows.len());
        let mut onset_parts: Vec<Array2<f32>> = Vec::with_capacity(windows.len());

        let mut session = self
            .session
            .lock()
            .map_err(|_| ModelError::Inference("session mutex poisoned".into()))?;

        for window in windows {
            let input = Tensor::from_array(([1i64, AUDIO_N_SAMPLES as i64, 1], window))
                .map_err(|e| ModelError::Inference(format!("input tensor: {e}")))?;
            let outputs = session
                .run(ort::inputs![input])
                .map_err(|e| ModelError::Inference(format!("session run: {e}")))?;

            let (shape, data) = outputs[FRAMES_OUTPUT]
                .try_extract_tensor::<f32>()
                .map_err(|e| ModelError::Inference(format!("extract frames: {e}")))?;
            let frames = Array2::from_shape_vec(
                (shape[1] as usize, shape[2] as usize),
                data.to_vec(),
            )
            .map_err(|e| ModelError::Inference(format!("reshape frames: {e}")))?;

            let (shape, data) = outputs[ONSETS_OUTPUT]
                .try_extract_tensor::<f32>()
                .map_err(|e| ModelError::Inference(format!("extract onsets: {e}")))?;
            let onsets = Array2::from_shape_vec(
                (shape[1] as usize, shape[2] as usize),
                data.to_vec(),
            )
            .map_err(|e| ModelError::Inference(format!("reshape onsets: {e}")))?;

            frame_parts.push(frames);
            onset_parts.push(onsets);
        }
        drop(session);

        // Posterior frames covered by the original (unpadded) clip.
        let n_frames_original = samples.len() * ANNOT_FPS / audio::TARGET_SAMPLE_RATE as usize;

        Ok((
            stitch_windows(&frame_parts, n_frames_original),
            stitch_windows(&onset_parts, n_frames_original),
        ))
    }
}

impl Transcriber for PitchModel {
    fn transcribe(
        &self,
        audio_path: &Path,
        params: &DetectionParams,
    ) -> Result<Vec<NoteEvent>, ModelError> {
        let samples = audio::decode_audio(audio_path)?;
        debug!(
            "decoded {} samples ({:.1}s)",
            samples.len(),
            samples.len() as f32 / audio::TARGET_SAMPLE_RATE as f32
        );

        let (frames, onsets) = self.run_model(&samples)?;
        let events = notes::decode_notes(&frames, &onsets, params);
        debug!("detected {} notes", events.len());
        Ok(events)
    }
}

/// Split samples into overlapping model windows.
///
/// The clip is front-padded by half the overlap so the first window's
/// trimmed frames still cover time zero; the last window is zero-padded
/// to the full window length.
fn window_samples(samples: &[f32]) -> Vec<Vec<f32>> {
    let mut padded = vec![0.0f32; OVERLAP_LEN / 2];
    padded.extend_from_slice(samples);

    let mut windows = Vec::new();
    let mut start = 0;
    while start < padded.len() {
        let end = (start + AUDIO_N_SAMPLES).min(padded.len());
        let mut window = padded[start..end].to_vec();
        window.resize(AUDIO_N_SAMPLES, 0.0);
        windows.push(window);
        start += HOP_SIZE;
    }
    windows
}

/// Trim half the overlap from each side of every window and concatenate,
/// truncating to the clip's own frame count.
fn stitch_windows(parts: &[Array2<f32>], n_frames_original: usize) -> Array2<f32> {
    let n_trim = N_OVERLAPPING_FRAMES / 2;
    let n_bins = parts.first().map_or(N_PITCH_BINS, |p| p.ncols());

    let mut kept = 0;
    for part in parts {
        kept += part.nrows().saturating_sub(2 * n_trim);
    }

    let mut stitched = Array2::zeros((kept, n_bins));
    let mut row = 0;
    for part in parts {
        let end = part.nrows().saturating_sub(n_trim);
        let start = n_trim.min(end);
        for r in start..end {
            stitched.row_mut(row).assign(&part.row(r));
            row += 1;
        }
    }

    let n_rows = n_frames_original.min(stitched.nrows());
    stitched.slice(s![..n_rows, ..]).to_owned()
}
