//! Decode onset/frame posteriorgrams into note events.
//!
//! Ported behavior of Basic Pitch's polyphonic note creation: pick onset
//! peaks above the onset threshold, extend each note while its frame energy
//! stays above the frame threshold, drop notes shorter than the minimum
//! length, and claim used energy so overlapping candidates do not
//! double-report.

use ndarray::{s, Array2};

use crate::audio::TARGET_SAMPLE_RATE;
use crate::engine::{ANNOT_N_FRAMES, AUDIO_N_SAMPLES, FFT_HOP, MIDI_OFFSET};
use crate::types::{DetectionParams, NoteEvent};

/// Consecutive below-threshold frames tolerated before a note is closed.
const ENERGY_TOLERANCE: usize = 11;
/// Neighborhood radius (in frames) for onset peak picking.
const PEAK_RADIUS: usize = 2;

/// Posterior frames per second, as a float for time conversion.
const FRAMES_PER_SECOND: f32 = TARGET_SAMPLE_RATE as f32 / FFT_HOP as f32;

#[derive(Debug, Clone, Copy)]
struct FrameNote {
    start: usize,
    end: usize,
    bin: usize,
    amplitude: f32,
}

/// Decode posteriorgrams into note events, sorted by start time then pitch.
///
/// `frames` and `onsets` are `(n_frames, 88)` matrices of confidences in
/// [0, 1]. The result is deterministic for identical inputs and parameters.
pub fn decode_notes(
    frames: &Array2<f32>,
    onsets: &Array2<f32>,
    params: &DetectionParams,
) -> Vec<NoteEvent> {
    let n_frames = frames.nrows();
    if n_frames < 2 {
        return Vec::new();
    }

    let mut frames = frames.clone();
    let mut onsets = onsets.clone();
    constrain_frequency(&mut onsets, &mut frames, params);

    let min_note_len =
        ((params.min_note_length_ms / 1000.0) * FRAMES_PER_SECOND).round() as usize;

    // Onset peaks above threshold, earliest first.
    let candidates = onset_peaks(&onsets, params.onset_threshold);

    let mut remaining = frames.clone();
    let n_bins = frames.ncols();
    let mut found: Vec<FrameNote> = Vec::new();

    // Walk candidates latest-first, as Basic Pitch does, so a late
    // re-articulation claims its own energy before an earlier onset at the
    // same pitch swallows it.
    for &(start, bin) in candidates.iter().rev() {
        if start >= n_frames - 1 {
            continue;
        }

        // Advance until frame energy has been below threshold for
        // ENERGY_TOLERANCE consecutive frames, then back up over them.
        let mut i = start + 1;
        let mut k = 0;
        while i < n_frames - 1 && k < ENERGY_TOLERANCE {
            if remaining[[i, bin]] < params.frame_threshold {
                k += 1;
            } else {
                k = 0;
            }
            i += 1;
        }
        i -= k;

        if i - start <= min_note_len {
            continue;
        }

        // Claim this note's energy, including the adjacent semitone bins.
        for j in start..i {
            remaining[[j, bin]] = 0.0;
            if bin + 1 < n_bins {
                remaining[[j, bin + 1]] = 0.0;
            }
            if bin > 0 {
                remaining[[j, bin - 1]] = 0.0;
            }
        }

        let span = frames.slice(s![start..i, bin]);
        let amplitude = span.sum() / span.len() as f32;

        found.push(FrameNote {
            start,
            end: i,
            bin,
            amplitude,
        });
    }

    found.sort_by_key(|n| (n.start, n.bin));
    found
        .into_iter()
        .map(|n| NoteEvent {
            start_seconds: model_frame_to_time(n.start),
            duration_seconds: model_frame_to_time(n.end) - model_frame_to_time(n.start),
            pitch_midi: (n.bin + MIDI_OFFSET) as u8,
            amplitude: n.amplitude,
        })
        .collect()
}

/// Zero posterior columns outside the requested frequency bounds.
fn constrain_frequency(
    onsets: &mut Array2<f32>,
    frames: &mut Array2<f32>,
    params: &DetectionParams,
) {
    let n_bins = frames.ncols();

    if let Some(max_hz) = params.max_frequency_hz {
        let cutoff = (hz_to_midi(max_hz) as usize)
            .saturating_sub(MIDI_OFFSET)
            .min(n_bins);
        onsets.slice_mut(s![.., cutoff..]).fill(0.0);
        frames.slice_mut(s![.., cutoff..]).fill(0.0);
    }

    if let Some(min_hz) = params.min_frequency_hz {
        let cutoff = (hz_to_midi(min_hz) as usize)
            .saturating_sub(MIDI_OFFSET)
            .min(n_bins);
        onsets.slice_mut(s![.., ..cutoff]).fill(0.0);
        frames.slice_mut(s![.., ..cutoff]).fill(0.0);
    }
}

/// Local maxima of each pitch column that clear `threshold`, earliest first.
fn onset_peaks(onsets: &Array2<f32>, threshold: f32) -> Vec<(usize, usize)> {
    let n_frames = onsets.nrows();
    let mut peaks = Vec::new();

    for t in 0..n_frames {
        for p in 0..onsets.ncols() {
            let v = onsets[[t, p]];
            if v < threshold {
                continue;
            }
            let lo = t.saturating_sub(PEAK_RADIUS);
            let hi = (t + PEAK_RADIUS + 1).min(n_frames);
            if (lo..hi).all(|i| i == t || v > onsets[[i, p]]) {
                peaks.push((t, p));
            }
        }
    }
    peaks
}

/// Convert a frequency in Hz to the corresponding (fractional) MIDI pitch.
fn hz_to_midi(hz: f32) -> f32 {
    12.0 * (hz.log2() - 440.0f32.log2()) + 69.0
}

/// Convert a posterior frame index to seconds, compensating for the
/// per-window stitching offset.
fn model_frame_to_time(frame: usize) -> f32 {
    let window_offset = FFT_HOP as f32 / TARGET_SAMPLE_RATE as f32
        * (ANNOT_N_FRAMES as f32 - AUDIO_N_SAMPLES as f32 / FFT_HOP as f32)
        + 0.0018;
    frame as f32 * FFT_HOP as f32 / TARGET_SAMPLE_RATE as f32
        - window_offset * (frame as f32 / ANNOT_N_FRAMES as f32).floor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::N_PITCH_BINS;

    const A4_BIN: usize = 69 - MIDI_OFFSET;

    /// One sustained A4: onset spike at `start`, frame energy through `end`.
    fn synthetic_note(n_frames: usize, start: usize, end: usize) -> (Array2<f32>, Array2<f32>) {
        let mut frames = Array2::zeros((n_frames, N_PITCH_BINS));
        let mut onsets = Array2::zeros((n_frames, N_PITCH_BINS));
        onsets[[start, A4_BIN]] = 0.9;
        for t in start..end {
            frames[[t, A4_BIN]] = 0.8;
        }
        (frames, onsets)
    }

    fn short_params() -> DetectionParams {
        DetectionParams {
            // ~1 frame minimum so short synthetic notes survive
            min_note_length_ms: 12.0,
            ..DetectionParams::default()
        }
    }

    #[test]
    fn detects_a_sustained_note() {
        let (frames, onsets) = synthetic_note(50, 5, 25);
        let notes = decode_notes(&frames, &onsets, &short_params());

        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].pitch_midi, 69);
        assert!((notes[0].amplitude - 0.8).abs() < 1e-4);
        assert!(notes[0].duration_seconds > 0.0);
    }

    #[test]
    fn silent_posteriors_yield_no_notes() {
        let frames = Array2::zeros((50, N_PITCH_BINS));
        let onsets = Array2::zeros((50, N_PITCH_BINS));
        assert!(decode_notes(&frames, &onsets, &short_params()).is_empty());
    }

    #[test]
    fn onset_below_threshold_is_ignored() {
        let (frames, mut onsets) = synthetic_note(50, 5, 25);
        onsets[[5, A4_BIN]] = 0.2; // below the 0.5 default
        assert!(decode_notes(&frames, &onsets, &short_params()).is_empty());
    }

    #[test]
    fn short_note_is_dropped() {
        let (frames, onsets) = synthetic_note(50, 5, 7);
        let params = DetectionParams {
            min_note_length_ms: 58.0, // ~5 frames
            ..DetectionParams::default()
        };
        assert!(decode_notes(&frames, &onsets, &params).is_empty());
    }

    #[test]
    fn frequency_bounds_exclude_out_of_range_pitches() {
        let (frames, onsets) = synthetic_note(50, 5, 25);

        // A4 is 440Hz; a band above it excludes the note entirely.
        let params = DetectionParams {
            min_frequency_hz: Some(1000.0),
            ..short_params()
        };
        assert!(decode_notes(&frames, &onsets, &params).is_empty());

        // A band around 440Hz keeps it.
        let params = DetectionParams {
            min_frequency_hz: Some(200.0),
            max_frequency_hz: Some(1000.0),
            ..short_params()
        };
        assert_eq!(decode_notes(&frames, &onsets, &params).len(), 1);
    }

    #[test]
    fn decoding_is_deterministic() {
        let (frames, onsets) = synthetic_note(80, 10, 40);
        let a = decode_notes(&frames, &onsets, &short_params());
        let b = decode_notes(&frames, &onsets, &short_params());
        assert_eq!(a, b);
    }

    #[test]
    fn frame_zero_maps_to_time_zero() {
        assert_eq!(model_frame_to_time(0), 0.0);
        assert!(model_frame_to_time(10) > 0.0);
    }

    #[test]
    fn hz_to_midi_reference_points() {
        assert!((hz_to_midi(440.0) - 69.0).abs() < 1e-4);
        assert!((hz_to_midi(220.0) - 57.0).abs() < 1e-4);
    }
}
