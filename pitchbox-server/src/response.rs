//! Response composition for the transcription endpoints.
//!
//! The MIDI artifact goes back to the caller in one of two shapes, chosen
//! by which route was invoked: a JSON envelope with the bytes base64-encoded
//! inline, or the raw bytes as a file download. Composition only encodes;
//! it never alters the byte content.

use std::path::Path;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;

/// JSON envelope returned by `/predict`.
#[derive(Debug, Serialize)]
pub struct InlinePayload {
    /// Standard-alphabet base64 of the MIDI file, with padding.
    pub midi_base64: String,
    /// Suggested filename for the artifact.
    pub filename: String,
}

/// Response encoding, decided by route.
#[derive(Debug, Clone, Copy)]
pub enum ResponseMode {
    Inline,
    File,
}

/// The MIDI artifact wrapped for the requested mode.
pub enum ResponsePayload {
    Inline(InlinePayload),
    File { midi_bytes: Vec<u8>, filename: String },
}

impl ResponsePayload {
    pub fn compose(midi_bytes: Vec<u8>, mode: ResponseMode, filename: String) -> Self {
        match mode {
            ResponseMode::Inline => ResponsePayload::Inline(InlinePayload {
                midi_base64: BASE64.encode(&midi_bytes),
                filename,
            }),
            ResponseMode::File => ResponsePayload::File {
                midi_bytes,
                filename,
            },
        }
    }
}

impl IntoResponse for ResponsePayload {
    fn into_response(self) -> Response {
        match self {
            ResponsePayload::Inline(payload) => Json(payload).into_response(),
            ResponsePayload::File {
                midi_bytes,
                filename,
            } => {
                let disposition = format!("attachment; filename=\"{filename}\"");
                let disposition = HeaderValue::from_str(&disposition)
                    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
                (
                    StatusCode::OK,
                    [
                        (header::CONTENT_TYPE, HeaderValue::from_static("audio/midi")),
                        (header::CONTENT_DISPOSITION, disposition),
                    ],
                    midi_bytes,
                )
                    .into_response()
            }
        }
    }
}

/// Output filename: the upload's stem with the extension replaced by `.mid`.
pub fn midi_filename(original: &str) -> String {
    let stem = Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("transcription");
    format!("{stem}.mid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_extension_is_replaced() {
        assert_eq!(midi_filename("song.wav"), "song.mid");
        assert_eq!(midi_filename("take.2.flac"), "take.2.mid");
        assert_eq!(midi_filename("bare"), "bare.mid");
    }

    #[test]
    fn inline_mode_base64_encodes() {
        let payload =
            ResponsePayload::compose(b"MThd".to_vec(), ResponseMode::Inline, "x.mid".into());
        match payload {
            ResponsePayload::Inline(inline) => {
                assert_eq!(inline.midi_base64, "TVRoZA==");
                assert_eq!(inline.filename, "x.mid");
            }
            ResponsePayload::File { .. } => panic!("expected inline payload"),
        }
    }

    #[test]
    fn file_mode_keeps_bytes_verbatim() {
        let bytes = vec![0x4d, 0x54, 0x68, 0x64, 0x00];
        let payload = ResponsePayload::compose(bytes.clone(), ResponseMode::File, "x.mid".into());
        match payload {
            ResponsePayload::File { midi_bytes, .. } => assert_eq!(midi_bytes, bytes),
            ResponsePayload::Inline(_) => panic!("expected file payload"),
        }
    }
}
