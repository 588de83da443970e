//! Request-scoped staging of uploaded audio.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::ApiError;

/// An uploaded audio file staged to local disk for one request.
///
/// Owns a private temp directory, so concurrent requests can never collide
/// on a staging path, and dropping the value removes the backing file on
/// every exit path, including errors and client disconnects. The file keeps
/// the upload's own name because the decoder uses the extension as a
/// format hint.
pub struct StagedAudio {
    dir: TempDir,
    file_name: String,
    byte_size: usize,
}

impl StagedAudio {
    /// Write `bytes` verbatim under `filename`'s basename in a fresh
    /// private directory.
    ///
    /// Rejects zero-byte uploads before anything touches the disk.
    pub fn stage(filename: &str, bytes: &[u8]) -> Result<Self, ApiError> {
        if bytes.is_empty() {
            return Err(ApiError::EmptyUpload(
                "uploaded file has no content".into(),
            ));
        }

        let file_name = sanitize_filename(filename)?;
        let dir = tempfile::Builder::new()
            .prefix("pitchbox-")
            .tempdir()?;
        std::fs::write(dir.path().join(&file_name), bytes)?;
        debug!(
            file = %file_name,
            bytes = bytes.len(),
            dir = %dir.path().display(),
            "staged upload"
        );

        Ok(Self {
            dir,
            file_name,
            byte_size: bytes.len(),
        })
    }

    /// Location of the staged file.
    pub fn path(&self) -> PathBuf {
        self.dir.path().join(&self.file_name)
    }

    /// The upload's own filename (basename only).
    pub fn original_filename(&self) -> &str {
        &self.file_name
    }

    pub fn byte_size(&self) -> usize {
        self.byte_size
    }
}

/// Reduce an uploaded filename to its final path component, so a crafted
/// name can never escape the staging directory.
fn sanitize_filename(filename: &str) -> Result<String, ApiError> {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| ApiError::InvalidRequest(format!("unusable filename {filename:?}")))
}
