//! Transcription endpoints: audio upload in, MIDI artifact out.
//!
//! Both routes run the same pipeline (resolve parameters, stage the
//! upload, invoke the model, serialize MIDI) and differ only in how the
//! artifact is wrapped on the way out.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::routing::post;
use axum::Router;
use tracing::{debug, info};

use pitchbox_model::{midi, DetectionParams, Transcriber, TranscriptionResult};

use crate::error::{ApiError, ApiResult};
use crate::params::resolve_params;
use crate::response::{midi_filename, ResponseMode, ResponsePayload};
use crate::staging::StagedAudio;
use crate::AppState;

/// POST /predict
///
/// Convert the uploaded audio to MIDI and return it base64-encoded in a
/// JSON envelope.
pub async fn predict_inline(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    multipart: Multipart,
) -> ApiResult<ResponsePayload> {
    run_pipeline(state, query, multipart, ResponseMode::Inline).await
}

/// POST /predict/file
///
/// Convert the uploaded audio to MIDI and return the raw file directly.
pub async fn predict_file(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    multipart: Multipart,
) -> ApiResult<ResponsePayload> {
    run_pipeline(state, query, multipart, ResponseMode::File).await
}

/// The conversion pipeline shared by both routes.
///
/// Validation and staging failures are reported immediately, before any
/// model invocation. The staged file is owned by this scope, so it is
/// removed on every exit path, including errors and disconnects.
async fn run_pipeline(
    state: AppState,
    query: HashMap<String, String>,
    multipart: Multipart,
    mode: ResponseMode,
) -> ApiResult<ResponsePayload> {
    let params = resolve_params(&query)?;
    let staged = receive_upload(multipart).await?;
    info!(
        file = staged.original_filename(),
        bytes = staged.byte_size(),
        "transcribing upload"
    );

    let result = invoke_model(Arc::clone(&state.model), &staged, &params).await?;

    let filename = midi_filename(staged.original_filename());
    Ok(ResponsePayload::compose(result.midi_bytes, mode, filename))
}

/// Pull the `file` part out of the multipart body and stage it.
async fn receive_upload(mut multipart: Multipart) -> ApiResult<StagedAudio> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            // ignore unknown fields
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_owned)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::InvalidRequest("no filename provided".into()))?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("read error: {e}")))?;

        return StagedAudio::stage(&filename, &bytes);
    }

    Err(ApiError::InvalidRequest(
        "missing `file` multipart field".into(),
    ))
}

/// Invoke the model on a blocking thread and serialize its notes to MIDI.
///
/// Zero detected notes is not an error: the caller still receives a valid,
/// playable (empty) MIDI file.
async fn invoke_model(
    model: Arc<dyn Transcriber>,
    staged: &StagedAudio,
    params: &DetectionParams,
) -> ApiResult<TranscriptionResult> {
    let path = staged.path();
    let params = params.clone();
    let notes = tokio::task::spawn_blocking(move || model.transcribe(&path, &params))
        .await
        .map_err(|e| ApiError::Internal(format!("inference task: {e}")))??;

    if notes.is_empty() {
        debug!("no notes detected, returning empty MIDI");
    }

    Ok(TranscriptionResult {
        midi_bytes: midi::render_midi(&notes),
    })
}

/// Build transcription routes
pub fn predict_routes() -> Router<AppState> {
    Router::new()
        .route("/predict", post(predict_inline))
        .route("/predict/file", post(predict_file))
}
