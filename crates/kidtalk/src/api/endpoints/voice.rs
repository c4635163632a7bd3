//! Voice recording endpoints.

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use serde::Serialize;

use super::{collect_files, no_file};
use crate::api::error::{ApiError, INVALID_DATA};
use crate::api::response::{IdPath, JsonObject, Reply};
use crate::api::AppState;
use crate::models::NewVoiceRecording;
use crate::uploads::UploadFolder;
use crate::validation::FieldErrors;

#[derive(Debug, Serialize)]
struct UploadedVoice {
    url: String,
    file: String,
    media_type: Option<String>,
}

/// `POST /api/voice/upload/`
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Reply, ApiError> {
    let mut files = collect_files(multipart).await?;
    if files.len() > 1 {
        return Err(ApiError::invalid(
            INVALID_DATA,
            FieldErrors::single("file", "Upload exactly one recording."),
        ));
    }
    let file = files.pop().ok_or_else(no_file)?;

    let stored = state
        .files()
        .save(UploadFolder::Voice, &file.name, &file.bytes)
        .await?;

    tracing::info!(file = %stored.file, size = stored.size, "Uploaded voice recording");
    Reply::ok(
        "Voice recording uploaded successfully.",
        UploadedVoice {
            url: stored.url,
            file: stored.file,
            media_type: file.content_type,
        },
    )
}

/// `POST /api/voice/save/`
///
/// When `file` is omitted it is derived from a local upload URL.
pub async fn save(
    State(state): State<AppState>,
    JsonObject(body): JsonObject,
) -> Result<Reply, ApiError> {
    let mut recording = NewVoiceRecording::from_payload(&body)
        .map_err(|errors| ApiError::invalid(INVALID_DATA, errors))?;
    if recording.file.is_none() {
        recording.file = state.files().file_for_url(&recording.url);
    }

    let saved = state.storage()?.add_voice_recording(&recording)?;
    Reply::created("Voice recording saved successfully.", saved)
}

/// `GET /api/doctor/voice-records/:week_id/`
pub async fn list_for_week(
    State(state): State<AppState>,
    IdPath(week_id): IdPath,
) -> Result<Reply, ApiError> {
    let storage = state.storage()?;
    if storage.week(week_id)?.is_none() {
        return Err(ApiError::NotFound("Week with id not found.".into()));
    }
    let recordings = storage.voice_recordings_for_week(week_id)?;

    Reply::ok("Voice records fetched successfully.", recordings)
}
