//! Picture and video endpoints.
//!
//! Uploading and saving are separate steps: an upload stores the bytes and
//! returns a URL, a save attaches that URL to a week. The per-week quota of
//! four pictures and one video is enforced on save.

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use serde::Serialize;

use super::{collect_files, no_file};
use crate::api::error::{ApiError, INVALID_DATA};
use crate::api::response::{IdPath, JsonObject, Reply};
use crate::api::AppState;
use crate::models::{Media, MediaKind, NewMedia};
use crate::uploads::UploadFolder;
use crate::validation::FieldErrors;

const WEEK_NOT_FOUND: &str = "Week with id not found.";

#[derive(Debug, Serialize)]
struct UploadedUrls {
    urls: Vec<String>,
}

#[derive(Debug, Serialize)]
struct UploadedUrl {
    url: String,
}

fn require_week(state: &AppState, week_id: i64) -> Result<(), ApiError> {
    match state.storage()?.week(week_id)? {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound(WEEK_NOT_FOUND.into())),
    }
}

/// `POST /api/media/pictures/upload/:week_id/`
pub async fn upload_pictures(
    State(state): State<AppState>,
    IdPath(week_id): IdPath,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Reply, ApiError> {
    require_week(&state, week_id)?;

    let files = collect_files(multipart).await?;
    let limit = MediaKind::Picture.per_week();
    if files.is_empty() {
        return Err(no_file());
    }
    if i64::try_from(files.len()).unwrap_or(i64::MAX) > limit {
        return Err(ApiError::invalid(
            INVALID_DATA,
            FieldErrors::single(
                "file",
                format!("Ensure no more than {limit} pictures are uploaded at once."),
            ),
        ));
    }

    let mut urls = Vec::with_capacity(files.len());
    for file in &files {
        let stored = state
            .files()
            .save(UploadFolder::Media, &file.name, &file.bytes)
            .await?;
        urls.push(stored.url);
    }

    tracing::info!(week_id, count = urls.len(), "Uploaded pictures");
    Reply::ok("Pictures uploaded successfully.", UploadedUrls { urls })
}

/// `POST /api/media/video/upload/:week_id/`
pub async fn upload_video(
    State(state): State<AppState>,
    IdPath(week_id): IdPath,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Reply, ApiError> {
    require_week(&state, week_id)?;

    let mut files = collect_files(multipart).await?;
    if files.len() > 1 {
        return Err(ApiError::invalid(
            INVALID_DATA,
            FieldErrors::single("file", "Upload exactly one video."),
        ));
    }
    let file = files.pop().ok_or_else(no_file)?;

    let stored = state
        .files()
        .save(UploadFolder::Media, &file.name, &file.bytes)
        .await?;

    tracing::info!(week_id, size = stored.size, "Uploaded video");
    Reply::ok("Video uploaded successfully.", UploadedUrl { url: stored.url })
}

fn save(state: &AppState, kind: MediaKind, body: &JsonObject) -> Result<Media, ApiError> {
    let mut media = NewMedia::from_payload(kind, &body.0)
        .map_err(|errors| ApiError::invalid(INVALID_DATA, errors))?;
    media.file = state.files().file_for_url(&media.url);
    Ok(state.storage()?.add_media(&media)?)
}

/// `POST /api/media/pictures/save/`
pub async fn save_pictures(
    State(state): State<AppState>,
    body: JsonObject,
) -> Result<Reply, ApiError> {
    let media = save(&state, MediaKind::Picture, &body)?;
    Reply::created("Pictures saved successfully.", media)
}

/// `POST /api/media/video/save/`
pub async fn save_video(
    State(state): State<AppState>,
    body: JsonObject,
) -> Result<Reply, ApiError> {
    let media = save(&state, MediaKind::Video, &body)?;
    Reply::created("Video saved successfully.", media)
}

/// `GET /api/media/list/:week_id/`
pub async fn list(
    State(state): State<AppState>,
    IdPath(week_id): IdPath,
) -> Result<Reply, ApiError> {
    let storage = state.storage()?;
    if storage.week(week_id)?.is_none() {
        return Err(ApiError::NotFound(WEEK_NOT_FOUND.into()));
    }
    let media = storage.media_for_week(week_id)?;

    Reply::ok("Media files fetched successfully.", media)
}
