//! Feedback endpoints.

use axum::extract::State;

use crate::api::error::ApiError;
use crate::api::response::{IdPath, JsonObject, Reply};
use crate::api::AppState;
use crate::error::Error;
use crate::models::NewFeedback;

const VOICE_NOT_FOUND: &str = "Voice recording not found.";

/// `POST /api/feedback/create/:voice_id/`
///
/// A recording takes feedback once; a second attempt is a 409.
pub async fn create(
    State(state): State<AppState>,
    IdPath(voice_id): IdPath,
    JsonObject(body): JsonObject,
) -> Result<Reply, ApiError> {
    const FAILED: &str = "Error adding feedback.";

    let mut storage = state.storage()?;
    if storage.voice_recording(voice_id)?.is_none() {
        return Err(ApiError::NotFound(VOICE_NOT_FOUND.into()));
    }

    let feedback =
        NewFeedback::from_payload(&body).map_err(|errors| ApiError::invalid(FAILED, errors))?;
    let created = storage
        .create_feedback(voice_id, &feedback)
        .map_err(|e| match e {
            Error::NotFound { .. } => ApiError::NotFound(VOICE_NOT_FOUND.into()),
            Error::Conflict(_) => {
                ApiError::Conflict("Feedback already exists for this voice recording.".into())
            }
            other => ApiError::from_error(other, FAILED),
        })?;

    Reply::created("Feedback added successfully.", created)
}

/// `GET /api/feedback/kid/:k_id/`
pub async fn for_kid(
    State(state): State<AppState>,
    IdPath(k_id): IdPath,
) -> Result<Reply, ApiError> {
    let feedback = state.storage()?.feedback_for_kid(k_id)?;
    if feedback.is_empty() {
        return Err(ApiError::NotFound("No feedback found for this kid.".into()));
    }

    Reply::ok("Feedback fetched successfully.", feedback)
}
