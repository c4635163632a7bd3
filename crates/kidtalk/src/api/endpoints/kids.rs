//! Kid endpoints.

use axum::extract::State;

use super::login_id;
use crate::api::error::ApiError;
use crate::api::response::{IdPath, JsonObject, Reply};
use crate::api::AppState;
use crate::error::Error;
use crate::models::{KidChanges, NewKid};

const KID_NOT_FOUND: &str = "Kid with id not found.";

/// `POST /api/kid/register/`
///
/// The kid's four weeks are created with it.
pub async fn register(
    State(state): State<AppState>,
    JsonObject(body): JsonObject,
) -> Result<Reply, ApiError> {
    const FAILED: &str = "Error creating kid.";

    let kid = NewKid::from_payload(&body).map_err(|errors| ApiError::invalid(FAILED, errors))?;
    let created = state
        .storage()?
        .create_kid(&kid)
        .map_err(|e| ApiError::from_error(e, FAILED))?;

    Reply::created("Kid created successfully.", created)
}

/// `POST /api/kid/login/`
pub async fn login(
    State(state): State<AppState>,
    JsonObject(body): JsonObject,
) -> Result<Reply, ApiError> {
    let k_id = login_id(&body, "k_id")?;
    let kid = state
        .storage()?
        .kid_by_k_id(k_id)?
        .ok_or_else(|| ApiError::NotFound(KID_NOT_FOUND.into()))?;

    tracing::info!(k_id, "Kid logged in");
    Reply::ok("Login successful.", kid)
}

/// `GET /api/kid/:kid_id/weeks/`, keyed by the kid's database id.
pub async fn weeks(
    State(state): State<AppState>,
    IdPath(kid_id): IdPath,
) -> Result<Reply, ApiError> {
    let storage = state.storage()?;
    if storage.kid(kid_id)?.is_none() {
        return Err(ApiError::NotFound("Kid not found.".into()));
    }
    let weeks = storage.weeks_for_kid(kid_id)?;

    Reply::ok("Weeks fetched successfully.", weeks)
}

/// `PUT|PATCH /api/kid/profile/:k_id/edit/`
pub async fn edit(
    State(state): State<AppState>,
    IdPath(k_id): IdPath,
    JsonObject(body): JsonObject,
) -> Result<Reply, ApiError> {
    const FAILED: &str = "Error updating kid.";

    let mut storage = state.storage()?;
    if storage.kid_by_k_id(k_id)?.is_none() {
        return Err(ApiError::NotFound(KID_NOT_FOUND.into()));
    }

    let changes =
        KidChanges::from_payload(&body).map_err(|errors| ApiError::invalid(FAILED, errors))?;
    let updated = storage.update_kid(k_id, &changes).map_err(|e| match e {
        Error::NotFound { .. } => ApiError::NotFound(KID_NOT_FOUND.into()),
        other => ApiError::from_error(other, FAILED),
    })?;

    Reply::ok("Kid profile updated successfully.", updated)
}
