//! Doctor endpoints.
//!
//! - `POST /api/doctor/register/`
//! - `POST /api/doctor/login/`
//! - `POST /api/doctor/kids/`
//! - `GET /api/doctors/`
//! - `PUT|PATCH /api/doctor/profile/:job_id/edit/`

use axum::extract::State;
use axum::http::StatusCode;

use super::login_id;
use crate::api::error::ApiError;
use crate::api::response::{IdPath, JsonObject, Reply};
use crate::api::AppState;
use crate::error::Error;
use crate::models::{DoctorChanges, NewDoctor};

const DOCTOR_NOT_FOUND: &str = "Doctor with job_id not found.";

/// `POST /api/doctor/register/`
pub async fn register(
    State(state): State<AppState>,
    JsonObject(body): JsonObject,
) -> Result<Reply, ApiError> {
    const FAILED: &str = "Error creating doctor.";

    let doctor = NewDoctor::from_payload(&body).map_err(|errors| ApiError::invalid(FAILED, errors))?;
    let created = state
        .storage()?
        .create_doctor(&doctor)
        .map_err(|e| ApiError::from_error(e, FAILED))?;

    Reply::created("Doctor created successfully.", created)
}

/// `POST /api/doctor/login/`
pub async fn login(
    State(state): State<AppState>,
    JsonObject(body): JsonObject,
) -> Result<Reply, ApiError> {
    let job_id = login_id(&body, "job_id")?;
    let doctor = state
        .storage()?
        .doctor_by_job_id(job_id)?
        .ok_or_else(|| ApiError::NotFound(DOCTOR_NOT_FOUND.into()))?;

    tracing::info!(job_id, "Doctor logged in");
    Reply::ok("Login successful.", doctor)
}

/// `POST /api/doctor/kids/`
pub async fn kids(
    State(state): State<AppState>,
    JsonObject(body): JsonObject,
) -> Result<Reply, ApiError> {
    let job_id = login_id(&body, "job_id")?;
    let storage = state.storage()?;
    let doctor = storage
        .doctor_by_job_id(job_id)?
        .ok_or_else(|| ApiError::NotFound(DOCTOR_NOT_FOUND.into()))?;
    let kids = storage.kids_for_doctor(doctor.id)?;

    Reply::ok("Kids fetched successfully.", kids)
}

/// `GET /api/doctors/`
///
/// The list is always sent as an array, even when empty.
pub async fn list(State(state): State<AppState>) -> Result<Reply, ApiError> {
    let doctors = state.storage()?.list_doctors()?;
    Reply::verbatim(StatusCode::OK, "Doctors fetched successfully.", doctors)
}

/// `PUT|PATCH /api/doctor/profile/:job_id/edit/`
pub async fn edit(
    State(state): State<AppState>,
    IdPath(job_id): IdPath,
    JsonObject(body): JsonObject,
) -> Result<Reply, ApiError> {
    const FAILED: &str = "Error updating doctor.";

    let mut storage = state.storage()?;
    if storage.doctor_by_job_id(job_id)?.is_none() {
        return Err(ApiError::NotFound(DOCTOR_NOT_FOUND.into()));
    }

    let changes =
        DoctorChanges::from_payload(&body).map_err(|errors| ApiError::invalid(FAILED, errors))?;
    let updated = storage.update_doctor(job_id, &changes).map_err(|e| match e {
        Error::NotFound { .. } => ApiError::NotFound(DOCTOR_NOT_FOUND.into()),
        other => ApiError::from_error(other, FAILED),
    })?;

    Reply::ok("Doctor profile updated successfully.", updated)
}
