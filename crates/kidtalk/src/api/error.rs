//! API error types rendered as failure envelopes.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::response::Envelope;
use crate::error::Error;
use crate::validation::FieldErrors;

/// Message used when no endpoint-specific wording applies.
pub const INVALID_DATA: &str = "Invalid data.";

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Submitted fields failed validation; `errors` goes out as `data`.
    #[error("{message}")]
    Invalid {
        /// Endpoint message, e.g. "Error creating kid."
        message: String,
        /// Per-field messages.
        errors: FieldErrors,
    },
    /// Malformed request.
    #[error("{0}")]
    BadRequest(String),
    /// Referenced record is missing.
    #[error("{0}")]
    NotFound(String),
    /// The request clashes with stored state.
    #[error("{0}")]
    Conflict(String),
    /// Body or file over the size limit.
    #[error("{0}")]
    PayloadTooLarge(String),
    /// Unexpected failure; details stay in the log.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Validation failure with an endpoint message.
    #[must_use]
    pub fn invalid(message: impl Into<String>, errors: FieldErrors) -> Self {
        Self::Invalid {
            message: message.into(),
            errors,
        }
    }

    /// Map a domain error, using `invalid_message` for validation failures.
    #[must_use]
    pub fn from_error(err: Error, invalid_message: &str) -> Self {
        match err {
            Error::Validation(errors) => Self::invalid(invalid_message, errors),
            Error::NotFound { entity } => Self::NotFound(format!("{} not found.", capitalize(entity))),
            Error::Conflict(message) => Self::Conflict(message),
            Error::UploadTooLarge { size, limit } => Self::PayloadTooLarge(format!(
                "File of {size} bytes exceeds the {limit} byte upload limit."
            )),
            other => Self::Internal(other.to_string()),
        }
    }

    /// The HTTP status this error is sent with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Invalid { .. } | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, data) = match self {
            Self::Invalid { message, errors } => (
                message,
                serde_json::to_value(errors).unwrap_or(serde_json::Value::Null),
            ),
            Self::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                ("An internal error occurred.".to_string(), serde_json::Value::Null)
            }
            Self::BadRequest(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::PayloadTooLarge(message) => (message, serde_json::Value::Null),
        };

        (
            status,
            Json(Envelope {
                status: false,
                message,
                data,
            }),
        )
            .into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::from_error(err, INVALID_DATA)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(err.body_text())
        } else {
            Self::BadRequest(err.body_text())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn invalid_returns_400_with_field_errors() {
        let errors = FieldErrors::single("phone", "This field is required.");
        let response = ApiError::invalid("Error creating kid.", errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["status"], false);
        assert_eq!(json["message"], "Error creating kid.");
        assert_eq!(json["data"]["phone"][0], "This field is required.");
    }

    #[tokio::test]
    async fn not_found_returns_404() {
        let response = ApiError::NotFound("Kid not found.".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Kid not found.");
        assert!(json["data"].is_null());
    }

    #[tokio::test]
    async fn conflict_returns_409() {
        let response = ApiError::Conflict("taken".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn internal_returns_500() {
        let response = ApiError::Internal("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        // Internal errors hide details from client
        assert_eq!(json["message"], "An internal error occurred.");
    }

    #[test]
    fn domain_validation_uses_endpoint_message() {
        let err = Error::from(FieldErrors::single("job_id", "taken"));
        let api = ApiError::from_error(err, "Error creating doctor.");
        assert!(matches!(api, ApiError::Invalid { ref message, .. } if message == "Error creating doctor."));
    }

    #[test]
    fn domain_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(Error::not_found("voice recording")).to_string(),
            "Voice recording not found."
        );
        assert_eq!(
            ApiError::from(Error::conflict("again")).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(Error::UploadTooLarge { size: 5, limit: 4 }).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::from(Error::internal("bug")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn plain_validation_falls_back_to_invalid_data() {
        let api = ApiError::from(Error::from(FieldErrors::single("file", "empty")));
        assert_eq!(api.to_string(), INVALID_DATA);
    }
}
