//! Endpoint handlers, grouped by resource.

pub mod doctors;
pub mod feedback;
pub mod kids;
pub mod media;
pub mod voice;

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartRejection};
use serde_json::{Map, Value};

use crate::api::error::{ApiError, INVALID_DATA};
use crate::validation::{coerce_integer, FieldErrors, INVALID_INTEGER};

/// Multipart field names accepted as file parts.
const FILE_FIELDS: [&str; 2] = ["file", "files"];

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found.".into())
}

/// Read a login identifier such as `job_id` from a JSON body.
///
/// Numbers and numeric strings are accepted.
pub(crate) fn login_id(body: &Map<String, Value>, field: &str) -> Result<i64, ApiError> {
    match body.get(field) {
        None | Some(Value::Null) => Err(ApiError::BadRequest(format!("{field} is required."))),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(ApiError::BadRequest(format!("{field} is required.")))
        }
        Some(value) => {
            coerce_integer(value).ok_or_else(|| ApiError::BadRequest(INVALID_INTEGER.into()))
        }
    }
}

/// One file part of a multipart upload.
#[derive(Debug)]
pub(crate) struct UploadedFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Drain a multipart body, keeping the parts named `file` or `files`.
pub(crate) async fn collect_files(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Vec<UploadedFile>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if !field.name().is_some_and(|name| FILE_FIELDS.contains(&name)) {
            continue;
        }
        let name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        files.push(UploadedFile {
            name,
            content_type,
            bytes,
        });
    }
    Ok(files)
}

/// The error for an upload without any file part.
pub(crate) fn no_file() -> ApiError {
    ApiError::invalid(
        INVALID_DATA,
        FieldErrors::single("file", "No file was submitted."),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn login_id_accepts_numbers_and_numeric_strings() {
        assert_eq!(login_id(&body(json!({"job_id": 42})), "job_id").unwrap(), 42);
        assert_eq!(login_id(&body(json!({"job_id": "42"})), "job_id").unwrap(), 42);
    }

    #[test]
    fn login_id_missing() {
        for value in [json!({}), json!({"k_id": null}), json!({"k_id": ""})] {
            let err = login_id(&body(value), "k_id").unwrap_err();
            assert_eq!(err.to_string(), "k_id is required.");
        }
    }

    #[test]
    fn login_id_not_numeric() {
        let err = login_id(&body(json!({"job_id": "abc"})), "job_id").unwrap_err();
        assert_eq!(err.to_string(), INVALID_INTEGER);
    }
}
