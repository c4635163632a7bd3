//! Response envelope and request extractors.

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::api::error::ApiError;

/// Body shape shared by every API response.
#[derive(Debug, Serialize)]
pub struct Envelope {
    /// `true` on success.
    pub status: bool,
    /// Human readable outcome.
    pub message: String,
    /// Payload, `null` when there is nothing to report.
    pub data: Value,
}

/// A successful API response.
#[derive(Debug)]
pub struct Reply {
    code: StatusCode,
    message: String,
    data: Value,
}

impl Reply {
    /// Build a reply, sending empty lists and objects as `null`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if `data` cannot be serialized.
    pub fn new(
        code: StatusCode,
        message: impl Into<String>,
        data: impl Serialize,
    ) -> Result<Self, ApiError> {
        let mut reply = Self::verbatim(code, message, data)?;
        reply.data = collapse_empty(reply.data);
        Ok(reply)
    }

    /// Build a reply that keeps `data` as serialized, even when empty.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if `data` cannot be serialized.
    pub fn verbatim(
        code: StatusCode,
        message: impl Into<String>,
        data: impl Serialize,
    ) -> Result<Self, ApiError> {
        let data = serde_json::to_value(data).map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(Self {
            code,
            message: message.into(),
            data,
        })
    }

    /// `200 OK` with `data`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if `data` cannot be serialized.
    pub fn ok(message: impl Into<String>, data: impl Serialize) -> Result<Self, ApiError> {
        Self::new(StatusCode::OK, message, data)
    }

    /// `201 Created` with `data`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if `data` cannot be serialized.
    pub fn created(message: impl Into<String>, data: impl Serialize) -> Result<Self, ApiError> {
        Self::new(StatusCode::CREATED, message, data)
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (
            self.code,
            Json(Envelope {
                status: true,
                message: self.message,
                data: self.data,
            }),
        )
            .into_response()
    }
}

fn collapse_empty(value: Value) -> Value {
    let empty = match &value {
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    };
    if empty {
        Value::Null
    } else {
        value
    }
}

/// A JSON object request body.
///
/// An empty body reads as an empty object so that handlers report missing
/// fields instead of a parse failure.
#[derive(Debug, Clone, Default)]
pub struct JsonObject(pub Map<String, Value>);

#[axum::async_trait]
impl<S> FromRequest<S> for JsonObject
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::PayloadTooLarge(rejection.body_text())
            } else {
                ApiError::BadRequest(rejection.body_text())
            }
        })?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(_) => Err(ApiError::BadRequest(
                "Expected a JSON object as the request body.".into(),
            )),
            Err(e) => Err(ApiError::BadRequest(format!("JSON parse error - {e}"))),
        }
    }
}

/// A single integer path segment.
///
/// Segments that are not integers answer 404, as no route could match them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdPath(pub i64);

#[axum::async_trait]
impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::NotFound("Not found.".into()))?;
        Ok(Self(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use serde_json::json;

    async fn body_json(response: Response) -> Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn reply_wraps_data_in_envelope() {
        let response = Reply::created("Kid created successfully.", json!({"id": 1}))
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let json = body_json(response).await;
        assert_eq!(json["status"], true);
        assert_eq!(json["message"], "Kid created successfully.");
        assert_eq!(json["data"]["id"], 1);
    }

    #[tokio::test]
    async fn empty_data_becomes_null() {
        let empty: Vec<i64> = Vec::new();
        let json = body_json(Reply::ok("none", &empty).unwrap().into_response()).await;
        assert!(json["data"].is_null());

        let json = body_json(Reply::ok("none", json!({})).unwrap().into_response()).await;
        assert!(json["data"].is_null());
    }

    #[tokio::test]
    async fn verbatim_keeps_empty_list() {
        let empty: Vec<i64> = Vec::new();
        let response = Reply::verbatim(StatusCode::OK, "all", &empty)
            .unwrap()
            .into_response();
        assert_eq!(body_json(response).await["data"], json!([]));
    }

    fn request(body: &'static str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn json_object_parses_object() {
        let JsonObject(map) = JsonObject::from_request(request(r#"{"job_id": 7}"#), &())
            .await
            .unwrap();
        assert_eq!(map["job_id"], 7);
    }

    #[tokio::test]
    async fn json_object_empty_body_is_empty_map() {
        let JsonObject(map) = JsonObject::from_request(request("  "), &()).await.unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn json_object_rejects_garbage_and_arrays() {
        let err = JsonObject::from_request(request("{nope"), &())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("JSON parse error"));

        let err = JsonObject::from_request(request("[1, 2]"), &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
