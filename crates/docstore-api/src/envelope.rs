use std::collections::HashMap;
use std::time::Instant;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;

/// The uniform wire envelope every non-raw response is wrapped in (§6):
/// `{success, statusCode, errorMessage?, data?, headers, processingTimeMs,
/// guid?, timestampUtc}`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub headers: HashMap<String, String>,
    pub processing_time_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    pub timestamp_utc: String,
}

/// Tracks the start of a request so the envelope can report
/// `processingTimeMs` honestly rather than a hardcoded zero.
pub struct RequestClock(Instant);

impl RequestClock {
    pub fn start() -> Self {
        RequestClock(Instant::now())
    }

    pub fn ok<T: Serialize>(&self, status: StatusCode, data: T) -> Response {
        self.envelope(status, true, None, Some(data)).into_response()
    }

    pub fn ok_empty(&self, status: StatusCode) -> Response {
        self.envelope::<()>(status, true, None, None).into_response()
    }

    pub fn error(&self, status: StatusCode, message: impl Into<String>) -> Response {
        self.envelope::<()>(status, false, Some(message.into()), None).into_response()
    }

    pub fn error_with_data<T: Serialize>(&self, status: StatusCode, message: impl Into<String>, data: T) -> Response {
        self.envelope(status, false, Some(message.into()), Some(data)).into_response()
    }

    fn envelope<T: Serialize>(
        &self,
        status: StatusCode,
        success: bool,
        error_message: Option<String>,
        data: Option<T>,
    ) -> (StatusCode, Json<Envelope<T>>) {
        (
            status,
            Json(Envelope {
                success,
                status_code: status.as_u16(),
                error_message,
                data,
                headers: HashMap::new(),
                processing_time_ms: self.0.elapsed().as_millis(),
                guid: Some(uuid::Uuid::new_v4().to_string()),
                timestamp_utc: Utc::now().to_rfc3339(),
            }),
        )
    }
}
