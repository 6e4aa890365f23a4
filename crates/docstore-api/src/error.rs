use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use docstore_core::DocStoreError;

use crate::envelope::RequestClock;

/// Maps every `DocStoreError` kind to the status code §7 assigns it, and
/// serves as the one seam route handlers convert their domain error into a
/// response through (via `ApiError::respond`).
pub struct ApiError {
    error: DocStoreError,
}

impl From<DocStoreError> for ApiError {
    fn from(error: DocStoreError) -> Self {
        ApiError { error }
    }
}

impl ApiError {
    pub fn respond(self, clock: &RequestClock) -> Response {
        match self.error {
            DocStoreError::InvalidInput(msg) => {
                clock.error_with_data(StatusCode::BAD_REQUEST, msg.clone(), serde_json::json!({ "Errors": [msg] }))
            }
            DocStoreError::SchemaValidationFailed(errors) => clock.error_with_data(
                StatusCode::BAD_REQUEST,
                "schema validation failed",
                serde_json::json!({ "Errors": errors }),
            ),
            DocStoreError::NotFound(what) => clock.error(StatusCode::NOT_FOUND, format!("not found: {what}")),
            DocStoreError::CollectionNotFound(id) => clock.error(StatusCode::NOT_FOUND, format!("collection not found: {id}")),
            DocStoreError::DocumentLocked { collection_id, document_name, hostname, created_utc } => clock.error_with_data(
                StatusCode::CONFLICT,
                "document locked",
                serde_json::json!({
                    "CollectionId": collection_id,
                    "DocumentName": document_name,
                    "LockedByHostname": hostname,
                    "LockCreatedUtc": created_utc,
                }),
            ),
            DocStoreError::FieldNotIndexed(path) => {
                clock.error(StatusCode::BAD_REQUEST, format!("field not indexed: {path}"))
            }
            DocStoreError::StorageFailure(msg) => {
                tracing::error!(error = %msg, "storage failure");
                clock.error(StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            DocStoreError::Cancelled => clock.error(StatusCode::INTERNAL_SERVER_ERROR, "operation cancelled"),
        }
    }
}

/// Allows `?` inside a handler body that doesn't have a `RequestClock` in
/// scope yet to still produce *a* response; handlers that want an honest
/// `processingTimeMs` on error paths call `ApiError::respond` directly
/// instead of relying on this blanket impl.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.respond(&RequestClock::start())
    }
}
