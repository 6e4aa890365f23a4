use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;

use crate::dto::{SearchRequest, SearchResponse};
use crate::envelope::RequestClock;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn search_documents(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
    Json(body): Json<SearchRequest>,
) -> Response {
    let clock = RequestClock::start();

    let query = match body.compile(&collection_id) {
        Ok(q) => q,
        Err(e) => return e.respond(&clock),
    };

    match docstore_core::search(&state.backend, &query) {
        Ok(result) => clock.ok(StatusCode::OK, SearchResponse::from(result)),
        Err(e) => ApiError::from(e).respond(&clock),
    }
}
