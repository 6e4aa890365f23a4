use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use docstore_core::DocumentStore;

use crate::dto::{DocumentView, IngestRequest};
use crate::envelope::RequestClock;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(serde::Deserialize, Default)]
pub struct IncludeContentQuery {
    #[serde(default)]
    pub include_content: bool,
}

pub async fn list_documents(State(state): State<AppState>, Path(collection_id): Path<String>) -> Response {
    let clock = RequestClock::start();
    let store = DocumentStore::new(&state.backend, state.hostname.as_str());
    match store.list(&collection_id) {
        Ok(docs) => {
            let views: Vec<DocumentView> = docs.into_iter().map(DocumentView::from).collect();
            clock.ok(StatusCode::OK, views)
        }
        Err(e) => ApiError::from(e).respond(&clock),
    }
}

pub async fn ingest_document(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
    Json(body): Json<IngestRequest>,
) -> Response {
    let clock = RequestClock::start();
    let store = DocumentStore::new(&state.backend, state.hostname.as_str())
        .with_lock_expiration(state.lock_expiration_secs);
    let json_text = body.content.to_string();
    let tags: Vec<(String, Option<String>)> = body.tags.into_iter().collect();

    match store.ingest(&collection_id, &json_text, body.name.as_deref(), &body.labels, &tags) {
        Ok(doc) => clock.ok(StatusCode::CREATED, DocumentView::from(doc)),
        Err(e) => ApiError::from(e).respond(&clock),
    }
}

pub async fn get_document(
    State(state): State<AppState>,
    Path((collection_id, document_id)): Path<(String, String)>,
    Query(query): Query<IncludeContentQuery>,
) -> Response {
    let clock = RequestClock::start();
    let store = DocumentStore::new(&state.backend, state.hostname.as_str());

    let document = match store.get(&document_id) {
        Ok(Some(d)) if d.collection_id == collection_id => d,
        Ok(_) => return ApiError::from(docstore_core::DocStoreError::NotFound(document_id)).respond(&clock),
        Err(e) => return ApiError::from(e).respond(&clock),
    };

    if query.include_content {
        let collections = docstore_core::CollectionStore::new(&state.backend);
        let collection = match collections.require(&collection_id) {
            Ok(c) => c,
            Err(e) => return ApiError::from(e).respond(&clock),
        };
        let content = docstore_content::ContentStore::new(&collection.documents_directory);
        return match content.get(&document.id) {
            Ok(bytes) => ([(header::CONTENT_TYPE, "application/json")], bytes).into_response(),
            Err(e) => ApiError::from(docstore_core::DocStoreError::from(e)).respond(&clock),
        };
    }

    clock.ok(StatusCode::OK, DocumentView::from(document))
}

pub async fn head_document(
    State(state): State<AppState>,
    Path((collection_id, document_id)): Path<(String, String)>,
) -> StatusCode {
    let store = DocumentStore::new(&state.backend, state.hostname.as_str());
    match store.get(&document_id) {
        Ok(Some(d)) if d.collection_id == collection_id => StatusCode::OK,
        Ok(_) => StatusCode::NOT_FOUND,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path((collection_id, document_id)): Path<(String, String)>,
) -> Response {
    let clock = RequestClock::start();
    let store = DocumentStore::new(&state.backend, state.hostname.as_str());

    match store.get(&document_id) {
        Ok(Some(d)) if d.collection_id == collection_id => {}
        Ok(_) => return ApiError::from(docstore_core::DocStoreError::NotFound(document_id)).respond(&clock),
        Err(e) => return ApiError::from(e).respond(&clock),
    }

    match store.delete(&document_id) {
        Ok(()) => clock.ok_empty(StatusCode::OK),
        Err(e) => ApiError::from(e).respond(&clock),
    }
}
