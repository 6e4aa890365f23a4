use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use docstore_core::CollectionStore;

use crate::dto::{ConstraintsRequest, CreateCollectionRequest, IndexingRequest, RebuildRequest, CollectionView};
use crate::envelope::RequestClock;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_collections(State(state): State<AppState>) -> Response {
    let clock = RequestClock::start();
    match CollectionStore::new(&state.backend).list() {
        Ok(collections) => {
            let views: Vec<CollectionView> = collections.into_iter().map(CollectionView::from).collect();
            clock.ok(StatusCode::OK, views)
        }
        Err(e) => ApiError::from(e).respond(&clock),
    }
}

pub async fn create_collection(State(state): State<AppState>, Json(body): Json<CreateCollectionRequest>) -> Response {
    let clock = RequestClock::start();
    let docs_dir = body
        .documents_directory
        .unwrap_or_else(|| format!("{}/{}", state.default_documents_directory, body.name));

    match CollectionStore::new(&state.backend).create(&body.name, body.description.as_deref(), &docs_dir) {
        Ok(collection) => clock.ok(StatusCode::CREATED, CollectionView::from(collection)),
        Err(e) => ApiError::from(e).respond(&clock),
    }
}

pub async fn get_collection(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let clock = RequestClock::start();
    match CollectionStore::new(&state.backend).require(&id) {
        Ok(collection) => clock.ok(StatusCode::OK, CollectionView::from(collection)),
        Err(e) => ApiError::from(e).respond(&clock),
    }
}

pub async fn head_collection(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    match CollectionStore::new(&state.backend).get(&id) {
        Ok(Some(_)) => StatusCode::OK,
        Ok(None) => StatusCode::NOT_FOUND,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn delete_collection(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let clock = RequestClock::start();
    match docstore_core::delete_collection(&state.backend, &id) {
        Ok(()) => clock.ok_empty(StatusCode::OK),
        Err(e) => ApiError::from(e).respond(&clock),
    }
}

pub async fn get_constraints(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let clock = RequestClock::start();
    let collections = CollectionStore::new(&state.backend);
    if let Err(e) = collections.require(&id) {
        return ApiError::from(e).respond(&clock);
    }
    match collections.get_constraints(&id) {
        Ok(constraints) => clock.ok(StatusCode::OK, constraints_view(&constraints)),
        Err(e) => ApiError::from(e).respond(&clock),
    }
}

pub async fn set_constraints(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ConstraintsRequest>,
) -> Response {
    let clock = RequestClock::start();
    let collections = CollectionStore::new(&state.backend);
    if let Err(e) = collections.require(&id) {
        return ApiError::from(e).respond(&clock);
    }

    let mode = match body.parse_mode() {
        Ok(m) => m,
        Err(e) => return e.respond(&clock),
    };

    let mut constraints = Vec::with_capacity(body.field_constraints.len());
    for dto in body.field_constraints {
        match dto.into_constraint() {
            Ok(c) => constraints.push(c),
            Err(e) => return e.respond(&clock),
        }
    }

    if let Err(e) = collections.set_enforcement_mode(&id, mode) {
        return ApiError::from(e).respond(&clock);
    }
    match collections.set_constraints(&id, &constraints) {
        Ok(()) => clock.ok_empty(StatusCode::OK),
        Err(e) => ApiError::from(e).respond(&clock),
    }
}

pub async fn get_indexing(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let clock = RequestClock::start();
    let collections = CollectionStore::new(&state.backend);
    let collection = match collections.require(&id) {
        Ok(c) => c,
        Err(e) => return ApiError::from(e).respond(&clock),
    };
    match collections.get_indexed_fields(&id) {
        Ok(fields) => clock.ok(
            StatusCode::OK,
            serde_json::json!({ "indexingMode": collection.indexing_mode.as_str(), "indexedFields": fields }),
        ),
        Err(e) => ApiError::from(e).respond(&clock),
    }
}

pub async fn set_indexing(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<IndexingRequest>,
) -> Response {
    let clock = RequestClock::start();
    let collections = CollectionStore::new(&state.backend);
    if let Err(e) = collections.require(&id) {
        return ApiError::from(e).respond(&clock);
    }

    let mode = match body.parse_mode() {
        Ok(m) => m,
        Err(e) => return e.respond(&clock),
    };

    if let Err(e) = collections.set_indexing_mode(&id, mode) {
        return ApiError::from(e).respond(&clock);
    }
    if let Err(e) = collections.set_indexed_fields(&id, &body.indexed_fields) {
        return ApiError::from(e).respond(&clock);
    }

    if body.rebuild_indexes {
        match docstore_core::rebuild_collection(&state.backend, &id, body.drop_unused_indexes) {
            Ok(stats) => return clock.ok(StatusCode::OK, stats_view(&stats)),
            Err(e) => return ApiError::from(e).respond(&clock),
        }
    }

    clock.ok_empty(StatusCode::OK)
}

pub async fn rebuild_indexes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RebuildRequest>,
) -> Response {
    let clock = RequestClock::start();
    match docstore_core::rebuild_collection(&state.backend, &id, body.drop_unused_indexes) {
        Ok(stats) => clock.ok(StatusCode::OK, stats_view(&stats)),
        Err(e) => ApiError::from(e).respond(&clock),
    }
}

fn constraints_view(constraints: &[docstore_validate::FieldConstraint]) -> serde_json::Value {
    let list: Vec<serde_json::Value> = constraints
        .iter()
        .map(|c| {
            serde_json::json!({
                "fieldPath": c.field_path,
                "dataType": c.data_type.as_str(),
                "required": c.required,
                "nullable": c.nullable,
                "minValue": c.min_value,
                "maxValue": c.max_value,
                "minLength": c.min_length,
                "maxLength": c.max_length,
                "regexPattern": c.regex_pattern,
                "allowedValues": c.allowed_values,
                "arrayElementType": c.array_element_type.map(|t| t.as_str()),
            })
        })
        .collect();
    serde_json::json!({ "fieldConstraints": list })
}

fn stats_view(stats: &docstore_core::RebuildStats) -> serde_json::Value {
    serde_json::json!({
        "documentsProcessed": stats.documents_processed,
        "indexesCreated": stats.indexes_created,
        "indexesDropped": stats.indexes_dropped,
        "valuesInserted": stats.values_inserted,
        "durationMs": stats.duration_ms,
        "errors": stats.errors,
        "success": stats.success,
    })
}

