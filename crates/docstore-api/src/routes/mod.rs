mod collections;
mod documents;
mod health;
mod schemas;
mod search;
mod tables;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Assembles every route named in §6, versioned under `/v1.0`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/", get(health::health))
        .nest("/v1.0", v1())
}

fn v1() -> Router<AppState> {
    Router::new()
        .route(
            "/collections",
            get(collections::list_collections).put(collections::create_collection),
        )
        .route(
            "/collections/{id}",
            get(collections::get_collection)
                .head(collections::head_collection)
                .delete(collections::delete_collection),
        )
        .route(
            "/collections/{id}/constraints",
            get(collections::get_constraints).put(collections::set_constraints),
        )
        .route(
            "/collections/{id}/indexing",
            get(collections::get_indexing).put(collections::set_indexing),
        )
        .route("/collections/{id}/indexes/rebuild", post(collections::rebuild_indexes))
        .route(
            "/collections/{id}/documents",
            get(documents::list_documents).put(documents::ingest_document),
        )
        .route(
            "/collections/{id}/documents/{document_id}",
            get(documents::get_document)
                .head(documents::head_document)
                .delete(documents::delete_document),
        )
        .route("/collections/{id}/documents/search", post(search::search_documents))
        .route("/schemas", get(schemas::list_schemas))
        .route("/schemas/{id}", get(schemas::get_schema))
        .route("/schemas/{id}/elements", get(schemas::get_schema_elements))
        .route("/tables", get(tables::list_tables))
        .route("/tables/{name}/entries", get(tables::table_entries))
}
