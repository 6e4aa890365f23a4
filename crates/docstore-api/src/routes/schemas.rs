use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use docstore_schema::SchemaRegistry;
use docstore_storage::Value;

use crate::envelope::RequestClock;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_schemas(State(state): State<AppState>) -> Response {
    let clock = RequestClock::start();
    let d = state.backend.dialect();
    match state.backend.exec(&format!("SELECT * FROM {}", d.quote_ident("schemas")), &[]) {
        Ok(rows) => {
            let views: Vec<serde_json::Value> = rows
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "id": r.get_text("id"),
                        "hash": r.get_text("hash"),
                        "createdUtc": r.get_text("created_utc"),
                        "lastUpdateUtc": r.get_text("last_update_utc"),
                    })
                })
                .collect();
            clock.ok(StatusCode::OK, views)
        }
        Err(e) => ApiError::from(docstore_core::DocStoreError::from(e)).respond(&clock),
    }
}

pub async fn get_schema(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let clock = RequestClock::start();
    let d = state.backend.dialect();
    let rows = match state.backend.exec(
        &format!("SELECT * FROM {} WHERE id = ?1", d.quote_ident("schemas")),
        &[Value::Text(id.clone())],
    ) {
        Ok(rows) => rows,
        Err(e) => return ApiError::from(docstore_core::DocStoreError::from(e)).respond(&clock),
    };

    match rows.first() {
        Some(row) => clock.ok(
            StatusCode::OK,
            serde_json::json!({
                "id": row.get_text("id"),
                "hash": row.get_text("hash"),
                "createdUtc": row.get_text("created_utc"),
                "lastUpdateUtc": row.get_text("last_update_utc"),
            }),
        ),
        None => ApiError::from(docstore_core::DocStoreError::NotFound(format!("schema {id}"))).respond(&clock),
    }
}

pub async fn get_schema_elements(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let clock = RequestClock::start();
    match SchemaRegistry::new(&state.backend).get_elements(&id) {
        Ok(elements) => {
            let views: Vec<serde_json::Value> = elements
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "position": e.position,
                        "key": e.key,
                        "dataType": e.data_type.as_str(),
                        "nullable": e.nullable,
                    })
                })
                .collect();
            clock.ok(StatusCode::OK, views)
        }
        Err(e) => ApiError::from(docstore_core::DocStoreError::from(e)).respond(&clock),
    }
}
