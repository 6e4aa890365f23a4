use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use docstore_index::TableMapper;
use serde::Deserialize;

use crate::envelope::RequestClock;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_tables(State(state): State<AppState>) -> Response {
    let clock = RequestClock::start();
    match TableMapper::new(&state.backend).all() {
        Ok(mappings) => {
            let views: Vec<serde_json::Value> = mappings
                .into_iter()
                .map(|(field_path, table_name)| serde_json::json!({ "fieldPath": field_path, "tableName": table_name }))
                .collect();
            clock.ok(StatusCode::OK, views)
        }
        Err(e) => ApiError::from(docstore_core::DocStoreError::from(e)).respond(&clock),
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EntriesQuery {
    #[serde(default)]
    pub skip: usize,
    pub limit: Option<usize>,
}

/// Generic scan over a dynamically-named index table, clamped to `[1, 1000]`
/// entries per page (§6).
pub async fn table_entries(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<EntriesQuery>,
) -> Response {
    let clock = RequestClock::start();

    if !state.backend.table_exists(&name).unwrap_or(false) {
        return ApiError::from(docstore_core::DocStoreError::NotFound(format!("table {name}"))).respond(&clock);
    }

    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    let d = state.backend.dialect();
    let sql = format!(
        "SELECT * FROM {} ORDER BY id ASC {}",
        d.quote_ident(&name),
        d.limit_offset(limit, query.skip)
    );

    match state.backend.exec(&sql, &[]) {
        Ok(rows) => {
            let views: Vec<serde_json::Value> = rows
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "id": r.get_int("id"),
                        "documentId": r.get_text("document_id"),
                        "position": r.get_int("position"),
                        "value": r.get_text("value"),
                    })
                })
                .collect();
            clock.ok(StatusCode::OK, views)
        }
        Err(e) => ApiError::from(docstore_core::DocStoreError::from(e)).respond(&clock),
    }
}
