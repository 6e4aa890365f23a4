use axum::http::StatusCode;
use axum::response::Response;
use chrono::Utc;
use serde::Serialize;

use crate::envelope::RequestClock;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthBody {
    status: &'static str,
    version: &'static str,
    timestamp: String,
}

pub async fn health() -> Response {
    let clock = RequestClock::start();
    clock.ok(
        StatusCode::OK,
        HealthBody { status: "Healthy", version: env!("CARGO_PKG_VERSION"), timestamp: Utc::now().to_rfc3339() },
    )
}
