use std::sync::Arc;

use docstore_storage::Backend;
use tower_http::cors::CorsLayer;

use docstore_api::config::Config;
use docstore_api::routes;
use docstore_api::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();

    let backend = Backend::open(config.dialect, &config.connection_string, config.pool_size).unwrap_or_else(|e| {
        eprintln!("failed to open storage backend at {}: {e}", config.connection_string);
        std::process::exit(1);
    });
    docstore_core::ensure_fixed_tables(&backend).unwrap_or_else(|e| {
        eprintln!("failed to bootstrap fixed tables: {e}");
        std::process::exit(1);
    });

    let backend = Arc::new(backend);
    let sweep = docstore_core::spawn_sweep(
        Arc::clone(&backend),
        config.sweep_interval_secs,
        config.lock_expiration_secs,
    );
    let state = AppState::new(Arc::clone(&backend), &config);

    let app = routes::router().with_state(state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await.unwrap_or_else(|e| {
        eprintln!("failed to bind {}: {e}", config.bind_addr);
        std::process::exit(1);
    });

    tracing::info!(addr = %config.bind_addr, dialect = ?config.dialect, "docstore-api listening");
    axum::serve(listener, app).await.unwrap();

    drop(sweep);
}
