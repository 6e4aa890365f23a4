use docstore_storage::{Dialect, DEFAULT_POOL_SIZE};

/// Environment-driven configuration, the way `slate-api::main` reads
/// `SLATE_TCP_ADDR`/`SLATE_API_ADDR`/`SLATE_POOL_SIZE` with
/// `std::env::var(...).ok().and_then(...).unwrap_or(default)`.
pub struct Config {
    pub bind_addr: String,
    pub dialect: Dialect,
    pub connection_string: String,
    pub pool_size: u32,
    pub default_documents_directory: String,
    pub lock_expiration_secs: i64,
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            bind_addr: std::env::var("DOCSTORE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into()),
            dialect: std::env::var("DOCSTORE_DIALECT")
                .ok()
                .and_then(|s| parse_dialect(&s))
                .unwrap_or(Dialect::Sqlite),
            connection_string: std::env::var("DOCSTORE_CONNECTION_STRING")
                .unwrap_or_else(|_| "./docstore.sqlite3".into()),
            pool_size: std::env::var("DOCSTORE_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_POOL_SIZE),
            default_documents_directory: std::env::var("DOCSTORE_DOCUMENTS_DIR")
                .unwrap_or_else(|_| "./documents".into()),
            lock_expiration_secs: std::env::var("DOCSTORE_LOCK_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(docstore_core::DEFAULT_LOCK_EXPIRATION_SECS),
            sweep_interval_secs: std::env::var("DOCSTORE_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

fn parse_dialect(s: &str) -> Option<Dialect> {
    match s.to_ascii_lowercase().as_str() {
        "sqlite" => Some(Dialect::Sqlite),
        "postgres" | "postgresql" => Some(Dialect::Postgres),
        "mysql" => Some(Dialect::MySql),
        "mssql" | "sqlserver" => Some(Dialect::SqlServer),
        _ => None,
    }
}
