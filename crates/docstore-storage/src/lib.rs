mod backend;
mod dialect;
mod error;
mod mssql_backend;
mod mysql_backend;
mod postgres_backend;
mod pool;
mod sanitize;
mod sqlite;
mod value;

pub mod postgres {
    pub use crate::postgres_backend::PostgresBackend;
}
pub mod mysql {
    pub use crate::mysql_backend::MySqlBackend;
}
pub mod mssql {
    pub use crate::mssql_backend::MsSqlBackend;
}

pub use backend::Backend;
pub use dialect::Dialect;
pub use error::StorageError;
pub use pool::{CancellationToken, DEFAULT_POOL_SIZE};
pub use sanitize::{sanitize_identifier, MAX_IDENTIFIER_LEN};
pub use sqlite::SqliteBackend;
pub use value::{Row, Value};

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_backend() -> Backend {
        Backend::open(Dialect::Sqlite, ":memory:", 4).unwrap()
    }

    #[test]
    fn create_and_drop_index_table_roundtrip() {
        let backend = sqlite_backend();
        assert!(!backend.table_exists("idx_name").unwrap());
        backend.create_index_table("idx_name").unwrap();
        assert!(backend.table_exists("idx_name").unwrap());
        backend.drop_table("idx_name").unwrap();
        assert!(!backend.table_exists("idx_name").unwrap());
    }

    #[test]
    fn insert_and_query_round_trip() {
        let backend = sqlite_backend();
        backend.create_index_table("idx_age").unwrap();
        backend
            .exec_nonquery(
                "INSERT INTO \"idx_age\" (document_id, position, value, created_utc) VALUES (?1, NULL, ?2, ?3)",
                &[
                    Value::Text("doc-1".into()),
                    Value::Text("42".into()),
                    Value::Text("2026-01-01T00:00:00Z".into()),
                ],
            )
            .unwrap();
        let rows = backend
            .exec(
                "SELECT document_id, value FROM \"idx_age\" WHERE value = ?1",
                &[Value::Text("42".into())],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_text("document_id"), Some("doc-1"));
    }

    #[test]
    fn transaction_rolls_back_on_failure() {
        let backend = sqlite_backend();
        backend.create_index_table("idx_rollback").unwrap();
        let statements = vec![
            (
                "INSERT INTO \"idx_rollback\" (document_id, value, created_utc) VALUES (?1, ?2, ?3)"
                    .to_string(),
                vec![
                    Value::Text("doc-1".into()),
                    Value::Text("x".into()),
                    Value::Text("2026-01-01T00:00:00Z".into()),
                ],
            ),
            ("INSERT INTO nonexistent_table VALUES (1)".to_string(), vec![]),
        ];
        assert!(backend.exec_in_transaction(&statements).is_err());
        let rows = backend.exec("SELECT * FROM \"idx_rollback\"", &[]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn cancellation_short_circuits_exec() {
        let backend = sqlite_backend();
        let token = CancellationToken::new();
        token.cancel();
        let err = backend
            .exec_cancellable("SELECT 1", &[], &token)
            .unwrap_err();
        matches!(err, StorageError::Cancelled);
    }
}
