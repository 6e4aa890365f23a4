use std::fmt;

#[derive(Debug)]
pub enum StorageError {
    Connection(String),
    Query(String),
    Serialization(String),
    PoolExhausted,
    Cancelled,
    InvalidIdentifier(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Connection(msg) => write!(f, "connection error: {msg}"),
            StorageError::Query(msg) => write!(f, "query error: {msg}"),
            StorageError::Serialization(msg) => write!(f, "serialization error: {msg}"),
            StorageError::PoolExhausted => write!(f, "connection pool exhausted"),
            StorageError::Cancelled => write!(f, "operation cancelled"),
            StorageError::InvalidIdentifier(msg) => write!(f, "invalid identifier: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Query(e.to_string())
    }
}

impl From<r2d2::Error> for StorageError {
    fn from(e: r2d2::Error) -> Self {
        StorageError::Connection(e.to_string())
    }
}

impl From<postgres::Error> for StorageError {
    fn from(e: postgres::Error) -> Self {
        StorageError::Query(e.to_string())
    }
}

impl From<mysql::Error> for StorageError {
    fn from(e: mysql::Error) -> Self {
        StorageError::Query(e.to_string())
    }
}

impl From<odbc_api::Error> for StorageError {
    fn from(e: odbc_api::Error) -> Self {
        StorageError::Query(e.to_string())
    }
}
