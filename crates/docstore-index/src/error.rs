use std::fmt;

use docstore_storage::StorageError;

#[derive(Debug)]
pub enum IndexError {
    Storage(StorageError),
    /// A query referenced a field path with no index table (§7).
    FieldNotIndexed(String),
    /// A filter's value could not be interpreted under its condition
    /// (e.g. a non-numeric value against a range comparison).
    InvalidFilter(String),
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::Storage(e) => write!(f, "storage error: {e}"),
            IndexError::FieldNotIndexed(path) => write!(f, "field not indexed: {path}"),
            IndexError::InvalidFilter(msg) => write!(f, "invalid filter: {msg}"),
        }
    }
}

impl std::error::Error for IndexError {}

impl From<StorageError> for IndexError {
    fn from(e: StorageError) -> Self {
        IndexError::Storage(e)
    }
}
