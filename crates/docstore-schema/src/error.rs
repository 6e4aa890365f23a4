use std::fmt;

use docstore_storage::StorageError;

#[derive(Debug)]
pub enum SchemaError {
    Storage(StorageError),
    NotFound(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Storage(e) => write!(f, "storage error: {e}"),
            SchemaError::NotFound(id) => write!(f, "schema not found: {id}"),
        }
    }
}

impl std::error::Error for SchemaError {}

impl From<StorageError> for SchemaError {
    fn from(e: StorageError) -> Self {
        SchemaError::Storage(e)
    }
}
