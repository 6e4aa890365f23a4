use std::fmt;

use docstore_content::ContentError;
use docstore_index::IndexError;
use docstore_query::QueryError;
use docstore_schema::SchemaError;
use docstore_storage::StorageError;

/// Every error kind this system surfaces, matching the wire-level error
/// kinds one-to-one (§7): `InvalidInput`, `SchemaValidationFailed`,
/// `NotFound`, `DocumentLocked`, `FieldNotIndexed`, `StorageFailure`,
/// `Cancelled`.
#[derive(Debug)]
pub enum DocStoreError {
    InvalidInput(String),
    SchemaValidationFailed(Vec<String>),
    NotFound(String),
    CollectionNotFound(String),
    DocumentLocked { collection_id: String, document_name: String, hostname: String, created_utc: String },
    FieldNotIndexed(String),
    StorageFailure(String),
    Cancelled,
}

impl fmt::Display for DocStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocStoreError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            DocStoreError::SchemaValidationFailed(errs) => {
                write!(f, "schema validation failed: {}", errs.join("; "))
            }
            DocStoreError::NotFound(what) => write!(f, "not found: {what}"),
            DocStoreError::CollectionNotFound(name) => write!(f, "collection not found: {name}"),
            DocStoreError::DocumentLocked { collection_id, document_name, hostname, created_utc } => {
                write!(f, "document {collection_id}/{document_name} locked by {hostname} since {created_utc}")
            }
            DocStoreError::FieldNotIndexed(path) => write!(f, "field not indexed: {path}"),
            DocStoreError::StorageFailure(msg) => write!(f, "storage failure: {msg}"),
            DocStoreError::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for DocStoreError {}

impl From<StorageError> for DocStoreError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Cancelled => DocStoreError::Cancelled,
            StorageError::InvalidIdentifier(msg) => DocStoreError::InvalidInput(msg),
            other => DocStoreError::StorageFailure(other.to_string()),
        }
    }
}

impl From<ContentError> for DocStoreError {
    fn from(e: ContentError) -> Self {
        DocStoreError::StorageFailure(e.to_string())
    }
}

impl From<SchemaError> for DocStoreError {
    fn from(e: SchemaError) -> Self {
        match e {
            SchemaError::Storage(se) => se.into(),
            SchemaError::NotFound(id) => DocStoreError::NotFound(format!("schema {id}")),
        }
    }
}

impl From<IndexError> for DocStoreError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::Storage(se) => se.into(),
            IndexError::FieldNotIndexed(path) => DocStoreError::FieldNotIndexed(path),
            IndexError::InvalidFilter(msg) => DocStoreError::InvalidInput(msg),
        }
    }
}

impl From<QueryError> for DocStoreError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::InvalidInput(msg) => DocStoreError::InvalidInput(msg),
            QueryError::FieldNotIndexed(path) => DocStoreError::FieldNotIndexed(path),
        }
    }
}

impl From<serde_json::Error> for DocStoreError {
    fn from(e: serde_json::Error) -> Self {
        DocStoreError::InvalidInput(format!("malformed JSON: {e}"))
    }
}
