use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Malformed SQL-subset text, or a construct the grammar does not
    /// support (`OR`, parentheses — §9 open question: unsupported
    /// constructs are rejected rather than silently ignored).
    InvalidInput(String),
    /// A field filter references a path with no index table.
    FieldNotIndexed(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::InvalidInput(msg) => write!(f, "invalid query: {msg}"),
            QueryError::FieldNotIndexed(path) => write!(f, "field not indexed: {path}"),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<docstore_index::IndexError> for QueryError {
    fn from(e: docstore_index::IndexError) -> Self {
        match e {
            docstore_index::IndexError::FieldNotIndexed(p) => QueryError::FieldNotIndexed(p),
            other => QueryError::InvalidInput(other.to_string()),
        }
    }
}
