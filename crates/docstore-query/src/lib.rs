mod error;
mod sql_parser;
mod structured;

pub use docstore_index::{Condition, FieldFilter};
pub use error::QueryError;
pub use sql_parser::parse_sql;
pub use structured::{Direction, OrderField, Ordering, StructuredQuery, MAX_RESULTS_CAP};
