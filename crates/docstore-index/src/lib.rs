mod error;
mod filter;
mod manager;
mod mapping;

pub use error::IndexError;
pub use filter::{Condition, FieldFilter};
pub use manager::{DropUnusedStats, IndexEntry, IndexManager};
pub use mapping::TableMapper;
