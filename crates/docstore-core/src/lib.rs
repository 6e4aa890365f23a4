mod bootstrap;
mod collections;
mod documents;
mod error;
mod lifecycle;
mod locks;
mod model;
mod rebuild;
mod search;
mod sweep;

pub use bootstrap::ensure_fixed_tables;
pub use collections::CollectionStore;
pub use documents::DocumentStore;
pub use error::DocStoreError;
pub use lifecycle::delete_collection;
pub use locks::{LockManager, DEFAULT_LOCK_EXPIRATION_SECS};
pub use model::{Collection, Document, IndexingMode, ObjectLock, RebuildStats};
pub use rebuild::rebuild_collection;
pub use search::{search, SearchHit, SearchResult};
pub use sweep::{spawn as spawn_sweep, SweepHandle};
