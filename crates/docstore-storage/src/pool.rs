use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Checked before every statement and at every suspension point (§5).
/// Cancelling while a transaction is in flight causes rollback.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Default bound on simultaneously-checked-out connections (§4.1, §5).
pub const DEFAULT_POOL_SIZE: u32 = 10;
