use std::sync::Arc;

use docstore_storage::Backend;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<Backend>,
    pub hostname: Arc<String>,
    pub default_documents_directory: Arc<String>,
    pub lock_expiration_secs: i64,
}

impl AppState {
    pub fn new(backend: Arc<Backend>, config: &Config) -> Self {
        let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "docstore".into());
        AppState {
            backend,
            hostname: Arc::new(hostname),
            default_documents_directory: Arc::new(config.default_documents_directory.clone()),
            lock_expiration_secs: config.lock_expiration_secs,
        }
    }
}
