pub use docstore_validate::EnforcementMode;

/// Governs which flattened leaves become index entries on ingest (§4.8
/// step 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexingMode {
    All,
    Selective,
    None,
}

impl IndexingMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "All" => Some(IndexingMode::All),
            "Selective" => Some(IndexingMode::Selective),
            "None" => Some(IndexingMode::None),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexingMode::All => "All",
            IndexingMode::Selective => "Selective",
            IndexingMode::None => "None",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub documents_directory: String,
    pub schema_enforcement_mode: EnforcementMode,
    pub indexing_mode: IndexingMode,
    pub created_utc: String,
    pub last_update_utc: String,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub collection_id: String,
    pub schema_id: String,
    pub name: Option<String>,
    pub content_length: u64,
    pub sha256: String,
    pub created_utc: String,
    pub last_update_utc: String,
}

#[derive(Debug, Clone)]
pub struct ObjectLock {
    pub collection_id: String,
    pub document_name: String,
    pub hostname: String,
    pub created_utc: String,
}

#[derive(Debug, Clone, Default)]
pub struct RebuildStats {
    pub documents_processed: u64,
    pub indexes_created: u64,
    pub indexes_dropped: u64,
    pub values_inserted: u64,
    pub duration_ms: u64,
    pub errors: Vec<String>,
    pub success: bool,
}
