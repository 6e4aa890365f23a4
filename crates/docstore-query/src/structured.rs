use docstore_index::FieldFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    CreatedUtc,
    LastUpdateUtc,
    Name,
}

impl OrderField {
    pub fn column(&self) -> &'static str {
        match self {
            OrderField::CreatedUtc => "created_utc",
            OrderField::LastUpdateUtc => "last_update_utc",
            OrderField::Name => "name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering {
    pub field: OrderField,
    pub direction: Direction,
}

/// Upper bound on `max_results` regardless of what the caller requests
/// (§4.7 step 4).
pub const MAX_RESULTS_CAP: usize = 1000;

/// A fully resolved query plan, whether it arrived as a structured request
/// or was compiled from SQL-subset text (§4.7).
#[derive(Debug, Clone)]
pub struct StructuredQuery {
    pub collection_id: String,
    pub filters: Vec<FieldFilter>,
    pub labels: Vec<String>,
    pub tags: Vec<(String, String)>,
    pub max_results: usize,
    pub skip: usize,
    pub ordering: Option<Ordering>,
    pub include_content: bool,
}

impl StructuredQuery {
    pub fn new(collection_id: impl Into<String>) -> Self {
        StructuredQuery {
            collection_id: collection_id.into(),
            filters: Vec::new(),
            labels: Vec::new(),
            tags: Vec::new(),
            max_results: MAX_RESULTS_CAP,
            skip: 0,
            ordering: None,
            include_content: false,
        }
    }

    pub fn with_max_results(mut self, requested: usize) -> Self {
        self.max_results = requested.min(MAX_RESULTS_CAP);
        self
    }
}
