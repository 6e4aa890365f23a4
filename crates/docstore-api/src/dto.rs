use docstore_flatten::DataType;
use docstore_index::{Condition, FieldFilter};
use docstore_query::{Direction, OrderField, Ordering, StructuredQuery, MAX_RESULTS_CAP};
use docstore_validate::{EnforcementMode, FieldConstraint};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionRequest {
    pub name: String,
    pub description: Option<String>,
    pub documents_directory: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub documents_directory: String,
    pub schema_enforcement_mode: String,
    pub indexing_mode: String,
    pub created_utc: String,
    pub last_update_utc: String,
}

impl From<docstore_core::Collection> for CollectionView {
    fn from(c: docstore_core::Collection) -> Self {
        CollectionView {
            id: c.id,
            name: c.name,
            description: c.description,
            documents_directory: c.documents_directory,
            schema_enforcement_mode: c.schema_enforcement_mode.as_str().to_string(),
            indexing_mode: c.indexing_mode.as_str().to_string(),
            created_utc: c.created_utc,
            last_update_utc: c.last_update_utc,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub id: String,
    pub collection_id: String,
    pub schema_id: String,
    pub name: Option<String>,
    pub content_length: u64,
    pub sha256: String,
    pub created_utc: String,
    pub last_update_utc: String,
}

impl From<docstore_core::Document> for DocumentView {
    fn from(d: docstore_core::Document) -> Self {
        DocumentView {
            id: d.id,
            collection_id: d.collection_id,
            schema_id: d.schema_id,
            name: d.name,
            content_length: d.content_length,
            sha256: d.sha256,
            created_utc: d.created_utc,
            last_update_utc: d.last_update_utc,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub name: Option<String>,
    pub content: serde_json::Value,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub tags: std::collections::HashMap<String, Option<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConstraintDto {
    pub field_path: String,
    pub data_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_true")]
    pub nullable: bool,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub regex_pattern: Option<String>,
    pub allowed_values: Option<Vec<String>>,
    pub array_element_type: Option<String>,
}

fn default_true() -> bool {
    true
}

impl FieldConstraintDto {
    pub fn into_constraint(self) -> Result<FieldConstraint, ApiError> {
        let data_type = DataType::from_str(&self.data_type)
            .ok_or_else(|| docstore_core::DocStoreError::InvalidInput(format!("unknown dataType '{}'", self.data_type)))?;
        let mut c = FieldConstraint::new(self.field_path, data_type);
        c.required = self.required;
        c.nullable = self.nullable;
        c.min_value = self.min_value;
        c.max_value = self.max_value;
        c.min_length = self.min_length;
        c.max_length = self.max_length;
        c.regex_pattern = self.regex_pattern;
        c.allowed_values = self.allowed_values;
        c.array_element_type = match self.array_element_type {
            Some(s) => Some(
                DataType::from_str(&s)
                    .ok_or_else(|| docstore_core::DocStoreError::InvalidInput(format!("unknown arrayElementType '{s}'")))?,
            ),
            None => None,
        };
        Ok(c)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintsRequest {
    pub schema_enforcement_mode: String,
    #[serde(default)]
    pub field_constraints: Vec<FieldConstraintDto>,
}

impl ConstraintsRequest {
    pub fn parse_mode(&self) -> Result<EnforcementMode, ApiError> {
        EnforcementMode::from_str(&self.schema_enforcement_mode)
            .ok_or_else(|| docstore_core::DocStoreError::InvalidInput(format!("unknown schemaEnforcementMode '{}'", self.schema_enforcement_mode)).into())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingRequest {
    pub indexing_mode: String,
    #[serde(default)]
    pub indexed_fields: Vec<String>,
    #[serde(default)]
    pub rebuild_indexes: bool,
    #[serde(default)]
    pub drop_unused_indexes: bool,
}

impl IndexingRequest {
    pub fn parse_mode(&self) -> Result<docstore_core::IndexingMode, ApiError> {
        docstore_core::IndexingMode::from_str(&self.indexing_mode)
            .ok_or_else(|| docstore_core::DocStoreError::InvalidInput(format!("unknown indexingMode '{}'", self.indexing_mode)).into())
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RebuildRequest {
    #[serde(default)]
    pub drop_unused_indexes: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDto {
    pub field: String,
    pub condition: String,
    pub value: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub sql_expression: Option<String>,
    #[serde(default)]
    pub filters: Vec<FilterDto>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub tags: std::collections::HashMap<String, String>,
    pub max_results: Option<usize>,
    #[serde(default)]
    pub skip: usize,
    pub ordering: Option<String>,
    #[serde(default)]
    pub include_content: bool,
}

impl SearchRequest {
    /// Compiles this request into a `StructuredQuery`. `sqlExpression`
    /// wins over `filters` when both are present (§6).
    pub fn compile(&self, collection_id: &str) -> Result<StructuredQuery, ApiError> {
        if let Some(sql) = &self.sql_expression {
            let mut query = docstore_query::parse_sql(sql, collection_id).map_err(to_query_error)?;
            query.include_content = self.include_content;
            return Ok(query);
        }

        let mut query = StructuredQuery::new(collection_id);
        for f in &self.filters {
            let condition = Condition::from_str(&f.condition)
                .ok_or_else(|| docstore_core::DocStoreError::InvalidInput(format!("unknown condition '{}'", f.condition)))?;
            query.filters.push(FieldFilter { field_path: f.field.clone(), condition, value: f.value.clone() });
        }
        query.labels = self.labels.clone();
        query.tags = self.tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        query.max_results = self.max_results.unwrap_or(MAX_RESULTS_CAP).min(MAX_RESULTS_CAP);
        query.skip = self.skip;
        query.include_content = self.include_content;
        if let Some(order) = &self.ordering {
            query.ordering = Some(parse_ordering(order)?);
        }
        Ok(query)
    }
}

fn parse_ordering(s: &str) -> Result<Ordering, ApiError> {
    let (field, direction) = match s {
        "CreatedAscending" => (OrderField::CreatedUtc, Direction::Asc),
        "CreatedDescending" => (OrderField::CreatedUtc, Direction::Desc),
        "LastUpdateAscending" => (OrderField::LastUpdateUtc, Direction::Asc),
        "LastUpdateDescending" => (OrderField::LastUpdateUtc, Direction::Desc),
        "NameAscending" => (OrderField::Name, Direction::Asc),
        "NameDescending" => (OrderField::Name, Direction::Desc),
        other => return Err(docstore_core::DocStoreError::InvalidInput(format!("unknown ordering '{other}'")).into()),
    };
    Ok(Ordering { field, direction })
}

fn to_query_error(e: docstore_query::QueryError) -> ApiError {
    docstore_core::DocStoreError::from(e).into()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub success: bool,
    pub timestamp: String,
    pub max_results: usize,
    pub end_of_results: bool,
    pub total_records: usize,
    pub records_remaining: usize,
    pub documents: Vec<SearchHitView>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHitView {
    #[serde(flatten)]
    pub document: DocumentView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
}

impl From<docstore_core::SearchResult> for SearchResponse {
    fn from(r: docstore_core::SearchResult) -> Self {
        SearchResponse {
            success: r.success,
            timestamp: r.timestamp,
            max_results: r.max_results,
            end_of_results: r.end_of_results,
            total_records: r.total_records,
            records_remaining: r.records_remaining,
            documents: r
                .documents
                .into_iter()
                .map(|hit| SearchHitView {
                    document: hit.document.into(),
                    content: hit.content.and_then(|bytes| serde_json::from_slice(&bytes).ok()),
                })
                .collect(),
        }
    }
}
