use std::collections::HashSet;

use chrono::Utc;
use docstore_content::ContentStore;
use docstore_index::{IndexManager, TableMapper};
use docstore_query::{Direction, OrderField, StructuredQuery};
use docstore_storage::{Backend, Value};

use crate::collections::CollectionStore;
use crate::documents::DocumentStore;
use crate::error::DocStoreError;
use crate::model::Document;

/// One matched document, optionally hydrated with its raw body.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub document: Document,
    pub content: Option<Vec<u8>>,
}

/// `{success, timestamp, max_results, continuation_token?, end_of_results,
/// total_records, records_remaining, documents}` (§4.7).
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub success: bool,
    pub timestamp: String,
    pub max_results: usize,
    pub continuation_token: Option<String>,
    pub end_of_results: bool,
    pub total_records: usize,
    pub records_remaining: usize,
    pub documents: Vec<SearchHit>,
}

/// Runs one compiled query end to end: label/tag pre-filter, per-field
/// index lookups, intersection, ordering, pagination, optional body
/// hydration (§4.7 compilation pipeline).
pub fn search(backend: &Backend, query: &StructuredQuery) -> Result<SearchResult, DocStoreError> {
    let collection = CollectionStore::new(backend).require(&query.collection_id)?;
    let document_ids_in_collection = all_document_ids(backend, &query.collection_id)?;

    let pre_filter = label_tag_pre_filter(backend, &document_ids_in_collection, query)?;

    let mapper = TableMapper::new(backend);
    let indexer = IndexManager::new(backend);

    // Seeded with the collection's own document set, not `None`: index
    // tables are process-wide (shared across collections indexing the same
    // field path), so a per-field hit set can contain ids from a different
    // collection entirely. §4.7 step 1's "empty pre-filter means all
    // documents in collection" must still bound every filter, not just a
    // label/tag one.
    let collection_scope: HashSet<String> = document_ids_in_collection.iter().cloned().collect();
    let mut candidate: HashSet<String> = pre_filter.unwrap_or(collection_scope);
    for filter in &query.filters {
        let table = mapper
            .lookup(&filter.field_path)?
            .ok_or_else(|| DocStoreError::FieldNotIndexed(filter.field_path.clone()))?;
        let hits: HashSet<String> = indexer.search(&table, filter)?.into_iter().collect();
        candidate = candidate.intersection(&hits).cloned().collect();
    }

    let matched_ids: Vec<String> = candidate.into_iter().collect();

    let documents = load_documents(backend, &matched_ids)?;
    let ordered = apply_ordering(documents, query.ordering);

    let total_records = ordered.len();
    let page: Vec<Document> = ordered.into_iter().skip(query.skip).take(query.max_results).collect();
    let records_remaining = total_records.saturating_sub(query.skip + page.len());

    let content_store = query.include_content.then(|| ContentStore::new(&collection.documents_directory));
    let mut hits = Vec::with_capacity(page.len());
    for document in page {
        let content = match &content_store {
            Some(store) => Some(store.get(&document.id)?),
            None => None,
        };
        hits.push(SearchHit { document, content });
    }

    Ok(SearchResult {
        success: true,
        timestamp: Utc::now().to_rfc3339(),
        max_results: query.max_results,
        continuation_token: None,
        end_of_results: query.skip + hits.len() >= total_records,
        total_records,
        records_remaining,
        documents: hits,
    })
}

fn all_document_ids(backend: &Backend, collection_id: &str) -> Result<Vec<String>, DocStoreError> {
    let d = backend.dialect();
    let rows = backend.exec(
        &format!("SELECT id FROM {} WHERE collection_id = ?1", d.quote_ident("documents")),
        &[Value::Text(collection_id.to_string())],
    )?;
    Ok(rows.iter().filter_map(|r| r.get_text("id").map(|s| s.to_string())).collect())
}

/// Computes the set of document ids satisfying every requested label and
/// every requested tag key/value pair (§4.7 step 1, §9's self-join note).
/// Implemented as repeated `HashSet` intersection rather than an N-way SQL
/// self-join, following the teacher's AND-merge pattern in
/// `executor::nodes::index_merge` — functionally identical, one round
/// trip per predicate instead of one join per predicate.
fn label_tag_pre_filter(
    backend: &Backend,
    scope: &[String],
    query: &StructuredQuery,
) -> Result<Option<HashSet<String>>, DocStoreError> {
    if query.labels.is_empty() && query.tags.is_empty() {
        return Ok(None);
    }

    let d = backend.dialect();
    let scope_set: HashSet<String> = scope.iter().cloned().collect();
    let mut result: Option<HashSet<String>> = None;

    for label in &query.labels {
        let rows = backend.exec(
            &format!(
                "SELECT document_id FROM {} WHERE label_value = ?1",
                d.quote_ident("labels")
            ),
            &[Value::Text(label.clone())],
        )?;
        let hits: HashSet<String> = rows
            .iter()
            .filter_map(|r| r.get_text("document_id").map(|s| s.to_string()))
            .filter(|id| scope_set.contains(id))
            .collect();
        result = Some(match result {
            Some(existing) => existing.intersection(&hits).cloned().collect(),
            None => hits,
        });
    }

    for (key, value) in &query.tags {
        let rows = backend.exec(
            &format!(
                "SELECT owner_id FROM {} WHERE owner_kind = 'document' AND key = ?1 AND value = ?2",
                d.quote_ident("tags")
            ),
            &[Value::Text(key.clone()), Value::Text(value.clone())],
        )?;
        let hits: HashSet<String> = rows
            .iter()
            .filter_map(|r| r.get_text("owner_id").map(|s| s.to_string()))
            .filter(|id| scope_set.contains(id))
            .collect();
        result = Some(match result {
            Some(existing) => existing.intersection(&hits).cloned().collect(),
            None => hits,
        });
    }

    Ok(result)
}

fn load_documents(backend: &Backend, ids: &[String]) -> Result<Vec<Document>, DocStoreError> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(document) = DocumentStore::new(backend, "").get(id)? {
            out.push(document);
        }
    }
    Ok(out)
}

fn apply_ordering(mut documents: Vec<Document>, ordering: Option<docstore_query::Ordering>) -> Vec<Document> {
    let Some(ordering) = ordering else {
        return documents;
    };

    documents.sort_by(|a, b| {
        let key = |doc: &Document| -> String {
            match ordering.field {
                OrderField::CreatedUtc => doc.created_utc.clone(),
                OrderField::LastUpdateUtc => doc.last_update_utc.clone(),
                OrderField::Name => doc.name.clone().unwrap_or_default(),
            }
        };
        let cmp = key(a).cmp(&key(b));
        match ordering.direction {
            Direction::Asc => cmp,
            Direction::Desc => cmp.reverse(),
        }
    });
    documents
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_index::{Condition, FieldFilter};
    use docstore_storage::Dialect;
    use serde_json::json;

    fn backend() -> Backend {
        let backend = Backend::open(Dialect::Sqlite, ":memory:", 4).unwrap();
        crate::bootstrap::ensure_fixed_tables(&backend).unwrap();
        backend
    }

    #[test]
    fn exact_match_search_finds_one_document() {
        let backend = backend();
        let dir = tempfile::tempdir().unwrap();
        let collection = CollectionStore::new(&backend).create("People", None, dir.path().to_str().unwrap()).unwrap();
        let docs = DocumentStore::new(&backend, "host-1");
        docs.ingest(&collection.id, &json!({ "first": "Joel", "age": 42 }).to_string(), None, &[], &[]).unwrap();

        let mut query = StructuredQuery::new(collection.id.clone());
        query.filters.push(FieldFilter { field_path: "first".into(), condition: Condition::Equals, value: Some("Joel".into()) });

        let result = search(&backend, &query).unwrap();
        assert_eq!(result.total_records, 1);
    }

    #[test]
    fn field_filter_does_not_leak_across_collections_sharing_a_table() {
        // Two collections both indexing "status" share one physical table
        // (index tables are process-wide). A field filter with no
        // labels/tags must still stay bounded to the queried collection.
        let backend = backend();
        let dir = tempfile::tempdir().unwrap();
        let a = CollectionStore::new(&backend).create("A", None, dir.path().join("a").to_str().unwrap()).unwrap();
        let b = CollectionStore::new(&backend).create("B", None, dir.path().join("b").to_str().unwrap()).unwrap();
        let docs = DocumentStore::new(&backend, "host-1");
        docs.ingest(&a.id, &json!({ "status": "active" }).to_string(), Some("a-doc"), &[], &[]).unwrap();
        docs.ingest(&b.id, &json!({ "status": "active" }).to_string(), Some("b-doc"), &[], &[]).unwrap();

        let mut query = StructuredQuery::new(a.id.clone());
        query.filters.push(FieldFilter { field_path: "status".into(), condition: Condition::Equals, value: Some("active".into()) });

        let result = search(&backend, &query).unwrap();
        assert_eq!(result.total_records, 1);
        assert_eq!(result.documents[0].document.collection_id, a.id);
    }

    #[test]
    fn unindexed_field_filter_fails() {
        let backend = backend();
        let dir = tempfile::tempdir().unwrap();
        let collection = CollectionStore::new(&backend).create("People", None, dir.path().to_str().unwrap()).unwrap();

        let mut query = StructuredQuery::new(collection.id.clone());
        query.filters.push(FieldFilter { field_path: "nope".into(), condition: Condition::Equals, value: Some("x".into()) });

        let err = search(&backend, &query).unwrap_err();
        assert!(matches!(err, DocStoreError::FieldNotIndexed(_)));
    }

    #[test]
    fn skip_past_total_yields_empty_page_end_of_results() {
        let backend = backend();
        let dir = tempfile::tempdir().unwrap();
        let collection = CollectionStore::new(&backend).create("People", None, dir.path().to_str().unwrap()).unwrap();
        let docs = DocumentStore::new(&backend, "host-1");
        docs.ingest(&collection.id, &json!({ "first": "Joel" }).to_string(), None, &[], &[]).unwrap();

        let mut query = StructuredQuery::new(collection.id.clone());
        query.skip = 10;

        let result = search(&backend, &query).unwrap();
        assert!(result.documents.is_empty());
        assert!(result.end_of_results);
    }

    #[test]
    fn label_pre_filter_restricts_results() {
        let backend = backend();
        let dir = tempfile::tempdir().unwrap();
        let collection = CollectionStore::new(&backend).create("People", None, dir.path().to_str().unwrap()).unwrap();
        let docs = DocumentStore::new(&backend, "host-1");
        docs.ingest(&collection.id, &json!({ "first": "Joel" }).to_string(), Some("joel"), &["vip".to_string()], &[]).unwrap();
        docs.ingest(&collection.id, &json!({ "first": "Amy" }).to_string(), Some("amy"), &[], &[]).unwrap();

        let mut query = StructuredQuery::new(collection.id.clone());
        query.labels.push("vip".to_string());

        let result = search(&backend, &query).unwrap();
        assert_eq!(result.total_records, 1);
    }
}
