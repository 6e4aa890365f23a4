use std::collections::HashMap;

use chrono::Utc;
use docstore_content::ContentStore;
use docstore_flatten::flatten_document;
use docstore_index::{IndexEntry, IndexManager, TableMapper};
use docstore_schema::SchemaRegistry;
use docstore_storage::{Backend, Value};
use docstore_validate::validate;

use crate::collections::CollectionStore;
use crate::error::DocStoreError;
use crate::locks::LockManager;
use crate::model::{Document, IndexingMode};

fn row_to_document(row: &docstore_storage::Row) -> Option<Document> {
    Some(Document {
        id: row.get_text("id")?.to_string(),
        collection_id: row.get_text("collection_id")?.to_string(),
        schema_id: row.get_text("schema_id")?.to_string(),
        name: row.get_text("name").map(|s| s.to_string()),
        content_length: row.get_int("content_length").unwrap_or(0) as u64,
        sha256: row.get_text("sha256")?.to_string(),
        created_utc: row.get_text("created_utc")?.to_string(),
        last_update_utc: row.get_text("last_update_utc")?.to_string(),
    })
}

/// Orchestrates the ingest/delete lifecycle across every sibling crate
/// (§4.8): validation, the per-name lock, schema interning, the fan-out
/// to index tables, and body persistence.
pub struct DocumentStore<'a> {
    backend: &'a Backend,
    hostname: String,
    lock_expiration_secs: i64,
}

impl<'a> DocumentStore<'a> {
    pub fn new(backend: &'a Backend, hostname: impl Into<String>) -> Self {
        DocumentStore {
            backend,
            hostname: hostname.into(),
            lock_expiration_secs: crate::locks::DEFAULT_LOCK_EXPIRATION_SECS,
        }
    }

    /// Overrides the default 60s object-lock expiration (§5's "configurable
    /// interval, default 60 s").
    pub fn with_lock_expiration(mut self, expiration_secs: i64) -> Self {
        self.lock_expiration_secs = expiration_secs;
        self
    }

    pub fn get(&self, document_id: &str) -> Result<Option<Document>, DocStoreError> {
        let d = self.backend.dialect();
        let rows = self.backend.exec(
            &format!("SELECT * FROM {} WHERE id = ?1", d.quote_ident("documents")),
            &[Value::Text(document_id.to_string())],
        )?;
        Ok(rows.first().and_then(row_to_document))
    }

    fn find_by_name(&self, collection_id: &str, name: &str) -> Result<Option<Document>, DocStoreError> {
        let d = self.backend.dialect();
        let rows = self.backend.exec(
            &format!(
                "SELECT * FROM {} WHERE collection_id = ?1 AND name = ?2",
                d.quote_ident("documents")
            ),
            &[Value::Text(collection_id.to_string()), Value::Text(name.to_string())],
        )?;
        Ok(rows.first().and_then(row_to_document))
    }

    pub fn list(&self, collection_id: &str) -> Result<Vec<Document>, DocStoreError> {
        let d = self.backend.dialect();
        let rows = self.backend.exec(
            &format!("SELECT * FROM {} WHERE collection_id = ?1", d.quote_ident("documents")),
            &[Value::Text(collection_id.to_string())],
        )?;
        Ok(rows.iter().filter_map(row_to_document).collect())
    }

    /// Ingests (or, when `name` names an existing document, updates) one
    /// document (§4.8 steps 1-10).
    ///
    /// The body is written to the content store before the metadata row
    /// transaction rather than after, so `content_length`/`sha256` are
    /// known when the row is written; a crash between the two leaves an
    /// orphaned body file, which the startup integrity sweep reclaims —
    /// the same inconsistency window §4.8/§9 tolerates, just on the other
    /// side of the boundary.
    pub fn ingest(
        &self,
        collection_id: &str,
        json_text: &str,
        name: Option<&str>,
        labels: &[String],
        tags: &[(String, Option<String>)],
    ) -> Result<Document, DocStoreError> {
        let collections = CollectionStore::new(self.backend);
        let collection = collections.require(collection_id)?;

        let parsed: serde_json::Value = serde_json::from_str(json_text)?;

        let constraints = collections.get_constraints(collection_id)?;
        let outcome = validate(&parsed, &constraints, collection.schema_enforcement_mode);
        if !outcome.accepted {
            return Err(DocStoreError::SchemaValidationFailed(
                outcome.errors.iter().map(|e| format!("{}: {}", e.field_path, e.message)).collect(),
            ));
        }

        let locks = LockManager::new(self.backend);
        if let Some(name) = name {
            locks.acquire(collection_id, name, &self.hostname, self.lock_expiration_secs)?;
        }

        let result = self.ingest_locked(&collection.documents_directory, &collection.indexing_mode, collection_id, &parsed, json_text.as_bytes(), name, labels, tags);

        if let Some(name) = name {
            locks.release(collection_id, name).ok();
        }

        result
    }

    fn ingest_locked(
        &self,
        documents_directory: &str,
        indexing_mode: &IndexingMode,
        collection_id: &str,
        parsed: &serde_json::Value,
        bytes: &[u8],
        name: Option<&str>,
        labels: &[String],
        tags: &[(String, Option<String>)],
    ) -> Result<Document, DocStoreError> {
        let existing = match name {
            Some(name) => self.find_by_name(collection_id, name)?,
            None => None,
        };

        let document_id = existing.as_ref().map(|d| d.id.clone()).unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let is_update = existing.is_some();

        let content = ContentStore::new(documents_directory);
        let body_meta = content.put(&document_id, bytes)?;

        let flattened = flatten_document(parsed);
        let schema_id = SchemaRegistry::new(self.backend).intern(&flattened.fingerprint, &flattened.elements)?;

        let eligible: Vec<_> = match indexing_mode {
            IndexingMode::All => flattened.entries.iter().collect(),
            IndexingMode::Selective => {
                let allowed = CollectionStore::new(self.backend).get_indexed_fields(collection_id)?;
                flattened.entries.iter().filter(|e| allowed.contains(&e.path)).collect()
            }
            IndexingMode::None => Vec::new(),
        };

        let mapper = TableMapper::new(self.backend);
        let mut values_by_table: HashMap<String, Vec<IndexEntry>> = HashMap::new();
        for entry in &eligible {
            let table = mapper.ensure_table(&entry.path)?;
            values_by_table.entry(table).or_default().push(IndexEntry {
                document_id: document_id.clone(),
                position: entry.position,
                value: entry.value.clone(),
            });
        }

        let indexer = IndexManager::new(self.backend);
        if is_update {
            let all_tables: Vec<String> = mapper.all()?.into_iter().map(|(_, table)| table).collect();
            indexer.delete_for_document_everywhere(&all_tables, &document_id)?;
            self.clear_labels_and_tags(&document_id)?;
        }

        let d = self.backend.dialect();
        let now = Utc::now().to_rfc3339();

        let mut statements: Vec<(String, Vec<Value>)> = Vec::new();
        if is_update {
            statements.push((
                format!(
                    "UPDATE {} SET schema_id = ?1, content_length = ?2, sha256 = ?3, last_update_utc = ?4 WHERE id = ?5",
                    d.quote_ident("documents")
                ),
                vec![
                    Value::Text(schema_id.clone()),
                    Value::Int(body_meta.content_length as i64),
                    Value::Text(body_meta.sha256.clone()),
                    Value::Text(now.clone()),
                    Value::Text(document_id.clone()),
                ],
            ));
        } else {
            statements.push((
                format!(
                    "INSERT INTO {} (id, collection_id, schema_id, name, content_length, sha256, created_utc, last_update_utc) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    d.quote_ident("documents")
                ),
                vec![
                    Value::Text(document_id.clone()),
                    Value::Text(collection_id.to_string()),
                    Value::Text(schema_id.clone()),
                    name.map(|n| Value::Text(n.to_string())).unwrap_or(Value::Null),
                    Value::Int(body_meta.content_length as i64),
                    Value::Text(body_meta.sha256.clone()),
                    Value::Text(now.clone()),
                    Value::Text(now.clone()),
                ],
            ));
        }

        for label in labels {
            statements.push((
                format!("INSERT INTO {} (document_id, label_value) VALUES (?1, ?2)", d.quote_ident("labels")),
                vec![Value::Text(document_id.clone()), Value::Text(label.clone())],
            ));
        }
        for (key, value) in tags {
            statements.push((
                format!(
                    "INSERT INTO {} (owner_kind, owner_id, key, value) VALUES ('document', ?1, ?2, ?3)",
                    d.quote_ident("tags")
                ),
                vec![
                    Value::Text(document_id.clone()),
                    Value::Text(key.clone()),
                    value.clone().map(Value::Text).unwrap_or(Value::Null),
                ],
            ));
        }

        statements.extend(indexer.insert_statements(&values_by_table));

        self.backend.exec_in_transaction(&statements)?;

        self.get(&document_id)?.ok_or_else(|| DocStoreError::NotFound(document_id.clone()))
    }

    fn clear_labels_and_tags(&self, document_id: &str) -> Result<(), DocStoreError> {
        let d = self.backend.dialect();
        self.backend.exec_nonquery(
            &format!("DELETE FROM {} WHERE document_id = ?1", d.quote_ident("labels")),
            &[Value::Text(document_id.to_string())],
        )?;
        self.backend.exec_nonquery(
            &format!("DELETE FROM {} WHERE owner_kind = 'document' AND owner_id = ?1", d.quote_ident("tags")),
            &[Value::Text(document_id.to_string())],
        )?;
        Ok(())
    }

    /// Removes a document entirely: index rows across every mapped table,
    /// labels, tags, the row itself, its body, and any lingering lock
    /// (§4.8 "Delete").
    pub fn delete(&self, document_id: &str) -> Result<(), DocStoreError> {
        let document = self.get(document_id)?.ok_or_else(|| DocStoreError::NotFound(document_id.to_string()))?;
        let collections = CollectionStore::new(self.backend);
        let collection = collections.require(&document.collection_id)?;

        let mapper = TableMapper::new(self.backend);
        let all_tables: Vec<String> = mapper.all()?.into_iter().map(|(_, table)| table).collect();
        IndexManager::new(self.backend).delete_for_document_everywhere(&all_tables, document_id)?;
        self.clear_labels_and_tags(document_id)?;

        let d = self.backend.dialect();
        self.backend.exec_nonquery(
            &format!("DELETE FROM {} WHERE id = ?1", d.quote_ident("documents")),
            &[Value::Text(document_id.to_string())],
        )?;

        ContentStore::new(&collection.documents_directory).delete(document_id)?;

        if let Some(name) = &document.name {
            LockManager::new(self.backend).release(&collection.id, name)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_storage::Dialect;
    use serde_json::json;

    fn backend() -> Backend {
        let backend = Backend::open(Dialect::Sqlite, ":memory:", 4).unwrap();
        crate::bootstrap::ensure_fixed_tables(&backend).unwrap();
        backend
    }

    fn setup_collection(backend: &Backend, docs_dir: &std::path::Path) -> crate::model::Collection {
        CollectionStore::new(backend).create("People", None, docs_dir.to_str().unwrap()).unwrap()
    }

    #[test]
    fn ingest_then_get_round_trips_metadata() {
        let backend = backend();
        let dir = tempfile::tempdir().unwrap();
        let collection = setup_collection(&backend, dir.path());
        let store = DocumentStore::new(&backend, "host-1");

        let body = json!({ "first": "Joel", "age": 42 }).to_string();
        let doc = store.ingest(&collection.id, &body, Some("joel"), &[], &[]).unwrap();

        assert_eq!(doc.content_length as usize, body.len());
        let fetched = store.get(&doc.id).unwrap().unwrap();
        assert_eq!(fetched.sha256, doc.sha256);
    }

    #[test]
    fn reingesting_same_name_updates_in_place() {
        let backend = backend();
        let dir = tempfile::tempdir().unwrap();
        let collection = setup_collection(&backend, dir.path());
        let store = DocumentStore::new(&backend, "host-1");

        let first = store.ingest(&collection.id, &json!({ "first": "Joel" }).to_string(), Some("joel"), &[], &[]).unwrap();
        let second = store.ingest(&collection.id, &json!({ "first": "Joel2" }).to_string(), Some("joel"), &[], &[]).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.list(&collection.id).unwrap().len(), 1);
    }

    #[test]
    fn delete_removes_row_and_body() {
        let backend = backend();
        let dir = tempfile::tempdir().unwrap();
        let collection = setup_collection(&backend, dir.path());
        let store = DocumentStore::new(&backend, "host-1");

        let doc = store.ingest(&collection.id, &json!({ "first": "Joel" }).to_string(), Some("joel"), &[], &[]).unwrap();
        store.delete(&doc.id).unwrap();

        assert!(store.get(&doc.id).unwrap().is_none());
        assert!(!ContentStore::new(dir.path()).exists(&doc.id));
    }

    #[test]
    fn invalid_json_is_rejected() {
        let backend = backend();
        let dir = tempfile::tempdir().unwrap();
        let collection = setup_collection(&backend, dir.path());
        let store = DocumentStore::new(&backend, "host-1");

        let err = store.ingest(&collection.id, "{ not json", None, &[], &[]).unwrap_err();
        assert!(matches!(err, DocStoreError::InvalidInput(_)));
    }
}
