use docstore_index::{IndexManager, TableMapper};
use docstore_storage::{Backend, Value};

use crate::collections::CollectionStore;
use crate::error::DocStoreError;

/// Deletes a collection and every row it owns, including the index rows
/// scattered across every field's physical table and the on-disk body
/// directory (§3, §8 scenario 6). `CollectionStore::delete` alone only
/// reaches the relational tables it owns directly; index tables are
/// process-wide and keyed by field path rather than collection, so this
/// orchestration layer is the only place that knows to walk all of them.
pub fn delete_collection(backend: &Backend, collection_id: &str) -> Result<(), DocStoreError> {
    let collections = CollectionStore::new(backend);
    let collection = collections.require(collection_id)?;

    let document_ids = document_ids_in_collection(backend, collection_id)?;

    let mapper = TableMapper::new(backend);
    let indexer = IndexManager::new(backend);
    let all_tables: Vec<String> = mapper.all()?.into_iter().map(|(_, table)| table).collect();
    for document_id in &document_ids {
        indexer.delete_for_document_everywhere(&all_tables, document_id)?;
    }

    collections.delete(collection_id)?;

    match std::fs::remove_dir_all(&collection.documents_directory) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(DocStoreError::StorageFailure(e.to_string())),
    }

    Ok(())
}

fn document_ids_in_collection(backend: &Backend, collection_id: &str) -> Result<Vec<String>, DocStoreError> {
    let d = backend.dialect();
    let rows = backend.exec(
        &format!("SELECT id FROM {} WHERE collection_id = ?1", d.quote_ident("documents")),
        &[Value::Text(collection_id.to_string())],
    )?;
    Ok(rows.iter().filter_map(|r| r.get_text("id").map(|s| s.to_string())).collect())
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

    #[test]
    fn delete_collection_clears_index_rows_and_body_directory() {
        let backend = backend();
        let dir = tempfile::tempdir().unwrap();
        let docs_dir = dir.path().join("people");
        let collection = CollectionStore::new(&backend)
            .create("People", None, docs_dir.to_str().unwrap())
            .unwrap();

        let documents = crate::documents::DocumentStore::new(&backend, "host-1");
        documents
            .ingest(&collection.id, &json!({ "first": "Joel" }).to_string(), Some("joel"), &[], &[])
            .unwrap();

        delete_collection(&backend, &collection.id).unwrap();

        assert!(CollectionStore::new(&backend).get(&collection.id).unwrap().is_none());
        assert!(!docs_dir.exists());

        let mapper = TableMapper::new(&backend);
        let table = mapper.lookup("first").unwrap();
        if let Some(table) = table {
            let rows = backend
                .exec(&format!("SELECT * FROM \"{table}\""), &[])
                .unwrap();
            assert!(rows.is_empty());
        }
    }

    #[test]
    fn delete_collection_does_not_touch_other_collections_index_rows() {
        let backend = backend();
        let dir = tempfile::tempdir().unwrap();
        let documents = crate::documents::DocumentStore::new(&backend, "host-1");

        let c1 = CollectionStore::new(&backend)
            .create("C1", None, dir.path().join("c1").to_str().unwrap())
            .unwrap();
        let c2 = CollectionStore::new(&backend)
            .create("C2", None, dir.path().join("c2").to_str().unwrap())
            .unwrap();

        documents.ingest(&c1.id, &json!({ "first": "Joel" }).to_string(), Some("joel"), &[], &[]).unwrap();
        documents.ingest(&c2.id, &json!({ "first": "Amy" }).to_string(), Some("amy"), &[], &[]).unwrap();

        delete_collection(&backend, &c1.id).unwrap();

        let mapper = TableMapper::new(&backend);
        let table = mapper.lookup("first").unwrap().unwrap();
        let rows = backend.exec(&format!("SELECT * FROM \"{table}\""), &[]).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
