use std::collections::{HashMap, HashSet};
use std::time::Instant;

use docstore_content::ContentStore;
use docstore_flatten::flatten_document;
use docstore_index::{IndexEntry, IndexManager, TableMapper};
use docstore_storage::Backend;

use crate::collections::CollectionStore;
use crate::documents::DocumentStore;
use crate::error::DocStoreError;
use crate::model::{IndexingMode, RebuildStats};

/// Recomputes a collection's index tables from its stored document bodies
/// (§4.9). Streams every document, re-flattens its body, and re-inserts
/// its values under the *current* indexing configuration; optionally
/// drops mappings the collection no longer needs once no other
/// collection's documents reference them either.
///
/// A per-document error (malformed body, missing file) is collected and
/// the rebuild continues; a storage-layer failure aborts it immediately
/// with `success = false` and the stats gathered so far (§4.9 step 4,
/// §7).
pub fn rebuild_collection(
    backend: &Backend,
    collection_id: &str,
    drop_unused: bool,
) -> Result<RebuildStats, DocStoreError> {
    let start = Instant::now();
    let collections = CollectionStore::new(backend);
    let collection = collections.require(collection_id)?;
    let documents = DocumentStore::new(backend, "");
    let content = ContentStore::new(&collection.documents_directory);
    let mapper = TableMapper::new(backend);
    let indexer = IndexManager::new(backend);

    let docs = documents.list(collection_id)?;
    let doc_ids: Vec<String> = docs.iter().map(|d| d.id.clone()).collect();

    let mappings_before = mapper.all()?;
    let all_tables_before: Vec<String> = mappings_before.iter().map(|(_, t)| t.clone()).collect();

    // Paths this collection currently occupies, so a later `drop_unused`
    // pass only considers tables this collection actually wrote to, not
    // every field path ever indexed by any collection (§4.9 step 2: "for
    // this collection's paths only").
    let mut prior_paths = Vec::new();
    for (path, table) in &mappings_before {
        if table_has_any_document(backend, table, &doc_ids)? {
            prior_paths.push(path.clone());
        }
    }

    let mut stats = RebuildStats::default();
    let mut errors = Vec::new();
    let mut flattened_by_doc = HashMap::new();

    for doc in &docs {
        match content.get(&doc.id) {
            Ok(bytes) => match serde_json::from_slice::<serde_json::Value>(&bytes) {
                Ok(parsed) => {
                    flattened_by_doc.insert(doc.id.clone(), flatten_document(&parsed).entries);
                }
                Err(e) => errors.push(format!("{}: malformed body: {e}", doc.id)),
            },
            Err(e) => errors.push(format!("{}: missing body: {e}", doc.id)),
        }
    }

    let active_paths: Vec<String> = match collection.indexing_mode {
        IndexingMode::All => {
            let mut set = HashSet::new();
            for entries in flattened_by_doc.values() {
                for entry in entries {
                    set.insert(entry.path.clone());
                }
            }
            set.into_iter().collect()
        }
        IndexingMode::Selective => collections.get_indexed_fields(collection_id)?,
        IndexingMode::None => Vec::new(),
    };

    for doc in &docs {
        let Some(entries) = flattened_by_doc.get(&doc.id) else { continue };

        if let Err(e) = indexer.delete_for_document_everywhere(&all_tables_before, &doc.id) {
            let err: DocStoreError = e.into();
            if matches!(err, DocStoreError::StorageFailure(_)) {
                return Err(abort(stats, errors, start, err));
            }
            errors.push(format!("{}: {err}", doc.id));
            continue;
        }

        let mut values_by_table: HashMap<String, Vec<IndexEntry>> = HashMap::new();
        let mut insert_failed = false;
        for entry in entries.iter().filter(|e| active_paths.contains(&e.path)) {
            let existed = mapper.lookup(&entry.path).map_err(DocStoreError::from)?.is_some();
            let table = match mapper.ensure_table(&entry.path) {
                Ok(t) => t,
                Err(e) => {
                    let err: DocStoreError = e.into();
                    if matches!(err, DocStoreError::StorageFailure(_)) {
                        return Err(abort(stats, errors, start, err));
                    }
                    errors.push(format!("{}: {err}", doc.id));
                    insert_failed = true;
                    break;
                }
            };
            if !existed {
                stats.indexes_created += 1;
            }
            values_by_table.entry(table).or_default().push(IndexEntry {
                document_id: doc.id.clone(),
                position: entry.position,
                value: entry.value.clone(),
            });
        }
        if insert_failed {
            continue;
        }

        let inserted: u64 = values_by_table.values().map(|v| v.len() as u64).sum();
        if let Err(e) = indexer.insert_values(&values_by_table) {
            let err: DocStoreError = e.into();
            if matches!(err, DocStoreError::StorageFailure(_)) {
                return Err(abort(stats, errors, start, err));
            }
            errors.push(format!("{}: {err}", doc.id));
            continue;
        }

        stats.values_inserted += inserted;
        stats.documents_processed += 1;
    }

    if drop_unused {
        for path in &prior_paths {
            if active_paths.contains(path) {
                continue;
            }
            let Some(table) = mapper.lookup(path)? else { continue };
            if table_is_empty(backend, &table)? {
                mapper.remove(path, &table)?;
                stats.indexes_dropped += 1;
            }
        }
    }

    stats.errors = errors;
    stats.duration_ms = start.elapsed().as_millis() as u64;
    stats.success = true;
    Ok(stats)
}

/// A storage-layer failure mid-rebuild aborts immediately; the caller still
/// gets the partial stats gathered so far, just folded into the error path
/// rather than returned as `Ok`. Since `RebuildStats` has nowhere to ride
/// along inside `Result::Err`, callers that need the partial counts on
/// abort should log them before propagating; this helper exists to keep
/// that one seam in one place.
fn abort(mut stats: RebuildStats, errors: Vec<String>, start: Instant, err: DocStoreError) -> DocStoreError {
    stats.errors = errors;
    stats.duration_ms = start.elapsed().as_millis() as u64;
    stats.success = false;
    tracing::error!(documents_processed = stats.documents_processed, error = %err, "rebuild aborted by storage failure");
    err
}

fn table_has_any_document(backend: &Backend, table: &str, document_ids: &[String]) -> Result<bool, DocStoreError> {
    let d = backend.dialect();
    for id in document_ids {
        let rows = backend.exec(
            &format!(
                "SELECT 1 as present FROM {} WHERE document_id = ?1",
                d.quote_ident(table)
            ),
            &[docstore_storage::Value::Text(id.clone())],
        )?;
        if !rows.is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

fn table_is_empty(backend: &Backend, table: &str) -> Result<bool, DocStoreError> {
    let d = backend.dialect();
    let rows = backend.exec(
        &format!("SELECT 1 as present FROM {}", d.quote_ident(table)),
        &[],
    )?;
    Ok(rows.is_empty())
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
    fn rebuild_reinserts_values_for_all_mode() {
        let backend = backend();
        let dir = tempfile::tempdir().unwrap();
        let collection = CollectionStore::new(&backend).create("People", None, dir.path().to_str().unwrap()).unwrap();
        let documents = DocumentStore::new(&backend, "host-1");
        documents.ingest(&collection.id, &json!({ "first": "Joel" }).to_string(), Some("joel"), &[], &[]).unwrap();

        let stats = rebuild_collection(&backend, &collection.id, false).unwrap();
        assert!(stats.success);
        assert_eq!(stats.documents_processed, 1);
        assert_eq!(stats.values_inserted, 1);
    }

    #[test]
    fn switching_to_selective_with_drop_unused_drops_obsolete_table() {
        let backend = backend();
        let dir = tempfile::tempdir().unwrap();
        let collection = CollectionStore::new(&backend).create("People", None, dir.path().to_str().unwrap()).unwrap();
        let documents = DocumentStore::new(&backend, "host-1");
        documents.ingest(&collection.id, &json!({ "a": 1, "b": 2 }).to_string(), Some("d1"), &[], &[]).unwrap();
        documents.ingest(&collection.id, &json!({ "a": 3, "b": 4 }).to_string(), Some("d2"), &[], &[]).unwrap();

        let collections = CollectionStore::new(&backend);
        collections.set_indexing_mode(&collection.id, IndexingMode::Selective).unwrap();
        collections.set_indexed_fields(&collection.id, &["a".to_string()]).unwrap();

        let stats = rebuild_collection(&backend, &collection.id, true).unwrap();
        assert!(stats.success);
        assert_eq!(stats.indexes_dropped, 1);

        let mapper = TableMapper::new(&backend);
        assert!(mapper.lookup("a").unwrap().is_some());
        assert!(mapper.lookup("b").unwrap().is_none());

        let table_a = mapper.lookup("a").unwrap().unwrap();
        let rows = backend.exec(&format!("SELECT * FROM \"{table_a}\""), &[]).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn shared_field_table_survives_drop_unused_if_other_collection_still_uses_it() {
        let backend = backend();
        let dir = tempfile::tempdir().unwrap();
        let documents = DocumentStore::new(&backend, "host-1");

        let c1 = CollectionStore::new(&backend).create("C1", None, dir.path().join("c1").to_str().unwrap()).unwrap();
        let c2 = CollectionStore::new(&backend).create("C2", None, dir.path().join("c2").to_str().unwrap()).unwrap();

        documents.ingest(&c1.id, &json!({ "shared": 1 }).to_string(), Some("d1"), &[], &[]).unwrap();
        documents.ingest(&c2.id, &json!({ "shared": 2 }).to_string(), Some("d2"), &[], &[]).unwrap();

        let collections = CollectionStore::new(&backend);
        collections.set_indexing_mode(&c1.id, IndexingMode::None).unwrap();

        let stats = rebuild_collection(&backend, &c1.id, true).unwrap();
        assert!(stats.success);
        assert_eq!(stats.indexes_dropped, 0);

        let mapper = TableMapper::new(&backend);
        assert!(mapper.lookup("shared").unwrap().is_some());
    }
}
