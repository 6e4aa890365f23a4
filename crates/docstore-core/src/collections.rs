use chrono::Utc;
use docstore_storage::{Backend, Value};
use docstore_validate::{EnforcementMode, FieldConstraint};

use crate::error::DocStoreError;
use crate::model::{Collection, IndexingMode};

fn row_to_collection(row: &docstore_storage::Row) -> Option<Collection> {
    Some(Collection {
        id: row.get_text("id")?.to_string(),
        name: row.get_text("name")?.to_string(),
        description: row.get_text("description").map(|s| s.to_string()),
        documents_directory: row.get_text("documents_directory")?.to_string(),
        schema_enforcement_mode: EnforcementMode::from_str(row.get_text("schema_enforcement_mode")?)?,
        indexing_mode: IndexingMode::from_str(row.get_text("indexing_mode")?)?,
        created_utc: row.get_text("created_utc")?.to_string(),
        last_update_utc: row.get_text("last_update_utc")?.to_string(),
    })
}

/// Collection CRUD plus the metadata collections own: labels, tags,
/// constraints, and the indexed-field whitelist (§3, §4.8).
pub struct CollectionStore<'a> {
    backend: &'a Backend,
}

impl<'a> CollectionStore<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        CollectionStore { backend }
    }

    pub fn create(
        &self,
        name: &str,
        description: Option<&str>,
        documents_directory: &str,
    ) -> Result<Collection, DocStoreError> {
        if name.trim().is_empty() {
            return Err(DocStoreError::InvalidInput("collection name must not be empty".into()));
        }
        if self.get_by_name(name)?.is_some() {
            return Err(DocStoreError::InvalidInput(format!("collection '{name}' already exists")));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let d = self.backend.dialect();

        self.backend.exec_nonquery(
            &format!(
                "INSERT INTO {} (id, name, description, documents_directory, schema_enforcement_mode, indexing_mode, created_utc, last_update_utc) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                d.quote_ident("collections")
            ),
            &[
                Value::Text(id.clone()),
                Value::Text(name.to_string()),
                description.map(|s| Value::Text(s.to_string())).unwrap_or(Value::Null),
                Value::Text(documents_directory.to_string()),
                Value::Text(EnforcementMode::None.as_str().to_string()),
                Value::Text(IndexingMode::All.as_str().to_string()),
                Value::Text(now.clone()),
                Value::Text(now.clone()),
            ],
        )?;

        Ok(Collection {
            id,
            name: name.to_string(),
            description: description.map(|s| s.to_string()),
            documents_directory: documents_directory.to_string(),
            schema_enforcement_mode: EnforcementMode::None,
            indexing_mode: IndexingMode::All,
            created_utc: now.clone(),
            last_update_utc: now,
        })
    }

    pub fn get(&self, id: &str) -> Result<Option<Collection>, DocStoreError> {
        let d = self.backend.dialect();
        let rows = self.backend.exec(
            &format!("SELECT * FROM {} WHERE id = ?1", d.quote_ident("collections")),
            &[Value::Text(id.to_string())],
        )?;
        Ok(rows.first().and_then(row_to_collection))
    }

    pub fn get_by_name(&self, name: &str) -> Result<Option<Collection>, DocStoreError> {
        let d = self.backend.dialect();
        let rows = self.backend.exec(
            &format!("SELECT * FROM {} WHERE name = ?1", d.quote_ident("collections")),
            &[Value::Text(name.to_string())],
        )?;
        Ok(rows.first().and_then(row_to_collection))
    }

    pub fn require(&self, id: &str) -> Result<Collection, DocStoreError> {
        self.get(id)?.ok_or_else(|| DocStoreError::CollectionNotFound(id.to_string()))
    }

    pub fn list(&self) -> Result<Vec<Collection>, DocStoreError> {
        let d = self.backend.dialect();
        let rows = self.backend.exec(&format!("SELECT * FROM {}", d.quote_ident("collections")), &[])?;
        Ok(rows.iter().filter_map(row_to_collection).collect())
    }

    /// Deletes a collection and cascades to every owned row (§3, §8
    /// scenario 6). Index rows are handled by the caller, which alone
    /// knows every table a collection's documents may have written to.
    pub fn delete(&self, id: &str) -> Result<(), DocStoreError> {
        let d = self.backend.dialect();
        let cid = Value::Text(id.to_string());

        self.backend.exec_nonquery(
            &format!(
                "DELETE FROM {} WHERE document_id IN (SELECT id FROM {} WHERE collection_id = ?1)",
                d.quote_ident("labels"),
                d.quote_ident("documents")
            ),
            &[cid.clone()],
        )?;
        self.backend.exec_nonquery(
            &format!(
                "DELETE FROM {} WHERE owner_kind = 'document' AND owner_id IN (SELECT id FROM {} WHERE collection_id = ?1)",
                d.quote_ident("tags"),
                d.quote_ident("documents")
            ),
            &[cid.clone()],
        )?;
        self.backend.exec_nonquery(
            &format!("DELETE FROM {} WHERE owner_kind = 'collection' AND owner_id = ?1", d.quote_ident("tags")),
            &[cid.clone()],
        )?;
        self.backend.exec_nonquery(
            &format!("DELETE FROM {} WHERE collection_id = ?1", d.quote_ident("collectionlabels")),
            &[cid.clone()],
        )?;
        self.backend.exec_nonquery(
            &format!("DELETE FROM {} WHERE collection_id = ?1", d.quote_ident("fieldconstraints")),
            &[cid.clone()],
        )?;
        self.backend.exec_nonquery(
            &format!("DELETE FROM {} WHERE collection_id = ?1", d.quote_ident("indexedfields")),
            &[cid.clone()],
        )?;
        self.backend.exec_nonquery(
            &format!("DELETE FROM {} WHERE collection_id = ?1", d.quote_ident("objectlocks")),
            &[cid.clone()],
        )?;
        self.backend.exec_nonquery(
            &format!("DELETE FROM {} WHERE collection_id = ?1", d.quote_ident("documents")),
            &[cid.clone()],
        )?;
        self.backend.exec_nonquery(
            &format!("DELETE FROM {} WHERE id = ?1", d.quote_ident("collections")),
            &[cid],
        )?;
        Ok(())
    }

    pub fn set_enforcement_mode(&self, id: &str, mode: EnforcementMode) -> Result<(), DocStoreError> {
        self.touch_column(id, "schema_enforcement_mode", mode.as_str())
    }

    pub fn set_indexing_mode(&self, id: &str, mode: IndexingMode) -> Result<(), DocStoreError> {
        self.touch_column(id, "indexing_mode", mode.as_str())
    }

    fn touch_column(&self, id: &str, column: &str, value: &str) -> Result<(), DocStoreError> {
        let d = self.backend.dialect();
        self.backend.exec_nonquery(
            &format!(
                "UPDATE {} SET {column} = ?1, last_update_utc = ?2 WHERE id = ?3",
                d.quote_ident("collections")
            ),
            &[Value::Text(value.to_string()), Value::Text(Utc::now().to_rfc3339()), Value::Text(id.to_string())],
        )?;
        Ok(())
    }

    // ── Constraints ─────────────────────────────────────────────

    pub fn set_constraints(&self, collection_id: &str, constraints: &[FieldConstraint]) -> Result<(), DocStoreError> {
        let d = self.backend.dialect();
        let cid = Value::Text(collection_id.to_string());

        let mut statements = vec![(
            format!("DELETE FROM {} WHERE collection_id = ?1", d.quote_ident("fieldconstraints")),
            vec![cid.clone()],
        )];

        for c in constraints {
            statements.push((
                format!(
                    "INSERT INTO {} (collection_id, field_path, data_type, required, nullable, regex_pattern, min_value, max_value, min_length, max_length, allowed_values, array_element_type) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    d.quote_ident("fieldconstraints")
                ),
                vec![
                    cid.clone(),
                    Value::Text(c.field_path.clone()),
                    Value::Text(c.data_type.as_str().to_string()),
                    Value::Bool(c.required),
                    Value::Bool(c.nullable),
                    c.regex_pattern.clone().map(Value::Text).unwrap_or(Value::Null),
                    c.min_value.map(Value::Real).unwrap_or(Value::Null),
                    c.max_value.map(Value::Real).unwrap_or(Value::Null),
                    c.min_length.map(|n| Value::Int(n as i64)).unwrap_or(Value::Null),
                    c.max_length.map(|n| Value::Int(n as i64)).unwrap_or(Value::Null),
                    c.allowed_values.clone().map(|v| Value::Text(v.join("\u{1}"))).unwrap_or(Value::Null),
                    c.array_element_type.map(|t| Value::Text(t.as_str().to_string())).unwrap_or(Value::Null),
                ],
            ));
        }

        self.backend.exec_in_transaction(&statements)?;
        Ok(())
    }

    pub fn get_constraints(&self, collection_id: &str) -> Result<Vec<FieldConstraint>, DocStoreError> {
        let d = self.backend.dialect();
        let rows = self.backend.exec(
            &format!("SELECT * FROM {} WHERE collection_id = ?1", d.quote_ident("fieldconstraints")),
            &[Value::Text(collection_id.to_string())],
        )?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let data_type = docstore_flatten::DataType::from_str(row.get_text("data_type")?)?;
                let mut c = FieldConstraint::new(row.get_text("field_path")?.to_string(), data_type);
                c.required = row.get_bool("required").unwrap_or(false);
                c.nullable = row.get_bool("nullable").unwrap_or(true);
                c.regex_pattern = row.get_text("regex_pattern").map(|s| s.to_string());
                c.min_value = match row.get("min_value") {
                    Some(Value::Real(n)) => Some(*n),
                    _ => None,
                };
                c.max_value = match row.get("max_value") {
                    Some(Value::Real(n)) => Some(*n),
                    _ => None,
                };
                c.min_length = row.get_int("min_length").map(|n| n as usize);
                c.max_length = row.get_int("max_length").map(|n| n as usize);
                c.allowed_values = row
                    .get_text("allowed_values")
                    .map(|s| s.split('\u{1}').map(|s| s.to_string()).collect());
                c.array_element_type = row.get_text("array_element_type").and_then(docstore_flatten::DataType::from_str);
                Some(c)
            })
            .collect())
    }

    // ── Indexed fields ──────────────────────────────────────────

    pub fn set_indexed_fields(&self, collection_id: &str, field_paths: &[String]) -> Result<(), DocStoreError> {
        let d = self.backend.dialect();
        let cid = Value::Text(collection_id.to_string());
        let mut statements = vec![(
            format!("DELETE FROM {} WHERE collection_id = ?1", d.quote_ident("indexedfields")),
            vec![cid.clone()],
        )];
        for path in field_paths {
            statements.push((
                format!(
                    "INSERT INTO {} (collection_id, field_path) VALUES (?1, ?2)",
                    d.quote_ident("indexedfields")
                ),
                vec![cid.clone(), Value::Text(path.clone())],
            ));
        }
        self.backend.exec_in_transaction(&statements)?;
        Ok(())
    }

    pub fn get_indexed_fields(&self, collection_id: &str) -> Result<Vec<String>, DocStoreError> {
        let d = self.backend.dialect();
        let rows = self.backend.exec(
            &format!("SELECT field_path FROM {} WHERE collection_id = ?1", d.quote_ident("indexedfields")),
            &[Value::Text(collection_id.to_string())],
        )?;
        Ok(rows.iter().filter_map(|r| r.get_text("field_path").map(|s| s.to_string())).collect())
    }

    // ── Labels & tags (collection-scoped) ───────────────────────

    pub fn add_label(&self, collection_id: &str, label: &str) -> Result<(), DocStoreError> {
        let d = self.backend.dialect();
        self.backend.exec_nonquery(
            &format!(
                "INSERT INTO {} (collection_id, label_value) VALUES (?1, ?2)",
                d.quote_ident("collectionlabels")
            ),
            &[Value::Text(collection_id.to_string()), Value::Text(label.to_string())],
        )?;
        Ok(())
    }

    pub fn labels(&self, collection_id: &str) -> Result<Vec<String>, DocStoreError> {
        let d = self.backend.dialect();
        let rows = self.backend.exec(
            &format!("SELECT label_value FROM {} WHERE collection_id = ?1", d.quote_ident("collectionlabels")),
            &[Value::Text(collection_id.to_string())],
        )?;
        Ok(rows.iter().filter_map(|r| r.get_text("label_value").map(|s| s.to_string())).collect())
    }

    pub fn set_tag(&self, collection_id: &str, key: &str, value: Option<&str>) -> Result<(), DocStoreError> {
        let d = self.backend.dialect();
        self.backend.exec_nonquery(
            &format!(
                "DELETE FROM {} WHERE owner_kind = 'collection' AND owner_id = ?1 AND key = ?2",
                d.quote_ident("tags")
            ),
            &[Value::Text(collection_id.to_string()), Value::Text(key.to_string())],
        )?;
        self.backend.exec_nonquery(
            &format!(
                "INSERT INTO {} (owner_kind, owner_id, key, value) VALUES ('collection', ?1, ?2, ?3)",
                d.quote_ident("tags")
            ),
            &[
                Value::Text(collection_id.to_string()),
                Value::Text(key.to_string()),
                value.map(|s| Value::Text(s.to_string())).unwrap_or(Value::Null),
            ],
        )?;
        Ok(())
    }

    pub fn tags(&self, collection_id: &str) -> Result<Vec<(String, Option<String>)>, DocStoreError> {
        let d = self.backend.dialect();
        let rows = self.backend.exec(
            &format!(
                "SELECT key, value FROM {} WHERE owner_kind = 'collection' AND owner_id = ?1",
                d.quote_ident("tags")
            ),
            &[Value::Text(collection_id.to_string())],
        )?;
        Ok(rows
            .iter()
            .filter_map(|r| Some((r.get_text("key")?.to_string(), r.get_text("value").map(|s| s.to_string()))))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_storage::Dialect;

    fn backend() -> Backend {
        let backend = Backend::open(Dialect::Sqlite, ":memory:", 4).unwrap();
        crate::bootstrap::ensure_fixed_tables(&backend).unwrap();
        backend
    }

    #[test]
    fn create_and_get_round_trip() {
        let backend = backend();
        let store = CollectionStore::new(&backend);
        let created = store.create("People", None, "./documents/people").unwrap();
        let fetched = store.require(&created.id).unwrap();
        assert_eq!(fetched.name, "People");
        assert_eq!(fetched.schema_enforcement_mode, EnforcementMode::None);
    }

    #[test]
    fn duplicate_name_rejected() {
        let backend = backend();
        let store = CollectionStore::new(&backend);
        store.create("People", None, "./documents/people").unwrap();
        assert!(store.create("People", None, "./documents/people2").is_err());
    }

    #[test]
    fn delete_cascades_everything_owned() {
        let backend = backend();
        let store = CollectionStore::new(&backend);
        let collection = store.create("People", None, "./documents/people").unwrap();
        store.add_label(&collection.id, "demo").unwrap();
        store.set_indexed_fields(&collection.id, &["first".to_string()]).unwrap();

        store.delete(&collection.id).unwrap();
        assert!(store.get(&collection.id).unwrap().is_none());
        assert!(store.labels(&collection.id).unwrap().is_empty());
        assert!(store.get_indexed_fields(&collection.id).unwrap().is_empty());
    }

    #[test]
    fn constraints_round_trip() {
        let backend = backend();
        let store = CollectionStore::new(&backend);
        let collection = store.create("People", None, "./documents/people").unwrap();

        let mut c = FieldConstraint::new("email", docstore_flatten::DataType::String);
        c.required = true;
        c.regex_pattern = Some("^[^@]+@[^@]+$".to_string());
        store.set_constraints(&collection.id, &[c]).unwrap();

        let fetched = store.get_constraints(&collection.id).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].field_path, "email");
        assert!(fetched[0].required);
    }
}
