use chrono::Utc;
use docstore_flatten::{DataType, SchemaElementDraft};
use docstore_storage::{Backend, Value};

use crate::error::SchemaError;

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaElementRow {
    pub position: i64,
    pub key: String,
    pub data_type: DataType,
    pub nullable: bool,
}

/// Interns structural fingerprints into reusable schema identities (§4.4).
/// Schemas are never mutated after creation.
pub struct SchemaRegistry<'a> {
    backend: &'a Backend,
}

impl<'a> SchemaRegistry<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        SchemaRegistry { backend }
    }

    pub fn ensure_tables(&self) -> Result<(), SchemaError> {
        let d = self.backend.dialect();
        let schemas_cols = format!(
            "id {} PRIMARY KEY, hash {} NOT NULL, created_utc {} NOT NULL, last_update_utc {} NOT NULL",
            d.short_text_type(),
            d.short_text_type(),
            d.timestamp_type(),
            d.timestamp_type(),
        );
        self.backend.exec_nonquery(
            &d.create_if_not_exists("schemas", &d.quote_ident("schemas"), &schemas_cols),
            &[],
        )?;
        self.backend.exec_nonquery(
            &format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS schemas_hash_idx ON {} (hash)",
                d.quote_ident("schemas")
            ),
            &[],
        ).ok();

        let elements_cols = format!(
            "id {}, schema_id {} NOT NULL, position {} NOT NULL, key {} NOT NULL, data_type {} NOT NULL, nullable {} NOT NULL",
            d.autoincrement_pk(),
            d.short_text_type(),
            d.integer_type(),
            d.text_type(),
            d.short_text_type(),
            d.boolean_type(),
        );
        self.backend.exec_nonquery(
            &d.create_if_not_exists(
                "schemaelements",
                &d.quote_ident("schemaelements"),
                &elements_cols,
            ),
            &[],
        )?;
        Ok(())
    }

    /// Returns the existing schema id if `fingerprint` was seen before,
    /// otherwise allocates a new id, inserts the schema row, then
    /// bulk-inserts its elements ordered by emission position.
    pub fn intern(
        &self,
        fingerprint: &str,
        elements: &[SchemaElementDraft],
    ) -> Result<String, SchemaError> {
        let d = self.backend.dialect();
        let rows = self.backend.exec(
            &format!(
                "SELECT id FROM {} WHERE hash = ?1",
                d.quote_ident("schemas")
            ),
            &[Value::Text(fingerprint.to_string())],
        )?;
        if let Some(row) = rows.first() {
            if let Some(id) = row.get_text("id") {
                return Ok(id.to_string());
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut statements = vec![(
            format!(
                "INSERT INTO {} (id, hash, created_utc, last_update_utc) VALUES (?1, ?2, ?3, ?4)",
                d.quote_ident("schemas")
            ),
            vec![
                Value::Text(id.clone()),
                Value::Text(fingerprint.to_string()),
                Value::Text(now.clone()),
                Value::Text(now),
            ],
        )];

        for (position, element) in elements.iter().enumerate() {
            statements.push((
                format!(
                    "INSERT INTO {} (schema_id, position, key, data_type, nullable) VALUES (?1, ?2, ?3, ?4, ?5)",
                    d.quote_ident("schemaelements")
                ),
                vec![
                    Value::Text(id.clone()),
                    Value::Int(position as i64),
                    Value::Text(element.key.clone()),
                    Value::Text(element.data_type.as_str().to_string()),
                    Value::Bool(element.nullable),
                ],
            ));
        }

        // Races on the same fingerprint are resolved by the unique index on
        // `hash`; a concurrent interner retries the lookup on conflict.
        if let Err(e) = self.backend.exec_in_transaction(&statements) {
            if let Some(existing) = self.lookup_by_hash(fingerprint)? {
                return Ok(existing);
            }
            return Err(SchemaError::Storage(e));
        }

        Ok(id)
    }

    fn lookup_by_hash(&self, fingerprint: &str) -> Result<Option<String>, SchemaError> {
        let d = self.backend.dialect();
        let rows = self.backend.exec(
            &format!("SELECT id FROM {} WHERE hash = ?1", d.quote_ident("schemas")),
            &[Value::Text(fingerprint.to_string())],
        )?;
        Ok(rows.first().and_then(|r| r.get_text("id")).map(|s| s.to_string()))
    }

    /// Returns a schema's elements ordered by position.
    pub fn get_elements(&self, schema_id: &str) -> Result<Vec<SchemaElementRow>, SchemaError> {
        let d = self.backend.dialect();
        let rows = self.backend.exec(
            &format!(
                "SELECT position, key, data_type, nullable FROM {} WHERE schema_id = ?1 ORDER BY position ASC",
                d.quote_ident("schemaelements")
            ),
            &[Value::Text(schema_id.to_string())],
        )?;
        Ok(rows
            .iter()
            .map(|r| SchemaElementRow {
                position: r.get_int("position").unwrap_or(0),
                key: r.get_text("key").unwrap_or_default().to_string(),
                data_type: DataType::from_str(r.get_text("data_type").unwrap_or("string")).unwrap_or(DataType::Null),
                nullable: r.get_bool("nullable").unwrap_or(false),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_flatten::flatten_document;
    use docstore_storage::Dialect;
    use serde_json::json;

    fn backend() -> Backend {
        Backend::open(Dialect::Sqlite, ":memory:", 4).unwrap()
    }

    #[test]
    fn interning_same_shape_twice_returns_same_id() {
        let backend = backend();
        let registry = SchemaRegistry::new(&backend);
        registry.ensure_tables().unwrap();

        let a = flatten_document(&json!({ "first": "Joel", "age": 42 }));
        let b = flatten_document(&json!({ "first": "Amy", "age": 7 }));

        let id_a = registry.intern(&a.fingerprint, &a.elements).unwrap();
        let id_b = registry.intern(&b.fingerprint, &b.elements).unwrap();
        assert_eq!(id_a, id_b);
    }

    #[test]
    fn different_shapes_get_different_ids() {
        let backend = backend();
        let registry = SchemaRegistry::new(&backend);
        registry.ensure_tables().unwrap();

        let a = flatten_document(&json!({ "first": "Joel" }));
        let b = flatten_document(&json!({ "first": 1 }));

        let id_a = registry.intern(&a.fingerprint, &a.elements).unwrap();
        let id_b = registry.intern(&b.fingerprint, &b.elements).unwrap();
        assert_ne!(id_a, id_b);
    }

    #[test]
    fn get_elements_ordered_by_position() {
        let backend = backend();
        let registry = SchemaRegistry::new(&backend);
        registry.ensure_tables().unwrap();

        let doc = flatten_document(&json!({ "b": 1, "a": 2 }));
        let id = registry.intern(&doc.fingerprint, &doc.elements).unwrap();
        let elements = registry.get_elements(&id).unwrap();
        assert_eq!(elements.iter().map(|e| e.key.clone()).collect::<Vec<_>>(), vec!["b", "a"]);
    }
}
