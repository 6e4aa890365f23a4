use docstore_storage::{sanitize_identifier, Backend, Value};

use crate::error::IndexError;

/// Maintains the process-wide `field_path -> physical table name` mapping
/// (§4.5). Every field path that is ever indexed by any collection gets
/// exactly one physical table, shared across collections.
pub struct TableMapper<'a> {
    backend: &'a Backend,
}

impl<'a> TableMapper<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        TableMapper { backend }
    }

    pub fn ensure_tables(&self) -> Result<(), IndexError> {
        let d = self.backend.dialect();
        let cols = format!(
            "id {}, key {} NOT NULL, table_name {} NOT NULL",
            d.autoincrement_pk(),
            d.short_text_type(),
            d.short_text_type(),
        );
        self.backend.exec_nonquery(
            &d.create_if_not_exists(
                "indextablemappings",
                &d.quote_ident("indextablemappings"),
                &cols,
            ),
            &[],
        )?;
        // At most one row per field path (§8); without this, two racing
        // `ensure_table` calls for the same path can both miss the lookup
        // and both insert, splitting one field's entries across two tables.
        self.backend
            .exec_nonquery(
                &format!(
                    "CREATE UNIQUE INDEX IF NOT EXISTS indextablemappings_key_idx ON {} (key)",
                    d.quote_ident("indextablemappings")
                ),
                &[],
            )
            .ok();
        Ok(())
    }

    /// Looks up the physical table for `field_path` without creating one.
    pub fn lookup(&self, field_path: &str) -> Result<Option<String>, IndexError> {
        let d = self.backend.dialect();
        let rows = self.backend.exec(
            &format!(
                "SELECT table_name FROM {} WHERE key = ?1",
                d.quote_ident("indextablemappings")
            ),
            &[Value::Text(field_path.to_string())],
        )?;
        Ok(rows.first().and_then(|r| r.get_text("table_name")).map(|s| s.to_string()))
    }

    /// Looks up the mapping for `field_path`, creating the physical table
    /// and mapping row on first use. Concurrent callers racing to create
    /// the same path's mapping are resolved by retrying the lookup after a
    /// unique-constraint failure on insert.
    pub fn ensure_table(&self, field_path: &str) -> Result<String, IndexError> {
        if let Some(existing) = self.lookup(field_path)? {
            return Ok(existing);
        }

        let table_name = self.derive_unused_name(field_path)?;

        let d = self.backend.dialect();
        let insert = (
            format!(
                "INSERT INTO {} (key, table_name) VALUES (?1, ?2)",
                d.quote_ident("indextablemappings")
            ),
            vec![
                Value::Text(field_path.to_string()),
                Value::Text(table_name.clone()),
            ],
        );

        if let Err(e) = self.backend.exec_in_transaction(std::slice::from_ref(&insert)) {
            if let Some(existing) = self.lookup(field_path)? {
                return Ok(existing);
            }
            return Err(IndexError::Storage(e));
        }

        self.backend.create_index_table(&table_name)?;
        Ok(table_name)
    }

    /// Derives a sanitized, collision-free table name for a new field path.
    /// Sanitization is lossy (distinct paths can collapse to the same
    /// identifier), so a numeric suffix is appended until the name is free.
    fn derive_unused_name(&self, field_path: &str) -> Result<String, IndexError> {
        let mut base = sanitize_identifier(&format!("idx_{field_path}"))?;
        // Reserve room for the largest collision suffix we might append so
        // the final candidate never exceeds the sanitizer's own identifier
        // limit (a base already at the limit plus "_2" would overrun it).
        const SUFFIX_ROOM: usize = 6;
        if base.len() + SUFFIX_ROOM > docstore_storage::MAX_IDENTIFIER_LEN {
            base.truncate(docstore_storage::MAX_IDENTIFIER_LEN - SUFFIX_ROOM);
        }
        let d = self.backend.dialect();

        let mut candidate = base.clone();
        let mut suffix = 1u32;
        loop {
            let rows = self.backend.exec(
                &format!(
                    "SELECT 1 as present FROM {} WHERE table_name = ?1",
                    d.quote_ident("indextablemappings")
                ),
                &[Value::Text(candidate.clone())],
            )?;
            if rows.is_empty() {
                return Ok(candidate);
            }
            suffix += 1;
            candidate = format!("{base}_{suffix}");
        }
    }

    /// All current `(field_path, table_name)` mappings.
    pub fn all(&self) -> Result<Vec<(String, String)>, IndexError> {
        let d = self.backend.dialect();
        let rows = self.backend.exec(
            &format!("SELECT key, table_name FROM {}", d.quote_ident("indextablemappings")),
            &[],
        )?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                Some((r.get_text("key")?.to_string(), r.get_text("table_name")?.to_string()))
            })
            .collect())
    }

    pub fn remove(&self, field_path: &str, table_name: &str) -> Result<(), IndexError> {
        let d = self.backend.dialect();
        self.backend.drop_table(table_name)?;
        self.backend.exec_nonquery(
            &format!("DELETE FROM {} WHERE key = ?1", d.quote_ident("indextablemappings")),
            &[Value::Text(field_path.to_string())],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_storage::Dialect;

    fn backend() -> Backend {
        Backend::open(Dialect::Sqlite, ":memory:", 4).unwrap()
    }

    #[test]
    fn ensure_table_is_idempotent() {
        let backend = backend();
        let mapper = TableMapper::new(&backend);
        mapper.ensure_tables().unwrap();

        let first = mapper.ensure_table("user.email").unwrap();
        let second = mapper.ensure_table("user.email").unwrap();
        assert_eq!(first, second);
        assert!(backend.table_exists(&first).unwrap());
    }

    #[test]
    fn distinct_paths_get_distinct_tables() {
        let backend = backend();
        let mapper = TableMapper::new(&backend);
        mapper.ensure_tables().unwrap();

        let a = mapper.ensure_table("first").unwrap();
        let b = mapper.ensure_table("age").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn remove_drops_table_and_mapping() {
        let backend = backend();
        let mapper = TableMapper::new(&backend);
        mapper.ensure_tables().unwrap();

        let table = mapper.ensure_table("first").unwrap();
        mapper.remove("first", &table).unwrap();
        assert!(!backend.table_exists(&table).unwrap());
        assert!(mapper.lookup("first").unwrap().is_none());
    }

    #[test]
    fn concurrent_ensure_table_for_same_path_does_not_split_across_two_tables() {
        // Simulates two racing callers both missing the `lookup` check
        // before either has inserted its mapping row: the second `ensure_table`
        // call (or a direct duplicate insert) must not succeed in creating a
        // second table for the same field path.
        let backend = backend();
        let mapper = TableMapper::new(&backend);
        mapper.ensure_tables().unwrap();

        let first = mapper.ensure_table("status").unwrap();

        let d = backend.dialect();
        let duplicate = backend.exec_in_transaction(&[(
            format!(
                "INSERT INTO {} (key, table_name) VALUES (?1, ?2)",
                d.quote_ident("indextablemappings")
            ),
            vec![Value::Text("status".to_string()), Value::Text("some_other_table".to_string())],
        )]);
        assert!(duplicate.is_err());

        let second = mapper.ensure_table("status").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn derived_name_never_exceeds_identifier_limit_even_after_collision_suffix() {
        // Two distinct field paths long enough that sanitization truncates
        // both to the same prefix collide on their derived base name; the
        // second must get a numeric suffix without the result overrunning
        // the identifier limit a base already at the limit would otherwise
        // hit.
        let backend = backend();
        let mapper = TableMapper::new(&backend);
        mapper.ensure_tables().unwrap();

        let shared_prefix = "a".repeat(200);
        let path_one = format!("{shared_prefix}.one");
        let path_two = format!("{shared_prefix}.two");

        let first = mapper.ensure_table(&path_one).unwrap();
        let second = mapper.ensure_table(&path_two).unwrap();

        assert_ne!(first, second);
        assert!(first.len() <= docstore_storage::MAX_IDENTIFIER_LEN);
        assert!(second.len() <= docstore_storage::MAX_IDENTIFIER_LEN);
    }
}
