use std::collections::HashMap;

use chrono::Utc;
use docstore_flatten::TypedValue;
use docstore_storage::{Backend, Value};

use crate::error::IndexError;
use crate::filter::{Condition, FieldFilter};
use crate::mapping::TableMapper;

/// One value fanned out to an index table (§4.5's `IndexEntry`).
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub document_id: String,
    pub position: Option<i64>,
    pub value: TypedValue,
}

/// Escapes literal `%`, `_`, and `\` in a value destined for a LIKE pattern
/// we construct ourselves (`Contains`/`StartsWith`/`EndsWith`), so a value
/// containing a wildcard character is matched literally rather than as a
/// pattern. Paired with `ESCAPE '\\'` on the generated clause.
fn escape_like(value: &str) -> String {
    value.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn numeric_of(value: &TypedValue) -> Option<f64> {
    match value {
        TypedValue::Integer(i) => Some(*i as f64),
        TypedValue::Number(n) => Some(*n),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct DropUnusedStats {
    pub tables_dropped: usize,
}

/// Bulk insert/delete/search over the per-field index tables (§4.5).
pub struct IndexManager<'a> {
    backend: &'a Backend,
}

impl<'a> IndexManager<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        IndexManager { backend }
    }

    /// Builds the per-table `INSERT` statements for a fan-out, without
    /// executing them. Exposed so callers that must commit these inserts
    /// atomically alongside other writes (document row, labels, tags) can
    /// append them to their own transaction's statement list instead of
    /// running a second, separate transaction (§4.8 step 8, §5: readers
    /// must never observe a document whose index entries are partially
    /// applied).
    pub fn insert_statements(
        &self,
        values_by_table: &HashMap<String, Vec<IndexEntry>>,
    ) -> Vec<(String, Vec<Value>)> {
        let now = Utc::now().to_rfc3339();
        let d = self.backend.dialect();
        let mut statements = Vec::new();

        for (table, entries) in values_by_table {
            let t = d.quote_ident(table);
            for entry in entries {
                statements.push((
                    format!(
                        "INSERT INTO {t} (document_id, position, value, value_numeric, created_utc) VALUES (?1, ?2, ?3, ?4, ?5)"
                    ),
                    vec![
                        Value::Text(entry.document_id.clone()),
                        entry.position.map(Value::Int).unwrap_or(Value::Null),
                        Value::Text(entry.value.canonical_text()),
                        numeric_of(&entry.value).map(Value::Real).unwrap_or(Value::Null),
                        Value::Text(now.clone()),
                    ],
                ));
            }
        }

        statements
    }

    /// Bulk-inserts across every involved table inside one transaction; all
    /// succeed or none commit (§4.5 ordering guarantee). Callers that need
    /// these inserts to land in the same transaction as other writes should
    /// use `insert_statements` and fold the result into their own
    /// transaction instead.
    pub fn insert_values(
        &self,
        values_by_table: &HashMap<String, Vec<IndexEntry>>,
    ) -> Result<(), IndexError> {
        if values_by_table.is_empty() {
            return Ok(());
        }

        let statements = self.insert_statements(values_by_table);
        self.backend.exec_in_transaction(&statements)?;
        Ok(())
    }

    /// Removes one document's rows from a single table.
    pub fn delete_for_document(&self, table_name: &str, document_id: &str) -> Result<(), IndexError> {
        let d = self.backend.dialect();
        self.backend.exec_nonquery(
            &format!(
                "DELETE FROM {} WHERE document_id = ?1",
                d.quote_ident(table_name)
            ),
            &[Value::Text(document_id.to_string())],
        )?;
        Ok(())
    }

    /// Removes one document's rows from every table it might appear in.
    /// Used by document delete, which has no record of which fields were
    /// indexed for that document without scanning every mapped table.
    pub fn delete_for_document_everywhere(
        &self,
        table_names: &[String],
        document_id: &str,
    ) -> Result<(), IndexError> {
        for table in table_names {
            self.delete_for_document(table, document_id)?;
        }
        Ok(())
    }

    /// Translates one structured filter into a parameterized statement over
    /// `table_name`, returning the distinct set of matching document ids.
    pub fn search(&self, table_name: &str, filter: &FieldFilter) -> Result<Vec<String>, IndexError> {
        let d = self.backend.dialect();
        let t = d.quote_ident(table_name);
        let column = if filter.condition.is_range() { "value_numeric" } else { "value" };

        let (clause, params): (String, Vec<Value>) = match &filter.condition {
            Condition::IsNull => (format!("{column} IS NULL"), vec![]),
            Condition::IsNotNull => (format!("{column} IS NOT NULL"), vec![]),
            Condition::Equals => (
                format!("{column} = ?1"),
                vec![self.bind_value(filter)?],
            ),
            Condition::NotEquals => (
                format!("{column} != ?1"),
                vec![self.bind_value(filter)?],
            ),
            Condition::LessThan => (format!("{column} < ?1"), vec![self.bind_numeric(filter)?]),
            Condition::LessOrEqual => (format!("{column} <= ?1"), vec![self.bind_numeric(filter)?]),
            Condition::GreaterThan => (format!("{column} > ?1"), vec![self.bind_numeric(filter)?]),
            Condition::GreaterOrEqual => {
                (format!("{column} >= ?1"), vec![self.bind_numeric(filter)?])
            }
            Condition::Contains => (
                format!("{column} LIKE ?1 ESCAPE '\\'"),
                vec![Value::Text(format!("%{}%", escape_like(&self.text_value(filter)?)))],
            ),
            Condition::StartsWith => (
                format!("{column} LIKE ?1 ESCAPE '\\'"),
                vec![Value::Text(format!("{}%", escape_like(&self.text_value(filter)?)))],
            ),
            Condition::EndsWith => (
                format!("{column} LIKE ?1 ESCAPE '\\'"),
                vec![Value::Text(format!("%{}", escape_like(&self.text_value(filter)?)))],
            ),
            Condition::Like => (
                format!("{column} LIKE ?1"),
                vec![Value::Text(self.text_value(filter)?)],
            ),
        };

        let sql = format!("SELECT DISTINCT document_id FROM {t} WHERE {clause}");
        let rows = self.backend.exec(&sql, &params)?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get_text("document_id").map(|s| s.to_string()))
            .collect())
    }

    fn text_value(&self, filter: &FieldFilter) -> Result<String, IndexError> {
        Ok(filter
            .value
            .clone()
            .unwrap_or_else(|| "".to_string()))
    }

    fn bind_value(&self, filter: &FieldFilter) -> Result<Value, IndexError> {
        Ok(Value::Text(self.text_value(filter)?))
    }

    fn bind_numeric(&self, filter: &FieldFilter) -> Result<Value, IndexError> {
        let text = self.text_value(filter)?;
        let n: f64 = text.parse().map_err(|_| {
            IndexError::InvalidFilter(format!(
                "range comparison on '{}' requires a numeric value, got '{text}'",
                filter.field_path
            ))
        })?;
        Ok(Value::Real(n))
    }

    /// Drops every mapping and table not in `active_paths`. Used only by
    /// the rebuild engine (§4.9).
    pub fn drop_unused(
        &self,
        mapper: &TableMapper,
        active_paths: &[String],
    ) -> Result<DropUnusedStats, IndexError> {
        let mut stats = DropUnusedStats::default();
        for (key, table_name) in mapper.all()? {
            if !active_paths.contains(&key) {
                mapper.remove(&key, &table_name)?;
                stats.tables_dropped += 1;
            }
        }
        Ok(stats)
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
    fn insert_and_equals_search_round_trip() {
        let backend = backend();
        let mapper = TableMapper::new(&backend);
        mapper.ensure_tables().unwrap();
        let table = mapper.ensure_table("first").unwrap();

        let manager = IndexManager::new(&backend);
        let mut values = HashMap::new();
        values.insert(
            table.clone(),
            vec![IndexEntry {
                document_id: "doc-1".into(),
                position: None,
                value: TypedValue::String("Joel".into()),
            }],
        );
        manager.insert_values(&values).unwrap();

        let hits = manager
            .search(
                &table,
                &FieldFilter {
                    field_path: "first".into(),
                    condition: Condition::Equals,
                    value: Some("Joel".into()),
                },
            )
            .unwrap();
        assert_eq!(hits, vec!["doc-1".to_string()]);
    }

    #[test]
    fn numeric_range_search_casts_value_numeric() {
        let backend = backend();
        let mapper = TableMapper::new(&backend);
        mapper.ensure_tables().unwrap();
        let table = mapper.ensure_table("age").unwrap();

        let manager = IndexManager::new(&backend);
        let mut values = HashMap::new();
        values.insert(
            table.clone(),
            vec![
                IndexEntry { document_id: "d1".into(), position: None, value: TypedValue::Integer(9) },
                IndexEntry { document_id: "d2".into(), position: None, value: TypedValue::Integer(42) },
            ],
        );
        manager.insert_values(&values).unwrap();

        let hits = manager
            .search(
                &table,
                &FieldFilter {
                    field_path: "age".into(),
                    condition: Condition::GreaterThan,
                    value: Some("30".into()),
                },
            )
            .unwrap();
        assert_eq!(hits, vec!["d2".to_string()]);
    }

    #[test]
    fn delete_for_document_removes_rows() {
        let backend = backend();
        let mapper = TableMapper::new(&backend);
        mapper.ensure_tables().unwrap();
        let table = mapper.ensure_table("first").unwrap();

        let manager = IndexManager::new(&backend);
        let mut values = HashMap::new();
        values.insert(
            table.clone(),
            vec![IndexEntry { document_id: "doc-1".into(), position: None, value: TypedValue::String("Joel".into()) }],
        );
        manager.insert_values(&values).unwrap();
        manager.delete_for_document(&table, "doc-1").unwrap();

        let hits = manager
            .search(
                &table,
                &FieldFilter { field_path: "first".into(), condition: Condition::IsNotNull, value: None },
            )
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn starts_with_treats_literal_percent_as_a_literal_character() {
        let backend = backend();
        let mapper = TableMapper::new(&backend);
        mapper.ensure_tables().unwrap();
        let table = mapper.ensure_table("discount").unwrap();

        let manager = IndexManager::new(&backend);
        let mut values = HashMap::new();
        values.insert(
            table.clone(),
            vec![
                IndexEntry { document_id: "literal".into(), position: None, value: TypedValue::String("50% off".into()) },
                IndexEntry { document_id: "other".into(), position: None, value: TypedValue::String("50x off".into()) },
            ],
        );
        manager.insert_values(&values).unwrap();

        let hits = manager
            .search(
                &table,
                &FieldFilter { field_path: "discount".into(), condition: Condition::StartsWith, value: Some("50%".into()) },
            )
            .unwrap();
        assert_eq!(hits, vec!["literal".to_string()]);
    }

    #[test]
    fn range_filter_with_non_numeric_value_is_rejected() {
        let backend = backend();
        let mapper = TableMapper::new(&backend);
        mapper.ensure_tables().unwrap();
        let table = mapper.ensure_table("age").unwrap();

        let manager = IndexManager::new(&backend);
        let err = manager
            .search(
                &table,
                &FieldFilter { field_path: "age".into(), condition: Condition::GreaterThan, value: Some("not-a-number".into()) },
            )
            .unwrap_err();
        assert!(matches!(err, IndexError::InvalidFilter(_)));
    }

    #[test]
    fn drop_unused_removes_tables_outside_active_set() {
        let backend = backend();
        let mapper = TableMapper::new(&backend);
        mapper.ensure_tables().unwrap();
        mapper.ensure_table("a").unwrap();
        mapper.ensure_table("b").unwrap();

        let manager = IndexManager::new(&backend);
        let stats = manager.drop_unused(&mapper, &["a".to_string()]).unwrap();
        assert_eq!(stats.tables_dropped, 1);
        assert!(mapper.lookup("a").unwrap().is_some());
        assert!(mapper.lookup("b").unwrap().is_none());
    }
}
