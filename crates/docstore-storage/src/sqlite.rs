use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Value as SqlValue;

use crate::dialect::Dialect;
use crate::error::StorageError;
use crate::pool::{CancellationToken, DEFAULT_POOL_SIZE};
use crate::value::{Row, Value};

pub struct SqliteBackend {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteBackend {
    pub fn open(path: &str, pool_size: u32) -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(if pool_size == 0 { DEFAULT_POOL_SIZE } else { pool_size })
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(SqliteBackend { pool })
    }

    fn to_sql_params(params: &[Value]) -> Vec<SqlValue> {
        params
            .iter()
            .map(|v| match v {
                Value::Null => SqlValue::Null,
                Value::Text(s) => SqlValue::Text(s.clone()),
                Value::Int(i) => SqlValue::Integer(*i),
                Value::Real(f) => SqlValue::Real(*f),
                Value::Bool(b) => SqlValue::Integer(if *b { 1 } else { 0 }),
            })
            .collect()
    }

    fn row_from_sqlite(row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
        let stmt = row.as_ref();
        let mut cols = Vec::with_capacity(stmt.column_count());
        for i in 0..stmt.column_count() {
            let name = stmt.column_name(i)?.to_string();
            let value: SqlValue = row.get(i)?;
            let value = match value {
                SqlValue::Null => Value::Null,
                SqlValue::Integer(i) => Value::Int(i),
                SqlValue::Real(f) => Value::Real(f),
                SqlValue::Text(s) => Value::Text(s),
                SqlValue::Blob(b) => Value::Text(String::from_utf8_lossy(&b).into_owned()),
            };
            cols.push((name, value));
        }
        Ok(Row::new(cols))
    }

    pub fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    pub fn exec(
        &self,
        sql: &str,
        params: &[Value],
        cancel: &CancellationToken,
    ) -> Result<Vec<Row>, StorageError> {
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(sql)?;
        let bound = Self::to_sql_params(params);
        let params_ref: Vec<&dyn rusqlite::ToSql> =
            bound.iter().map(|v| v as &dyn rusqlite::ToSql).collect();
        let rows = stmt
            .query_map(params_ref.as_slice(), Self::row_from_sqlite)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn exec_nonquery(
        &self,
        sql: &str,
        params: &[Value],
        cancel: &CancellationToken,
    ) -> Result<u64, StorageError> {
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        let conn = self.pool.get()?;
        let bound = Self::to_sql_params(params);
        let params_ref: Vec<&dyn rusqlite::ToSql> =
            bound.iter().map(|v| v as &dyn rusqlite::ToSql).collect();
        let n = conn.execute(sql, params_ref.as_slice())?;
        Ok(n as u64)
    }

    pub fn exec_in_transaction(
        &self,
        statements: &[(String, Vec<Value>)],
        cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        for (sql, params) in statements {
            if cancel.is_cancelled() {
                tx.rollback()?;
                return Err(StorageError::Cancelled);
            }
            let bound = Self::to_sql_params(params);
            let params_ref: Vec<&dyn rusqlite::ToSql> =
                bound.iter().map(|v| v as &dyn rusqlite::ToSql).collect();
            if let Err(e) = tx.execute(sql, params_ref.as_slice()) {
                return Err(StorageError::from(e));
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn table_exists(&self, name: &str) -> Result<bool, StorageError> {
        let rows = self.exec(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            &[Value::Text(name.to_string())],
            &CancellationToken::new(),
        )?;
        Ok(!rows.is_empty())
    }

    pub fn create_index_table(&self, name: &str) -> Result<(), StorageError> {
        let conn = self.pool.get()?;
        for stmt in self.dialect().create_index_table_ddl(name) {
            conn.execute_batch(&stmt)?;
        }
        Ok(())
    }

    pub fn drop_table(&self, name: &str) -> Result<(), StorageError> {
        let conn = self.pool.get()?;
        conn.execute_batch(&self.dialect().drop_table_ddl(name))?;
        Ok(())
    }
}
