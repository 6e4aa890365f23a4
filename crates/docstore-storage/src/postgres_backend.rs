use chrono::{DateTime, Utc};
use postgres::types::Type as PgType;
use postgres::NoTls;
use r2d2::Pool;
use r2d2_postgres::PostgresConnectionManager;

use crate::dialect::Dialect;
use crate::error::StorageError;
use crate::pool::{CancellationToken, DEFAULT_POOL_SIZE};
use crate::value::{Row, Value};

pub struct PostgresBackend {
    pool: Pool<PostgresConnectionManager<NoTls>>,
}

impl PostgresBackend {
    pub fn connect(conn_str: &str, pool_size: u32) -> Result<Self, StorageError> {
        let manager = PostgresConnectionManager::new(
            conn_str
                .parse()
                .map_err(|e: postgres::Error| StorageError::Connection(e.to_string()))?,
            NoTls,
        );
        let pool = Pool::builder()
            .max_size(if pool_size == 0 { DEFAULT_POOL_SIZE } else { pool_size })
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(PostgresBackend { pool })
    }

    fn to_sql_params(params: &[Value]) -> Vec<Box<dyn postgres::types::ToSql + Sync>> {
        params
            .iter()
            .map(|v| -> Box<dyn postgres::types::ToSql + Sync> {
                match v {
                    Value::Null => Box::new(Option::<String>::None),
                    Value::Text(s) => Box::new(s.clone()),
                    Value::Int(i) => Box::new(*i),
                    Value::Real(f) => Box::new(*f),
                    Value::Bool(b) => Box::new(*b),
                }
            })
            .collect()
    }

    fn row_from_pg(row: &postgres::Row) -> Row {
        let mut cols = Vec::with_capacity(row.len());
        for (i, column) in row.columns().iter().enumerate() {
            let value = match *column.type_() {
                PgType::INT8 | PgType::INT4 | PgType::INT2 => row
                    .get::<_, Option<i64>>(i)
                    .map(Value::Int)
                    .unwrap_or(Value::Null),
                PgType::FLOAT8 | PgType::FLOAT4 => row
                    .get::<_, Option<f64>>(i)
                    .map(Value::Real)
                    .unwrap_or(Value::Null),
                PgType::BOOL => row
                    .get::<_, Option<bool>>(i)
                    .map(Value::Bool)
                    .unwrap_or(Value::Null),
                PgType::TIMESTAMPTZ => row
                    .get::<_, Option<DateTime<Utc>>>(i)
                    .map(|d| Value::Text(d.to_rfc3339()))
                    .unwrap_or(Value::Null),
                _ => row
                    .get::<_, Option<String>>(i)
                    .map(Value::Text)
                    .unwrap_or(Value::Null),
            };
            cols.push((column.name().to_string(), value));
        }
        Row::new(cols)
    }

    pub fn dialect(&self) -> Dialect {
        Dialect::Postgres
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
        let mut conn = self.pool.get()?;
        let bound = Self::to_sql_params(params);
        let refs: Vec<&(dyn postgres::types::ToSql + Sync)> =
            bound.iter().map(|b| b.as_ref()).collect();
        let rows = conn.query(sql, refs.as_slice())?;
        Ok(rows.iter().map(Self::row_from_pg).collect())
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
        let mut conn = self.pool.get()?;
        let bound = Self::to_sql_params(params);
        let refs: Vec<&(dyn postgres::types::ToSql + Sync)> =
            bound.iter().map(|b| b.as_ref()).collect();
        Ok(conn.execute(sql, refs.as_slice())?)
    }

    pub fn exec_in_transaction(
        &self,
        statements: &[(String, Vec<Value>)],
        cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        let mut conn = self.pool.get()?;
        let mut tx = conn.transaction()?;
        for (sql, params) in statements {
            if cancel.is_cancelled() {
                tx.rollback()?;
                return Err(StorageError::Cancelled);
            }
            let bound = Self::to_sql_params(params);
            let refs: Vec<&(dyn postgres::types::ToSql + Sync)> =
                bound.iter().map(|b| b.as_ref()).collect();
            tx.execute(sql.as_str(), refs.as_slice())?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn table_exists(&self, name: &str) -> Result<bool, StorageError> {
        let rows = self.exec(
            "SELECT table_name FROM information_schema.tables WHERE table_name = $1",
            &[Value::Text(name.to_string())],
            &CancellationToken::new(),
        )?;
        Ok(!rows.is_empty())
    }

    pub fn create_index_table(&self, name: &str) -> Result<(), StorageError> {
        let mut conn = self.pool.get()?;
        for stmt in self.dialect().create_index_table_ddl(name) {
            conn.batch_execute(&stmt)?;
        }
        Ok(())
    }

    pub fn drop_table(&self, name: &str) -> Result<(), StorageError> {
        let mut conn = self.pool.get()?;
        conn.batch_execute(&self.dialect().drop_table_ddl(name))?;
        Ok(())
    }
}
