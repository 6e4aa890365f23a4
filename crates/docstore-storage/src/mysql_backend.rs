use mysql::prelude::Queryable;
use mysql::{Opts, OptsBuilder, Pool, PooledConn};

use crate::dialect::Dialect;
use crate::error::StorageError;
use crate::pool::{CancellationToken, DEFAULT_POOL_SIZE};
use crate::value::{Row, Value};

pub struct MySqlBackend {
    pool: Pool,
}

impl MySqlBackend {
    pub fn connect(conn_str: &str, pool_size: u32) -> Result<Self, StorageError> {
        let opts = Opts::from_url(conn_str)
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let builder = OptsBuilder::from_opts(opts)
            .pool_options(mysql::PoolOpts::default().with_constraints(
                mysql::PoolConstraints::new(
                    1,
                    if pool_size == 0 { DEFAULT_POOL_SIZE } else { pool_size } as usize,
                )
                .unwrap_or_default(),
            ));
        let pool = Pool::new(builder).map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(MySqlBackend { pool })
    }

    fn to_mysql_params(params: &[Value]) -> Vec<mysql::Value> {
        params
            .iter()
            .map(|v| match v {
                Value::Null => mysql::Value::NULL,
                Value::Text(s) => mysql::Value::Bytes(s.clone().into_bytes()),
                Value::Int(i) => mysql::Value::Int(*i),
                Value::Real(f) => mysql::Value::Double(*f),
                Value::Bool(b) => mysql::Value::Int(if *b { 1 } else { 0 }),
            })
            .collect()
    }

    fn row_from_mysql(row: mysql::Row) -> Row {
        let columns = row.columns();
        let mut cols = Vec::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            let value = match row.as_ref(i) {
                Some(mysql::Value::NULL) | None => Value::Null,
                Some(mysql::Value::Int(i)) => Value::Int(*i),
                Some(mysql::Value::UInt(u)) => Value::Int(*u as i64),
                Some(mysql::Value::Float(f)) => Value::Real(*f as f64),
                Some(mysql::Value::Double(f)) => Value::Real(*f),
                Some(mysql::Value::Bytes(b)) => {
                    Value::Text(String::from_utf8_lossy(b).into_owned())
                }
                Some(other) => Value::Text(format!("{other:?}")),
            };
            cols.push((col.name_str().into_owned(), value));
        }
        Row::new(cols)
    }

    fn conn(&self) -> Result<PooledConn, StorageError> {
        self.pool
            .get_conn()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    pub fn dialect(&self) -> Dialect {
        Dialect::MySql
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
        let mut conn = self.conn()?;
        let bound = Self::to_mysql_params(params);
        let rows: Vec<mysql::Row> = conn.exec(sql, mysql::Params::Positional(bound))?;
        Ok(rows.into_iter().map(Self::row_from_mysql).collect())
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
        let mut conn = self.conn()?;
        let bound = Self::to_mysql_params(params);
        conn.exec_drop(sql, mysql::Params::Positional(bound))?;
        Ok(conn.affected_rows())
    }

    pub fn exec_in_transaction(
        &self,
        statements: &[(String, Vec<Value>)],
        cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        let mut conn = self.conn()?;
        let mut tx = conn.start_transaction(mysql::TxOpts::default())?;
        for (sql, params) in statements {
            if cancel.is_cancelled() {
                tx.rollback()?;
                return Err(StorageError::Cancelled);
            }
            let bound = Self::to_mysql_params(params);
            if let Err(e) = tx.exec_drop(sql, mysql::Params::Positional(bound)) {
                return Err(StorageError::from(e));
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn table_exists(&self, name: &str) -> Result<bool, StorageError> {
        let rows = self.exec(
            "SELECT table_name FROM information_schema.tables WHERE table_name = ?",
            &[Value::Text(name.to_string())],
            &CancellationToken::new(),
        )?;
        Ok(!rows.is_empty())
    }

    pub fn create_index_table(&self, name: &str) -> Result<(), StorageError> {
        let mut conn = self.conn()?;
        for stmt in self.dialect().create_index_table_ddl(name) {
            conn.query_drop(stmt)?;
        }
        Ok(())
    }

    pub fn drop_table(&self, name: &str) -> Result<(), StorageError> {
        let mut conn = self.conn()?;
        conn.query_drop(self.dialect().drop_table_ddl(name))?;
        Ok(())
    }
}
