use std::sync::{Condvar, Mutex};

use odbc_api::buffers::TextRowSet;
use odbc_api::{Connection, ConnectionOptions, Cursor, Environment};

use crate::dialect::Dialect;
use crate::error::StorageError;
use crate::pool::{CancellationToken, DEFAULT_POOL_SIZE};
use crate::value::{Row, Value};

const ODBC_BATCH_SIZE: usize = 256;
const ODBC_MAX_TEXT_LEN: usize = 4096;

/// A small hand-rolled bounded pool, since `odbc-api` ships no pool of its
/// own. Mirrors the teacher's `Condvar`-based wait loop (`slate-db::sweep`)
/// rather than pulling in a pooling crate for a single dialect.
struct OdbcPool {
    env: &'static Environment,
    conn_str: String,
    idle: Mutex<Vec<Connection<'static>>>,
    notify: Condvar,
    outstanding: Mutex<u32>,
    max_size: u32,
}

pub struct MsSqlBackend {
    pool: OdbcPool,
}

impl MsSqlBackend {
    pub fn connect(conn_str: &str, pool_size: u32) -> Result<Self, StorageError> {
        let env = Box::leak(Box::new(
            Environment::new().map_err(|e| StorageError::Connection(e.to_string()))?,
        ));
        let max_size = if pool_size == 0 { DEFAULT_POOL_SIZE } else { pool_size };
        Ok(MsSqlBackend {
            pool: OdbcPool {
                env,
                conn_str: conn_str.to_string(),
                idle: Mutex::new(Vec::new()),
                notify: Condvar::new(),
                outstanding: Mutex::new(0),
                max_size,
            },
        })
    }

    fn acquire(&self, cancel: &CancellationToken) -> Result<Connection<'static>, StorageError> {
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        {
            let mut idle = self.pool.idle.lock().unwrap();
            if let Some(conn) = idle.pop() {
                return Ok(conn);
            }
        }
        let mut outstanding = self.pool.outstanding.lock().unwrap();
        while *outstanding >= self.pool.max_size {
            if cancel.is_cancelled() {
                return Err(StorageError::Cancelled);
            }
            let (guard, timeout) = self
                .pool
                .notify
                .wait_timeout(outstanding, std::time::Duration::from_millis(50))
                .unwrap();
            outstanding = guard;
            if timeout.timed_out() && cancel.is_cancelled() {
                return Err(StorageError::Cancelled);
            }
        }
        *outstanding += 1;
        drop(outstanding);
        self.pool
            .env
            .connect_with_connection_string(&self.pool.conn_str, ConnectionOptions::default())
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn release(&self, conn: Connection<'static>) {
        self.pool.idle.lock().unwrap().push(conn);
        self.pool.notify.notify_one();
    }

    fn text_rows(sql_result: Option<impl Cursor>) -> Result<Vec<Row>, StorageError> {
        let mut cursor = match sql_result {
            Some(c) => c,
            None => return Ok(Vec::new()),
        };

        let names: Vec<String> = {
            let n = cursor
                .num_result_cols()
                .map_err(|e| StorageError::Query(e.to_string()))?;
            (1..=n)
                .map(|i| {
                    cursor
                        .col_name(i as u16)
                        .unwrap_or_else(|_| format!("col{i}"))
                })
                .collect()
        };

        let buffer_desc = TextRowSet::for_cursor(ODBC_BATCH_SIZE, &mut cursor, Some(ODBC_MAX_TEXT_LEN))
            .map_err(|e| StorageError::Query(e.to_string()))?;
        let mut row_set_cursor = cursor
            .bind_buffer(buffer_desc)
            .map_err(|e| StorageError::Query(e.to_string()))?;

        let mut out = Vec::new();
        while let Some(batch) = row_set_cursor
            .fetch()
            .map_err(|e| StorageError::Query(e.to_string()))?
        {
            for row_index in 0..batch.num_rows() {
                let mut cols = Vec::with_capacity(names.len());
                for (col_index, name) in names.iter().enumerate() {
                    let value = match batch.at(col_index, row_index) {
                        Some(bytes) => {
                            let text = String::from_utf8_lossy(bytes).into_owned();
                            parse_loosely(&text)
                        }
                        None => Value::Null,
                    };
                    cols.push((name.clone(), value));
                }
                out.push(Row::new(cols));
            }
        }
        Ok(out)
    }

    pub fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    pub fn exec(
        &self,
        sql: &str,
        params: &[Value],
        cancel: &CancellationToken,
    ) -> Result<Vec<Row>, StorageError> {
        let conn = self.acquire(cancel)?;
        let bound = to_odbc_params(params);
        let result = conn
            .execute(sql, bound.as_slice())
            .map_err(|e| StorageError::Query(e.to_string()));
        let rows = match result {
            Ok(cursor) => Self::text_rows(cursor),
            Err(e) => Err(e),
        };
        self.release(conn);
        rows
    }

    pub fn exec_nonquery(
        &self,
        sql: &str,
        params: &[Value],
        cancel: &CancellationToken,
    ) -> Result<u64, StorageError> {
        let conn = self.acquire(cancel)?;
        let bound = to_odbc_params(params);
        let result = conn.execute(sql, bound.as_slice());
        self.release(conn);
        result.map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(0)
    }

    pub fn exec_in_transaction(
        &self,
        statements: &[(String, Vec<Value>)],
        cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        let mut conn = self.acquire(cancel)?;
        conn.set_autocommit(false)
            .map_err(|e| StorageError::Query(e.to_string()))?;
        for (sql, params) in statements {
            if cancel.is_cancelled() {
                let _ = conn.rollback();
                conn.set_autocommit(true).ok();
                self.release(conn);
                return Err(StorageError::Cancelled);
            }
            let bound = to_odbc_params(params);
            if let Err(e) = conn.execute(sql, bound.as_slice()) {
                let _ = conn.rollback();
                conn.set_autocommit(true).ok();
                self.release(conn);
                return Err(StorageError::Query(e.to_string()));
            }
        }
        conn.commit().map_err(|e| StorageError::Query(e.to_string()))?;
        conn.set_autocommit(true).ok();
        self.release(conn);
        Ok(())
    }

    pub fn table_exists(&self, name: &str) -> Result<bool, StorageError> {
        let rows = self.exec(
            "SELECT name FROM sys.tables WHERE name = ?",
            &[Value::Text(name.to_string())],
            &CancellationToken::new(),
        )?;
        Ok(!rows.is_empty())
    }

    pub fn create_index_table(&self, name: &str) -> Result<(), StorageError> {
        let conn = self.acquire(&CancellationToken::new())?;
        for stmt in self.dialect().create_index_table_ddl(name) {
            conn.execute(&stmt, ())
                .map_err(|e| StorageError::Query(e.to_string()))?;
        }
        self.release(conn);
        Ok(())
    }

    pub fn drop_table(&self, name: &str) -> Result<(), StorageError> {
        let conn = self.acquire(&CancellationToken::new())?;
        conn.execute(&self.dialect().drop_table_ddl(name), ())
            .map_err(|e| StorageError::Query(e.to_string()))?;
        self.release(conn);
        Ok(())
    }
}

/// Every bound parameter is rendered to its canonical text form and sent
/// as a nullable `VARCHAR` parameter; SQL Server coerces on comparison
/// against the typed columns our DDL declares.
fn to_odbc_params(params: &[Value]) -> Vec<Option<String>> {
    params
        .iter()
        .map(|v| match v {
            Value::Null => None,
            Value::Text(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Real(f) => Some(f.to_string()),
            Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        })
        .collect()
}

fn parse_loosely(text: &str) -> Value {
    if let Ok(i) = text.parse::<i64>() {
        Value::Int(i)
    } else {
        Value::Text(text.to_string())
    }
}
