use crate::dialect::Dialect;
use crate::error::StorageError;
use crate::mssql_backend::MsSqlBackend;
use crate::mysql_backend::MySqlBackend;
use crate::postgres_backend::PostgresBackend;
use crate::pool::CancellationToken;
use crate::sqlite::SqliteBackend;
use crate::value::{Row, Value};

/// One connection string per dialect. This is the single seam the rest of
/// the system speaks through — nobody above this crate ever branches on
/// dialect (§4.1).
pub enum Backend {
    Sqlite(SqliteBackend),
    Postgres(PostgresBackend),
    MySql(MySqlBackend),
    SqlServer(MsSqlBackend),
}

impl Backend {
    pub fn open(dialect: Dialect, conn_str: &str, pool_size: u32) -> Result<Self, StorageError> {
        Ok(match dialect {
            Dialect::Sqlite => Backend::Sqlite(SqliteBackend::open(conn_str, pool_size)?),
            Dialect::Postgres => Backend::Postgres(PostgresBackend::connect(conn_str, pool_size)?),
            Dialect::MySql => Backend::MySql(MySqlBackend::connect(conn_str, pool_size)?),
            Dialect::SqlServer => Backend::SqlServer(MsSqlBackend::connect(conn_str, pool_size)?),
        })
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            Backend::Sqlite(b) => b.dialect(),
            Backend::Postgres(b) => b.dialect(),
            Backend::MySql(b) => b.dialect(),
            Backend::SqlServer(b) => b.dialect(),
        }
    }

    pub fn exec(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StorageError> {
        self.exec_cancellable(sql, params, &CancellationToken::new())
    }

    pub fn exec_cancellable(
        &self,
        sql: &str,
        params: &[Value],
        cancel: &CancellationToken,
    ) -> Result<Vec<Row>, StorageError> {
        match self {
            Backend::Sqlite(b) => b.exec(sql, params, cancel),
            Backend::Postgres(b) => b.exec(sql, params, cancel),
            Backend::MySql(b) => b.exec(sql, params, cancel),
            Backend::SqlServer(b) => b.exec(sql, params, cancel),
        }
    }

    pub fn exec_nonquery(&self, sql: &str, params: &[Value]) -> Result<u64, StorageError> {
        self.exec_nonquery_cancellable(sql, params, &CancellationToken::new())
    }

    pub fn exec_nonquery_cancellable(
        &self,
        sql: &str,
        params: &[Value],
        cancel: &CancellationToken,
    ) -> Result<u64, StorageError> {
        match self {
            Backend::Sqlite(b) => b.exec_nonquery(sql, params, cancel),
            Backend::Postgres(b) => b.exec_nonquery(sql, params, cancel),
            Backend::MySql(b) => b.exec_nonquery(sql, params, cancel),
            Backend::SqlServer(b) => b.exec_nonquery(sql, params, cancel),
        }
    }

    /// Runs every statement in one transaction; all succeed or none commit.
    pub fn exec_in_transaction(
        &self,
        statements: &[(String, Vec<Value>)],
    ) -> Result<(), StorageError> {
        self.exec_in_transaction_cancellable(statements, &CancellationToken::new())
    }

    pub fn exec_in_transaction_cancellable(
        &self,
        statements: &[(String, Vec<Value>)],
        cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        match self {
            Backend::Sqlite(b) => b.exec_in_transaction(statements, cancel),
            Backend::Postgres(b) => b.exec_in_transaction(statements, cancel),
            Backend::MySql(b) => b.exec_in_transaction(statements, cancel),
            Backend::SqlServer(b) => b.exec_in_transaction(statements, cancel),
        }
    }

    pub fn table_exists(&self, name: &str) -> Result<bool, StorageError> {
        match self {
            Backend::Sqlite(b) => b.table_exists(name),
            Backend::Postgres(b) => b.table_exists(name),
            Backend::MySql(b) => b.table_exists(name),
            Backend::SqlServer(b) => b.table_exists(name),
        }
    }

    pub fn create_index_table(&self, name: &str) -> Result<(), StorageError> {
        match self {
            Backend::Sqlite(b) => b.create_index_table(name),
            Backend::Postgres(b) => b.create_index_table(name),
            Backend::MySql(b) => b.create_index_table(name),
            Backend::SqlServer(b) => b.create_index_table(name),
        }
    }

    pub fn drop_table(&self, name: &str) -> Result<(), StorageError> {
        match self {
            Backend::Sqlite(b) => b.drop_table(name),
            Backend::Postgres(b) => b.drop_table(name),
            Backend::MySql(b) => b.drop_table(name),
            Backend::SqlServer(b) => b.drop_table(name),
        }
    }
}
